// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use time::OffsetDateTime;

use crate::{StoreResult, Task, TaskId};

/// Durable task storage consumed by the views.
///
/// Implementations serialize concurrent callers internally; reconciliation
/// may issue several updates back to back from one view.
pub trait TaskStore: Send + Sync {
    fn save_task(&self, title: &str, due_date: OffsetDateTime) -> StoreResult<()>;

    /// All tasks ordered by due date ascending, ties broken by id.
    fn get_tasks(&self) -> StoreResult<Vec<Task>>;

    fn update_task(&self, task: &Task) -> StoreResult<()>;

    /// Writes every task in one batch; a failure is reported for the whole batch.
    fn update_tasks(&self, tasks: &[Task]) -> StoreResult<()>;

    fn delete_task_by_id(&self, id: TaskId) -> StoreResult<()>;

    fn close(&self) -> StoreResult<()>;
}

impl<T: TaskStore + ?Sized> TaskStore for Arc<T> {
    fn save_task(&self, title: &str, due_date: OffsetDateTime) -> StoreResult<()> {
        (**self).save_task(title, due_date)
    }

    fn get_tasks(&self) -> StoreResult<Vec<Task>> {
        (**self).get_tasks()
    }

    fn update_task(&self, task: &Task) -> StoreResult<()> {
        (**self).update_task(task)
    }

    fn update_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        (**self).update_tasks(tasks)
    }

    fn delete_task_by_id(&self, id: TaskId) -> StoreResult<()> {
        (**self).delete_task_by_id(id)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}

impl<T: TaskStore + ?Sized> TaskStore for Box<T> {
    fn save_task(&self, title: &str, due_date: OffsetDateTime) -> StoreResult<()> {
        (**self).save_task(title, due_date)
    }

    fn get_tasks(&self) -> StoreResult<Vec<Task>> {
        (**self).get_tasks()
    }

    fn update_task(&self, task: &Task) -> StoreResult<()> {
        (**self).update_task(task)
    }

    fn update_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        (**self).update_tasks(tasks)
    }

    fn delete_task_by_id(&self, id: TaskId) -> StoreResult<()> {
        (**self).delete_task_by_id(id)
    }

    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}
