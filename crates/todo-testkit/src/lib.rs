// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::{Date, Duration, OffsetDateTime};
use todo_app::{StoreError, StoreResult, Task, TaskId, TaskStore, local_midnight, local_today};

/// Store operations that can be recorded or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreOp {
    Save,
    Get,
    Update,
    UpdateBatch,
    Delete,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Save { title: String, due_date: OffsetDateTime },
    Get,
    Update(Task),
    UpdateBatch(Vec<Task>),
    Delete(TaskId),
    Close,
}

impl StoreCall {
    pub const fn op(&self) -> StoreOp {
        match self {
            Self::Save { .. } => StoreOp::Save,
            Self::Get => StoreOp::Get,
            Self::Update(_) => StoreOp::Update,
            Self::UpdateBatch(_) => StoreOp::UpdateBatch,
            Self::Delete(_) => StoreOp::Delete,
            Self::Close => StoreOp::Close,
        }
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    tasks: Vec<Task>,
    next_id: i64,
    calls: Vec<StoreCall>,
    failing: BTreeSet<StoreOp>,
    failing_updates: BTreeSet<TaskId>,
}

/// In-memory `TaskStore` that records every call in order.
///
/// Share it with a view through `Arc` and inspect the calls afterwards.
/// Failures can be injected per operation, or per task for single updates.
#[derive(Debug, Default)]
pub struct RecordingStore {
    state: Mutex<RecordingState>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|task| task.id.get()).max().unwrap_or(0);
        Self {
            state: Mutex::new(RecordingState {
                tasks,
                next_id,
                ..RecordingState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fail(&self, op: StoreOp) {
        self.lock().failing.insert(op);
    }

    pub fn fail_update_of(&self, id: TaskId) {
        self.lock().failing_updates.insert(id);
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock().tasks.iter().find(|task| task.id == id).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn calls_of(&self, op: StoreOp) -> Vec<StoreCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .cloned()
            .collect()
    }

    pub fn count(&self, op: StoreOp) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.op() == op)
            .count()
    }

    pub fn updated_tasks(&self) -> Vec<Task> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Update(task) => Some(task.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) -> MutexGuard<'_, RecordingState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

fn injected(op: StoreOp) -> StoreError {
    StoreError::Backend(format!("injected {op:?} failure"))
}

impl TaskStore for RecordingStore {
    fn save_task(&self, title: &str, due_date: OffsetDateTime) -> StoreResult<()> {
        let mut state = self.record(StoreCall::Save {
            title: title.to_owned(),
            due_date,
        });
        if state.failing.contains(&StoreOp::Save) {
            return Err(injected(StoreOp::Save));
        }
        state.next_id += 1;
        let id = TaskId::new(state.next_id);
        state.tasks.push(Task {
            id,
            title: title.to_owned(),
            complete: false,
            due_date,
        });
        state
            .tasks
            .sort_by(|left, right| (left.due_date, left.id).cmp(&(right.due_date, right.id)));
        Ok(())
    }

    fn get_tasks(&self) -> StoreResult<Vec<Task>> {
        let state = self.record(StoreCall::Get);
        if state.failing.contains(&StoreOp::Get) {
            return Err(injected(StoreOp::Get));
        }
        Ok(state.tasks.clone())
    }

    fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.record(StoreCall::Update(task.clone()));
        if state.failing.contains(&StoreOp::Update) || state.failing_updates.contains(&task.id) {
            return Err(injected(StoreOp::Update));
        }
        match state.tasks.iter_mut().find(|stored| stored.id == task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(task.id)),
        }
    }

    fn update_tasks(&self, tasks: &[Task]) -> StoreResult<()> {
        let mut state = self.record(StoreCall::UpdateBatch(tasks.to_vec()));
        if state.failing.contains(&StoreOp::UpdateBatch) {
            return Err(injected(StoreOp::UpdateBatch));
        }
        for task in tasks {
            if let Some(stored) = state.tasks.iter_mut().find(|stored| stored.id == task.id) {
                *stored = task.clone();
            }
        }
        Ok(())
    }

    fn delete_task_by_id(&self, id: TaskId) -> StoreResult<()> {
        let mut state = self.record(StoreCall::Delete(id));
        if state.failing.contains(&StoreOp::Delete) {
            return Err(injected(StoreOp::Delete));
        }
        state.tasks.retain(|task| task.id != id);
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        let state = self.record(StoreCall::Close);
        if state.failing.contains(&StoreOp::Close) {
            return Err(injected(StoreOp::Close));
        }
        Ok(())
    }
}

pub fn task(id: i64, title: &str, complete: bool, due: Date) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_owned(),
        complete,
        due_date: local_midnight(due),
    }
}

/// A task due `days` days from today (negative for overdue).
pub fn task_due_in(id: i64, title: &str, complete: bool, days: i64) -> Task {
    task(id, title, complete, local_today() + Duration::days(days))
}

/// Two tasks: `1 "A"` open and `2 "B"` complete, both due today.
pub fn sample_tasks() -> Vec<Task> {
    vec![
        task_due_in(1, "A", false, 0),
        task_due_in(2, "B", true, 0),
    ]
}

/// A scratch database path inside a fresh temporary directory.
pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir for database")?;
    let path = dir.path().join("todo.sqlite");
    Ok((dir, path))
}
