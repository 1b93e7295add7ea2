// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Maps list selection state onto persisted completion flags.
//!
//! The reconciler remembers, per visible task, whether it was checked at
//! the last pass. Each pass writes only the tasks whose checkbox actually
//! changed since then, so navigation and redraws never touch the store.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::{StoreError, Task, TaskId, TaskStore};

pub const fn is_visible(task: &Task, hide_completed: bool) -> bool {
    !(hide_completed && task.complete)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciler {
    last_selected: BTreeMap<TaskId, bool>,
}

/// Result of one pass. Every changed task was attempted even when `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub written: Vec<TaskId>,
    pub error: Option<StoreError>,
}

impl Reconciler {
    pub fn snapshot<'a>(visible: impl IntoIterator<Item = &'a Task>) -> Self {
        Self {
            last_selected: visible
                .into_iter()
                .map(|task| (task.id, task.complete))
                .collect(),
        }
    }

    pub fn last_selected(&self) -> &BTreeMap<TaskId, bool> {
        &self.last_selected
    }

    /// Ids missing from the snapshot (hidden rows) read as unchecked.
    pub fn was_selected(&self, id: TaskId) -> bool {
        self.last_selected.get(&id).copied().unwrap_or(false)
    }

    pub fn forget(&mut self, id: TaskId) {
        self.last_selected.remove(&id);
    }

    pub fn reconcile(
        &mut self,
        tasks: &mut [Task],
        selection: &BTreeSet<TaskId>,
        store: &dyn TaskStore,
    ) -> Reconciliation {
        let mut outcome = Reconciliation::default();
        for task in tasks.iter_mut() {
            let should_be = selection.contains(&task.id);
            if should_be == self.was_selected(task.id) {
                continue;
            }

            task.complete = should_be;
            match store.update_task(task) {
                Ok(()) => {
                    debug!(task_id = %task.id, complete = should_be, "persisted toggle");
                    outcome.written.push(task.id);
                }
                Err(error) => {
                    warn!(task_id = %task.id, %error, "failed to persist toggle");
                    outcome.error.get_or_insert(error);
                }
            }
            self.last_selected.insert(task.id, should_be);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::{Reconciler, is_visible};
    use crate::{Task, TaskId};
    use time::OffsetDateTime;

    fn task(id: i64, complete: bool) -> Task {
        Task {
            id: TaskId::new(id),
            title: format!("task {id}"),
            complete,
            due_date: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn hidden_filter_only_drops_completed_tasks() {
        assert!(is_visible(&task(1, false), true));
        assert!(!is_visible(&task(2, true), true));
        assert!(is_visible(&task(2, true), false));
    }

    #[test]
    fn snapshot_records_visible_flags_and_forget_drops_them() {
        let tasks = [task(1, false), task(2, true)];
        let mut reconciler = Reconciler::snapshot(&tasks);
        assert!(!reconciler.was_selected(TaskId::new(1)));
        assert!(reconciler.was_selected(TaskId::new(2)));
        assert!(!reconciler.was_selected(TaskId::new(99)));

        reconciler.forget(TaskId::new(2));
        assert!(!reconciler.last_selected().contains_key(&TaskId::new(2)));
    }
}
