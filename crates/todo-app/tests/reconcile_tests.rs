// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use todo_app::{Reconciler, StoreError, TaskId, is_visible};
use todo_testkit::{RecordingStore, StoreOp, sample_tasks, task_due_in};

fn ids(values: &[i64]) -> BTreeSet<TaskId> {
    values.iter().copied().map(TaskId::new).collect()
}

#[test]
fn unchanged_selection_writes_nothing() {
    let store = RecordingStore::with_tasks(sample_tasks());
    let mut tasks = sample_tasks();
    let mut reconciler = Reconciler::snapshot(&tasks);

    let outcome = reconciler.reconcile(&mut tasks, &ids(&[2]), &store);

    assert!(outcome.written.is_empty());
    assert_eq!(outcome.error, None);
    assert_eq!(store.count(StoreOp::Update), 0);
}

#[test]
fn toggled_task_is_persisted_once_with_new_flag() {
    let store = RecordingStore::with_tasks(sample_tasks());
    let mut tasks = sample_tasks();
    let mut reconciler = Reconciler::snapshot(&tasks);

    let outcome = reconciler.reconcile(&mut tasks, &ids(&[1, 2]), &store);
    assert_eq!(outcome.written, vec![TaskId::new(1)]);

    let updates = store.updated_tasks();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].id, TaskId::new(1));
    assert!(updates[0].complete);
    assert!(tasks[0].complete);
    assert!(reconciler.was_selected(TaskId::new(1)));

    let again = reconciler.reconcile(&mut tasks, &ids(&[1, 2]), &store);
    assert!(again.written.is_empty());
    assert_eq!(store.count(StoreOp::Update), 1);
}

#[test]
fn completion_tracks_selection_for_every_visible_task() {
    let fixtures = vec![
        task_due_in(1, "A", false, 0),
        task_due_in(2, "B", true, 1),
        task_due_in(3, "C", false, 2),
        task_due_in(4, "D", true, 3),
    ];
    let store = RecordingStore::with_tasks(fixtures.clone());
    let mut tasks = fixtures;
    let mut reconciler = Reconciler::snapshot(&tasks);

    for selection in [ids(&[1]), ids(&[1, 3, 4]), ids(&[]), ids(&[2, 4]), ids(&[2])] {
        let _ = reconciler.reconcile(&mut tasks, &selection, &store);
        for task in &tasks {
            assert_eq!(task.complete, selection.contains(&task.id), "task {}", task.id);
            assert_eq!(
                store.task(task.id).map(|stored| stored.complete),
                Some(task.complete)
            );
        }
    }
}

#[test]
fn writes_follow_task_list_order() {
    let fixtures = vec![
        task_due_in(5, "first", false, 0),
        task_due_in(3, "second", false, 1),
        task_due_in(9, "third", false, 2),
    ];
    let store = RecordingStore::with_tasks(fixtures.clone());
    let mut tasks = fixtures;
    let mut reconciler = Reconciler::snapshot(&tasks);

    let outcome = reconciler.reconcile(&mut tasks, &ids(&[9, 5, 3]), &store);
    assert_eq!(
        outcome.written,
        vec![TaskId::new(5), TaskId::new(3), TaskId::new(9)]
    );
}

#[test]
fn failed_write_keeps_first_error_and_still_advances() {
    let fixtures = vec![
        task_due_in(1, "A", false, 0),
        task_due_in(2, "B", false, 0),
        task_due_in(3, "C", false, 0),
    ];
    let store = RecordingStore::with_tasks(fixtures.clone());
    store.fail_update_of(TaskId::new(1));
    store.fail_update_of(TaskId::new(2));
    let mut tasks = fixtures;
    let mut reconciler = Reconciler::snapshot(&tasks);

    let outcome = reconciler.reconcile(&mut tasks, &ids(&[1, 2, 3]), &store);

    assert_eq!(store.count(StoreOp::Update), 3);
    assert_eq!(outcome.written, vec![TaskId::new(3)]);
    assert!(matches!(outcome.error, Some(StoreError::Backend(_))));
    assert!(tasks.iter().all(|task| task.complete));
    assert!(reconciler.was_selected(TaskId::new(1)));

    let retry = reconciler.reconcile(&mut tasks, &ids(&[1, 2, 3]), &store);
    assert!(retry.written.is_empty());
    assert_eq!(retry.error, None);
    assert_eq!(store.count(StoreOp::Update), 3);
}

#[test]
fn hidden_completed_task_is_left_alone() {
    let store = RecordingStore::with_tasks(sample_tasks());
    let mut tasks = sample_tasks();
    let visible = tasks
        .iter()
        .filter(|task| is_visible(task, true))
        .cloned()
        .collect::<Vec<_>>();
    let mut reconciler = Reconciler::snapshot(&visible);

    let outcome = reconciler.reconcile(&mut tasks, &ids(&[]), &store);

    assert!(outcome.written.is_empty());
    assert!(tasks[1].complete);
    assert_eq!(store.count(StoreOp::Update), 0);
}
