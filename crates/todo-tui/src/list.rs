// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! The task list: browse, toggle completion, hide completed rows, delete.
//!
//! Selection state lives in the picker. After every forwarded key the
//! [`Reconciler`] pushes checkbox changes to the store, so the persisted
//! `complete` flag follows the checkbox one toggle at a time. Rebuilds
//! (hide toggle, delete) start from the in-memory task list and re-snapshot
//! the reconciler, so the pass after a rebuild only sees new toggles.

use crossterm::event::KeyEvent;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use std::collections::BTreeSet;
use std::sync::Arc;
use todo_app::{
    Reconciler, StoreResult, Task, TaskId, TaskStore, ViewError, ViewKind, is_visible,
};
use tracing::{debug, info, warn};

use crate::render::{legend_height, render_error, render_legend, render_prompt};
use crate::{CleanupGate, Flow, FormState, KeyMap, TaskPicker, ViewEvent, ViewModel};

pub struct ListView {
    store: Arc<dyn TaskStore>,
    keys: KeyMap,
    tasks: Vec<Task>,
    picker: TaskPicker,
    reconciler: Reconciler,
    hide_completed: bool,
    error: Option<ViewError>,
    next: ViewKind,
    gate: CleanupGate,
}

impl ListView {
    /// Loads every task from `store`; all tasks start visible.
    pub fn new(store: Arc<dyn TaskStore>, keys: KeyMap) -> StoreResult<Self> {
        let tasks = store.get_tasks()?;
        debug!(count = tasks.len(), "list view loaded tasks");
        let mut view = Self {
            store,
            keys,
            tasks,
            picker: TaskPicker::default(),
            reconciler: Reconciler::default(),
            hide_completed: false,
            error: None,
            next: ViewKind::None,
            gate: CleanupGate::new(),
        };
        view.rebuild();
        Ok(view)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn picker(&self) -> &TaskPicker {
        &self.picker
    }

    pub fn selection(&self) -> &BTreeSet<TaskId> {
        self.picker.selection()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn hide_completed(&self) -> bool {
        self.hide_completed
    }

    fn rebuild(&mut self) {
        let visible = self
            .tasks
            .iter()
            .filter(|task| is_visible(task, self.hide_completed))
            .cloned()
            .collect::<Vec<_>>();
        let selected = visible
            .iter()
            .filter(|task| task.complete)
            .map(|task| task.id)
            .collect();
        self.reconciler = Reconciler::snapshot(&visible);
        self.picker = TaskPicker::new(visible, selected);
    }

    fn record(&mut self, error: ViewError) {
        warn!(%error, "list view error");
        self.error = Some(error);
    }

    fn reconcile(&mut self) {
        let outcome = self.reconciler.reconcile(
            &mut self.tasks,
            self.picker.selection(),
            self.store.as_ref(),
        );
        if let Some(error) = outcome.error {
            self.record(error.into());
        }
    }

    fn delete(&mut self, id: TaskId) {
        self.tasks.retain(|task| task.id != id);
        self.picker.remove(id);
        self.reconciler.forget(id);

        match self.store.delete_task_by_id(id) {
            Ok(()) => {
                debug!(task_id = %id, "deleted task");
                self.rebuild();
            }
            Err(error) => self.record(error.into()),
        }
    }

    /// Reconcile, persist the whole list, close the store. Runs once.
    fn finish(&mut self) {
        if !self.gate.try_enter() {
            return;
        }
        self.reconcile();
        if let Err(error) = self.store.update_tasks(&self.tasks) {
            self.record(error.into());
        }
        if let Err(error) = self.store.close() {
            self.record(error.into());
        }
        debug!(next = self.next.as_str(), "list view finished");
    }

    fn exit_to(&mut self, next: ViewKind) -> Flow {
        self.next = next;
        self.finish();
        Flow::Exit
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if self.keys.toggle_completed.matches(&key) {
            self.hide_completed = !self.hide_completed;
            self.rebuild();
            debug!(hide_completed = self.hide_completed, "toggled completed rows");
            return Flow::Continue;
        }

        if self.keys.add.matches(&key) {
            return self.exit_to(ViewKind::Add);
        }

        if self.keys.is_delete(&key)
            && let Some(id) = self.picker.hovered().map(|task| task.id)
        {
            self.delete(id);
            return Flow::Continue;
        }

        if self.keys.is_quit(&key) {
            info!("quit from list view");
            return self.exit_to(ViewKind::None);
        }

        let state = self.picker.handle_key(key);
        self.reconcile();

        match state {
            FormState::Editing => Flow::Continue,
            FormState::Completed | FormState::Aborted => self.exit_to(ViewKind::None),
        }
    }

    fn legend(&self) -> Vec<(String, &'static str)> {
        vec![
            (
                self.keys.toggle_completed.to_string(),
                "Toggle hiding completed tasks",
            ),
            (self.keys.add.to_string(), "Add a new task"),
            (self.keys.quit_label(), "Quit"),
        ]
    }
}

impl ViewModel for ListView {
    fn kind(&self) -> ViewKind {
        ViewKind::List
    }

    fn update(&mut self, event: ViewEvent) -> Flow {
        match event {
            ViewEvent::Key(key) => self.handle_key(key),
            ViewEvent::Cancel => {
                info!("list view cancelled");
                self.exit_to(ViewKind::None)
            }
            ViewEvent::Error(error) => {
                self.record(error);
                Flow::Continue
            }
            ViewEvent::Resize(..) => Flow::Continue,
        }
    }

    fn render(&self, frame: &mut Frame<'_>) {
        let area = frame.area();
        if let Some(error) = &self.error {
            render_error(frame, area, error);
            return;
        }

        if self.tasks.is_empty() {
            render_prompt(frame, area, format!("Press {} to add a new task.", self.keys.add));
            return;
        }

        let legend = self.legend();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(legend_height(legend.len())),
            ])
            .split(area);
        self.picker.render(frame, layout[0]);
        render_legend(frame, layout[1], &legend);
    }

    fn err(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    fn next(&self) -> ViewKind {
        self.next
    }

    fn cleanup(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::ListView;
    use crate::test_support::{ch, ctrl, key, render_text};
    use crate::{Flow, KeyMap, ViewEvent, ViewModel};
    use anyhow::Result;
    use crossterm::event::KeyCode;
    use std::sync::Arc;
    use todo_app::{StoreError, TaskId, ViewError, ViewKind};
    use todo_testkit::{RecordingStore, StoreOp, sample_tasks, task_due_in};

    fn view_over(store: &Arc<RecordingStore>) -> Result<ListView> {
        Ok(ListView::new(store.clone(), KeyMap::default())?)
    }

    fn press(view: &mut ListView, event: crossterm::event::KeyEvent) -> Flow {
        view.update(ViewEvent::Key(event))
    }

    #[test]
    fn selection_starts_from_completed_tasks() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let view = view_over(&store)?;

        assert_eq!(view.picker().rows().len(), 2);
        assert_eq!(
            view.selection().iter().copied().collect::<Vec<_>>(),
            vec![TaskId::new(2)]
        );
        assert!(view.reconciler().was_selected(TaskId::new(2)));
        assert_eq!(store.count(StoreOp::Get), 1);
        Ok(())
    }

    #[test]
    fn navigation_does_not_write() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, key(KeyCode::Down));
        press(&mut view, key(KeyCode::Up));
        press(&mut view, ch('G'));

        assert_eq!(store.count(StoreOp::Update), 0);
        Ok(())
    }

    #[test]
    fn toggle_persists_the_hovered_task() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        assert_eq!(press(&mut view, ch(' ')), Flow::Continue);

        let updates = store.updated_tasks();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, TaskId::new(1));
        assert!(updates[0].complete);
        assert!(view.tasks()[0].complete);
        Ok(())
    }

    #[test]
    fn hiding_completed_rebuilds_without_writing() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, ctrl('h'));
        assert!(view.hide_completed());
        assert_eq!(view.picker().rows().len(), 1);
        assert!(view.selection().is_empty());
        assert!(!view.reconciler().last_selected().contains_key(&TaskId::new(2)));

        press(&mut view, ctrl('h'));
        assert_eq!(view.picker().rows().len(), 2);
        assert_eq!(view.picker().cursor(), 0);
        assert_eq!(store.count(StoreOp::Update), 0);
        Ok(())
    }

    #[test]
    fn toggled_then_hidden_task_leaves_selection() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, ch(' '));
        press(&mut view, ctrl('h'));

        assert!(view.selection().is_empty());
        assert!(view.picker().rows().is_empty());
        assert_eq!(store.count(StoreOp::Update), 1);
        assert_eq!(store.task(TaskId::new(1)).map(|task| task.complete), Some(true));
        Ok(())
    }

    #[test]
    fn toggle_right_after_hiding_is_persisted() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, ctrl('h'));
        press(&mut view, ch(' '));
        let updates = store.updated_tasks();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, TaskId::new(1));
        assert!(updates[0].complete);

        press(&mut view, ctrl('h'));
        assert_eq!(store.count(StoreOp::Update), 1);
        assert_eq!(store.task(TaskId::new(1)).map(|task| task.complete), Some(true));
        assert_eq!(
            view.selection().iter().copied().collect::<Vec<_>>(),
            vec![TaskId::new(1), TaskId::new(2)]
        );
        Ok(())
    }

    #[test]
    fn delete_removes_hovered_task_everywhere() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, key(KeyCode::Down));
        assert_eq!(press(&mut view, key(KeyCode::Delete)), Flow::Continue);

        assert_eq!(store.calls_of(StoreOp::Delete).len(), 1);
        assert_eq!(store.count(StoreOp::Update), 0);
        assert_eq!(view.tasks().len(), 1);
        assert!(view.selection().is_empty());
        assert!(!view.reconciler().last_selected().contains_key(&TaskId::new(2)));
        assert_eq!(view.picker().cursor(), 0);
        assert!(store.task(TaskId::new(2)).is_none());
        Ok(())
    }

    #[test]
    fn failed_delete_records_error() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        store.fail(StoreOp::Delete);
        let mut view = view_over(&store)?;

        press(&mut view, key(KeyCode::Backspace));

        assert!(matches!(
            view.err(),
            Some(ViewError::Store(StoreError::Backend(_)))
        ));
        assert_eq!(view.tasks().len(), 1);
        Ok(())
    }

    #[test]
    fn every_quit_key_persists_once_and_exits() -> Result<()> {
        for quit in [ch('q'), key(KeyCode::Esc), ctrl('c')] {
            let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
            let mut view = view_over(&store)?;

            assert_eq!(press(&mut view, quit), Flow::Exit);
            view.cleanup();

            assert_eq!(store.count(StoreOp::UpdateBatch), 1);
            assert_eq!(store.count(StoreOp::Close), 1);
            assert_eq!(view.next(), ViewKind::None);
        }
        Ok(())
    }

    #[test]
    fn add_key_navigates_after_cleanup() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        assert_eq!(press(&mut view, ctrl('a')), Flow::Exit);
        assert_eq!(view.next(), ViewKind::Add);
        assert_eq!(store.count(StoreOp::Close), 1);
        Ok(())
    }

    #[test]
    fn enter_completes_the_picker_and_saves_everything() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        press(&mut view, ch('x'));
        assert_eq!(press(&mut view, key(KeyCode::Enter)), Flow::Exit);

        let batches = store.calls_of(StoreOp::UpdateBatch);
        assert_eq!(batches.len(), 1);
        assert!(store.tasks().iter().all(|task| task.complete));
        assert_eq!(view.next(), ViewKind::None);
        Ok(())
    }

    #[test]
    fn ctrl_c_aborts_through_picker_when_not_a_quit_key() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let keys = KeyMap::parse(&["q"], "ctrl+h", "ctrl+a", "ctrl+l", &["delete"])?;
        let mut view = ListView::new(store.clone(), keys)?;

        assert_eq!(press(&mut view, ctrl('c')), Flow::Exit);
        assert_eq!(store.count(StoreOp::UpdateBatch), 1);
        Ok(())
    }

    #[test]
    fn cancel_behaves_like_quit() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        let mut view = view_over(&store)?;

        assert_eq!(view.update(ViewEvent::Cancel), Flow::Exit);
        assert_eq!(view.update(ViewEvent::Cancel), Flow::Exit);
        assert_eq!(store.count(StoreOp::UpdateBatch), 1);
        assert_eq!(store.count(StoreOp::Close), 1);
        Ok(())
    }

    #[test]
    fn reconcile_failure_is_recorded_and_rendered() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
        store.fail(StoreOp::Update);
        let mut view = view_over(&store)?;

        press(&mut view, ch(' '));

        assert!(view.err().is_some());
        let screen = render_text(&view, 60, 6)?;
        assert!(screen.contains("Error: injected Update failure"), "{screen}");
        Ok(())
    }

    #[test]
    fn empty_list_prompts_to_add() -> Result<()> {
        let store = Arc::new(RecordingStore::new());
        let view = view_over(&store)?;

        let screen = render_text(&view, 60, 6)?;
        assert!(screen.contains("Press ctrl+a to add a new task."), "{screen}");
        Ok(())
    }

    #[test]
    fn rows_render_with_checkboxes_and_legend() -> Result<()> {
        let store = Arc::new(RecordingStore::with_tasks(vec![
            task_due_in(1, "Write tests", false, 0),
            task_due_in(2, "Ship it", true, 1),
        ]));
        let view = view_over(&store)?;

        let screen = render_text(&view, 70, 14)?;
        assert!(screen.contains("[ ] 1 - Write tests ~ due"), "{screen}");
        assert!(screen.contains("[x] 2 - Ship it ~ due"), "{screen}");
        assert!(screen.contains("ctrl+h - Toggle hiding completed tasks"), "{screen}");
        assert!(screen.contains("q/esc/ctrl+c - Quit"), "{screen}");
        Ok(())
    }

    #[test]
    fn load_failure_is_reported() {
        let store = Arc::new(RecordingStore::new());
        store.fail(StoreOp::Get);
        assert!(ListView::new(store, KeyMap::default()).is_err());
    }
}
