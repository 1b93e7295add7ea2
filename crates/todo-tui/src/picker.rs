// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};
use std::collections::BTreeSet;
use todo_app::{Task, TaskId};

use crate::FormState;

const CHECKED: &str = "[x] ";
const UNCHECKED: &str = "[ ] ";

/// Multi-select list of tasks with a hover cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPicker {
    rows: Vec<Task>,
    selected: BTreeSet<TaskId>,
    cursor: usize,
    state: FormState,
}

impl TaskPicker {
    /// `selected` is clamped to the ids present in `rows`.
    pub fn new(rows: Vec<Task>, selected: BTreeSet<TaskId>) -> Self {
        let selected = selected
            .into_iter()
            .filter(|id| rows.iter().any(|task| task.id == *id))
            .collect();
        Self {
            rows,
            selected,
            cursor: 0,
            state: FormState::Editing,
        }
    }

    pub fn rows(&self) -> &[Task] {
        &self.rows
    }

    pub fn selection(&self) -> &BTreeSet<TaskId> {
        &self.selected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn hovered(&self) -> Option<&Task> {
        self.rows.get(self.cursor)
    }

    pub fn is_selected(&self, id: TaskId) -> bool {
        self.selected.contains(&id)
    }

    pub fn remove(&mut self, id: TaskId) {
        self.rows.retain(|task| task.id != id);
        self.selected.remove(&id);
        self.cursor = self.cursor.min(self.rows.len().saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormState {
        if self.state != FormState::Editing {
            return self.state;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                self.state = FormState::Aborted;
            }
            return self.state;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor + 1 < self.rows.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor = self.rows.len().saturating_sub(1),
            KeyCode::Char(' ') | KeyCode::Char('x') => self.toggle_hovered(),
            KeyCode::Enter => self.state = FormState::Completed,
            _ => {}
        }
        self.state
    }

    fn toggle_hovered(&mut self) {
        let Some(id) = self.hovered().map(|task| task.id) else {
            return;
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let items = self
            .rows
            .iter()
            .map(|task| {
                let marker = if self.is_selected(task.id) {
                    CHECKED
                } else {
                    UNCHECKED
                };
                ListItem::new(format!("{marker}{}", task.label()))
            })
            .collect::<Vec<_>>();

        let list = List::new(items)
            .block(Block::default().title("Tasks").borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if !self.rows.is_empty() {
            state.select(Some(self.cursor));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}
