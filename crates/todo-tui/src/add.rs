// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::sync::Arc;
use time::Date;
use todo_app::{
    TaskStore, ValidationError, ViewError, ViewKind, format_date, local_midnight, local_today,
    validate_due_date, validate_title,
};
use tracing::{debug, info, warn};

use crate::render::{legend_height, render_error, render_legend};
use crate::{CleanupGate, Flow, FormState, KeyMap, ViewEvent, ViewModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Title,
    DueDate,
}

/// Two-field form that saves one task and hands back to the list.
pub struct AddView {
    store: Arc<dyn TaskStore>,
    keys: KeyMap,
    today: Date,
    title: String,
    due_date: String,
    field: AddField,
    state: FormState,
    field_error: Option<ValidationError>,
    error: Option<ViewError>,
    next: ViewKind,
    gate: CleanupGate,
}

impl AddView {
    pub fn new(store: Arc<dyn TaskStore>, keys: KeyMap) -> Self {
        Self::with_today(store, keys, local_today())
    }

    /// Due dates before `today` are rejected; the field starts pre-filled with it.
    pub fn with_today(store: Arc<dyn TaskStore>, keys: KeyMap, today: Date) -> Self {
        Self {
            store,
            keys,
            today,
            title: String::new(),
            due_date: format_date(today),
            field: AddField::Title,
            state: FormState::Editing,
            field_error: None,
            error: None,
            next: ViewKind::None,
            gate: CleanupGate::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due_date_input(&self) -> &str {
        &self.due_date
    }

    pub fn field(&self) -> AddField {
        self.field
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn field_error(&self) -> Option<&ValidationError> {
        self.field_error.as_ref()
    }

    fn focused_input(&mut self) -> &mut String {
        match self.field {
            AddField::Title => &mut self.title,
            AddField::DueDate => &mut self.due_date,
        }
    }

    fn record(&mut self, error: ViewError) {
        warn!(%error, "add view error");
        self.error = Some(error);
    }

    fn finish(&mut self) {
        if !self.gate.try_enter() {
            return;
        }
        if let Err(error) = self.store.close() {
            self.record(error.into());
        }
        debug!(next = self.next.as_str(), "add view finished");
    }

    fn exit_to(&mut self, next: ViewKind) -> Flow {
        self.next = next;
        self.finish();
        Flow::Exit
    }

    fn handle_key(&mut self, key: KeyEvent) -> Flow {
        if self.keys.list.matches(&key) {
            return self.exit_to(ViewKind::List);
        }

        if self.keys.is_quit_while_typing(&key) {
            info!("quit from add view");
            return self.exit_to(ViewKind::None);
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if key.code == KeyCode::Char('c') {
                self.state = FormState::Aborted;
                return self.exit_to(ViewKind::None);
            }
            return Flow::Continue;
        }

        match (self.field, key.code) {
            (AddField::Title, KeyCode::Enter | KeyCode::Tab | KeyCode::Down) => {
                match validate_title(&self.title) {
                    Ok(_) => {
                        self.field = AddField::DueDate;
                        self.field_error = None;
                    }
                    Err(error) => self.field_error = Some(error),
                }
                Flow::Continue
            }
            (AddField::DueDate, KeyCode::Enter | KeyCode::Tab) => self.submit(),
            (AddField::DueDate, KeyCode::BackTab | KeyCode::Up) => {
                self.field = AddField::Title;
                self.field_error = None;
                Flow::Continue
            }
            (_, KeyCode::Backspace) => {
                self.focused_input().pop();
                self.field_error = None;
                Flow::Continue
            }
            (_, KeyCode::Char(c)) if !key.modifiers.contains(KeyModifiers::ALT) => {
                self.focused_input().push(c);
                self.field_error = None;
                Flow::Continue
            }
            _ => Flow::Continue,
        }
    }

    fn submit(&mut self) -> Flow {
        let title = match validate_title(&self.title) {
            Ok(title) => title.to_owned(),
            Err(error) => {
                self.field = AddField::Title;
                self.field_error = Some(error);
                return Flow::Continue;
            }
        };
        let date = match validate_due_date(&self.due_date, self.today) {
            Ok(date) => date,
            Err(error) => {
                self.field_error = Some(error);
                return Flow::Continue;
            }
        };

        self.state = FormState::Completed;
        match self.store.save_task(&title, local_midnight(date)) {
            Ok(()) => {
                info!(title = %title, due = %format_date(date), "saved new task");
                self.exit_to(ViewKind::List)
            }
            Err(error) => {
                self.record(error.into());
                self.state = FormState::Editing;
                self.field = AddField::DueDate;
                Flow::Continue
            }
        }
    }

    fn field_lines(&self, field: AddField, label: &'static str, value: &str) -> Vec<Line<'_>> {
        let focused = self.field == field;
        let label_style = if focused {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let marker = if focused { "> " } else { "  " };
        let mut lines = vec![
            Line::from(Span::styled(label, label_style)),
            Line::from(format!("{marker}{value}")),
        ];
        if focused && let Some(error) = &self.field_error {
            lines.push(Line::from(Span::styled(
                format!("  {error}"),
                Style::default().fg(Color::Red),
            )));
        }
        lines.push(Line::default());
        lines
    }
}

impl ViewModel for AddView {
    fn kind(&self) -> ViewKind {
        ViewKind::Add
    }

    fn update(&mut self, event: ViewEvent) -> Flow {
        match event {
            ViewEvent::Key(key) => self.handle_key(key),
            ViewEvent::Cancel => {
                info!("add view cancelled");
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

        let legend = [
            (self.keys.list.to_string(), "Go to the List View"),
            (self.keys.quit_label_while_typing(), "Quit"),
        ];
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(legend_height(legend.len())),
            ])
            .split(area);

        let mut lines = self.field_lines(AddField::Title, "Task name", &self.title);
        lines.extend(self.field_lines(
            AddField::DueDate,
            "Due date (YYYY-MM-DD)",
            &self.due_date,
        ));
        let form = Paragraph::new(lines)
            .block(Block::default().title("Add Task").borders(Borders::ALL));
        frame.render_widget(form, layout[0]);
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
