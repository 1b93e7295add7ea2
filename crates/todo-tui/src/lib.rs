// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Terminal views for the task manager and the machinery that runs them.
//!
//! A [`ViewModel`] is a small state machine fed [`ViewEvent`]s. A
//! [`Runner`] drives one model on its own thread until it exits, and a
//! [`ViewChain`] keeps starting runners for whichever view the previous one
//! asked for.

pub mod add;
pub mod cancel;
pub mod chain;
pub mod gate;
pub mod keys;
pub mod list;
pub mod picker;
pub mod render;
pub mod runner;

pub use add::{AddField, AddView};
pub use cancel::{CancelRegistration, CancelSignal};
pub use chain::{ChainReport, ViewChain};
pub use gate::CleanupGate;
pub use keys::{KeyBinding, KeyMap};
pub use list::ListView;
pub use picker::TaskPicker;
pub use runner::{Runner, StopHandle};

use crossterm::event::KeyEvent;
use ratatui::Frame;
use todo_app::{ViewError, ViewKind};

/// Whether the event loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Progress of an interactive form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Editing,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// External cancellation; handled like a quit key.
    Cancel,
    Error(ViewError),
}

/// One view's lifecycle contract.
///
/// `cleanup` may be reached from several paths (quit, navigation,
/// cancellation, the runner after the loop ends). Implementations guard it
/// with a [`CleanupGate`] so the side effects happen once.
pub trait ViewModel: Send {
    fn kind(&self) -> ViewKind;

    fn init(&mut self) -> Flow {
        Flow::Continue
    }

    fn update(&mut self, event: ViewEvent) -> Flow;

    fn render(&self, frame: &mut Frame<'_>);

    fn err(&self) -> Option<&ViewError>;

    fn next(&self) -> ViewKind;

    fn cleanup(&mut self);
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ViewModel;
    use anyhow::Result;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    pub fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    pub fn ch(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    pub fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Draws `model` once into an off-screen buffer and returns its rows.
    pub fn render_text(model: &dyn ViewModel, width: u16, height: u16) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height))?;
        terminal.draw(|frame| model.render(frame))?;
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        let rows = buffer
            .content()
            .chunks(width)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.symbol())
                    .collect::<String>()
                    .trim_end()
                    .to_owned()
            })
            .collect::<Vec<_>>();
        Ok(rows.join("\n"))
    }
}
