// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Padding, Paragraph, Wrap};
use todo_app::ViewError;

pub fn render_error(frame: &mut Frame<'_>, area: Rect, error: &ViewError) {
    let widget = Paragraph::new(format!("Error: {error}"))
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

pub fn render_prompt(frame: &mut Frame<'_>, area: Rect, text: String) {
    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().padding(Padding::uniform(1)));
    frame.render_widget(widget, area);
}

/// Rows needed to draw a legend with `entries` lines.
pub fn legend_height(entries: usize) -> u16 {
    u16::try_from(entries).unwrap_or(u16::MAX).saturating_add(3)
}

pub fn render_legend(frame: &mut Frame<'_>, area: Rect, entries: &[(String, &str)]) {
    let mut lines = vec![Line::from("Special Shortcuts:")];
    lines.extend(
        entries
            .iter()
            .map(|(keys, action)| Line::from(format!("{keys} - {action}"))),
    );
    let widget = Paragraph::new(lines)
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().padding(Padding::horizontal(1)))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}
