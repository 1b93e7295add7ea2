// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_QUIT_KEYS: &[&str] = &["q", "esc", "ctrl+c"];
pub const DEFAULT_TOGGLE_COMPLETED_KEY: &str = "ctrl+h";
pub const DEFAULT_ADD_KEY: &str = "ctrl+a";
pub const DEFAULT_LIST_KEY: &str = "ctrl+l";
pub const DEFAULT_DELETE_KEYS: &[&str] = &["delete", "backspace"];

/// A single key chord such as `q`, `esc` or `ctrl+h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn code(&self) -> KeyCode {
        self.code
    }

    /// Character keys ignore shift, since terminals report `G` as shift+G.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        match (self.code, key.code) {
            (KeyCode::Char(want), KeyCode::Char(got)) => {
                let want_mods = self.modifiers.difference(KeyModifiers::SHIFT);
                let got_mods = key.modifiers.difference(KeyModifiers::SHIFT);
                if want_mods != got_mods {
                    return false;
                }
                if want_mods.contains(KeyModifiers::CONTROL) {
                    want.eq_ignore_ascii_case(&got)
                } else {
                    want == got
                }
            }
            (want, got) => want == got && self.modifiers == key.modifiers,
        }
    }

    /// A bare character that a text field would treat as input.
    pub fn is_printable(&self) -> bool {
        matches!(self.code, KeyCode::Char(_))
            && !self
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    }
}

impl FromStr for KeyBinding {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            bail!("key binding must not be empty");
        }
        if trimmed == "+" {
            return Ok(Self::new(KeyCode::Char('+'), KeyModifiers::NONE));
        }

        let mut parts = trimmed.split('+').collect::<Vec<_>>();
        let key = parts
            .pop()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("key binding {value:?} has no key after the modifiers"))?;

        let mut modifiers = KeyModifiers::NONE;
        for modifier in parts {
            modifiers |= match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                other => bail!("unknown modifier {other:?} in key binding {value:?}"),
            };
        }

        let code = parse_key_code(key)
            .with_context(|| format!("parse key binding {value:?}"))?;
        Ok(Self::new(code, modifiers))
    }
}

fn parse_key_code(key: &str) -> Result<KeyCode> {
    let mut chars = key.chars();
    if let (Some(single), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(single));
    }

    let code = match key.to_ascii_lowercase().as_str() {
        "esc" | "escape" => KeyCode::Esc,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "space" => KeyCode::Char(' '),
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pgup" | "pageup" => KeyCode::PageUp,
        "pgdown" | "pagedown" => KeyCode::PageDown,
        other => {
            if let Some(number) = other.strip_prefix('f')
                && let Ok(number) = number.parse::<u8>()
                && (1..=12).contains(&number)
            {
                KeyCode::F(number)
            } else {
                bail!("unknown key {key:?}");
            }
        }
    };
    Ok(code)
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Esc => f.write_str("esc"),
            KeyCode::Enter => f.write_str("enter"),
            KeyCode::Tab => f.write_str("tab"),
            KeyCode::BackTab => f.write_str("backtab"),
            KeyCode::Backspace => f.write_str("backspace"),
            KeyCode::Delete => f.write_str("delete"),
            KeyCode::Insert => f.write_str("insert"),
            KeyCode::Up => f.write_str("up"),
            KeyCode::Down => f.write_str("down"),
            KeyCode::Left => f.write_str("left"),
            KeyCode::Right => f.write_str("right"),
            KeyCode::Home => f.write_str("home"),
            KeyCode::End => f.write_str("end"),
            KeyCode::PageUp => f.write_str("pgup"),
            KeyCode::PageDown => f.write_str("pgdown"),
            KeyCode::F(number) => write!(f, "f{number}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Key bindings shared by every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    pub quit: Vec<KeyBinding>,
    pub toggle_completed: KeyBinding,
    pub add: KeyBinding,
    pub list: KeyBinding,
    pub delete: Vec<KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            quit: vec![
                KeyBinding::new(KeyCode::Char('q'), KeyModifiers::NONE),
                KeyBinding::new(KeyCode::Esc, KeyModifiers::NONE),
                KeyBinding::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            ],
            toggle_completed: KeyBinding::new(KeyCode::Char('h'), KeyModifiers::CONTROL),
            add: KeyBinding::new(KeyCode::Char('a'), KeyModifiers::CONTROL),
            list: KeyBinding::new(KeyCode::Char('l'), KeyModifiers::CONTROL),
            delete: vec![
                KeyBinding::new(KeyCode::Delete, KeyModifiers::NONE),
                KeyBinding::new(KeyCode::Backspace, KeyModifiers::NONE),
            ],
        }
    }
}

impl KeyMap {
    pub fn parse<Q, D>(
        quit: &[Q],
        toggle_completed: &str,
        add: &str,
        list: &str,
        delete: &[D],
    ) -> Result<Self>
    where
        Q: AsRef<str>,
        D: AsRef<str>,
    {
        if quit.is_empty() {
            bail!("at least one quit key is required");
        }
        Ok(Self {
            quit: parse_all(quit).context("parse quit keys")?,
            toggle_completed: toggle_completed
                .parse()
                .context("parse toggle_completed key")?,
            add: add.parse().context("parse add key")?,
            list: list.parse().context("parse list key")?,
            delete: parse_all(delete).context("parse delete keys")?,
        })
    }

    pub fn is_quit(&self, key: &KeyEvent) -> bool {
        matches_any(&self.quit, key)
    }

    pub fn is_delete(&self, key: &KeyEvent) -> bool {
        matches_any(&self.delete, key)
    }

    /// Whether `key` is a quit key that a focused text field should not swallow.
    pub fn is_quit_while_typing(&self, key: &KeyEvent) -> bool {
        self.quit
            .iter()
            .any(|binding| !binding.is_printable() && binding.matches(key))
    }

    pub fn quit_label(&self) -> String {
        join_labels(self.quit.iter())
    }

    pub fn quit_label_while_typing(&self) -> String {
        join_labels(self.quit.iter().filter(|binding| !binding.is_printable()))
    }
}

fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<KeyBinding>> {
    values.iter().map(|value| value.as_ref().parse()).collect()
}

fn matches_any(bindings: &[KeyBinding], key: &KeyEvent) -> bool {
    bindings.iter().any(|binding| binding.matches(key))
}

fn join_labels<'a>(bindings: impl Iterator<Item = &'a KeyBinding>) -> String {
    bindings
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}
