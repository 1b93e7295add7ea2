// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::dates::format_date;
use crate::ids::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub complete: bool,
    #[serde(with = "time::serde::timestamp")]
    pub due_date: OffsetDateTime,
}

impl Task {
    /// Row label shown by the list view: `"<id> - <title> ~ due <date>"`.
    pub fn label(&self) -> String {
        format!(
            "{} - {} ~ due {}",
            self.id,
            self.title,
            format_date(self.due_date.date())
        )
    }
}

/// Which view the chain should run. `None` terminates the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewKind {
    #[default]
    None,
    List,
    Add,
}

impl ViewKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::List => "list",
            Self::Add => "add",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "list" => Some(Self::List),
            "add" => Some(Self::Add),
            _ => None,
        }
    }

    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}
