// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::TaskId;

/// Input rejected by a form field. Shown inline; the view stays interactive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task name cannot be empty")]
    EmptyTitle,
    #[error("{0:?} is not a valid date; use YYYY-MM-DD")]
    InvalidDate(String),
    #[error("{0} is in the past")]
    PastDate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{op}: {message}")]
    Sqlite { op: &'static str, message: String },
    #[error("task store is closed")]
    Closed,
    #[error("task {0} not found -- it may have been deleted")]
    NotFound(TaskId),
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn sqlite(op: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Sqlite {
            op,
            message: error.to_string(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The error slot of a view and the outcome type of a runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("terminal loop failed: {0}")]
    Lifecycle(String),
}

impl ViewError {
    pub fn lifecycle(context: &str, error: impl std::fmt::Display) -> Self {
        Self::Lifecycle(format!("{context}: {error}"))
    }

    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Lifecycle(_))
    }
}
