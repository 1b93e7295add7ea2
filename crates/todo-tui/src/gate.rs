// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot latch around a view's persist-and-close sequence.
#[derive(Debug, Default)]
pub struct CleanupGate {
    closed: AtomicBool,
}

impl CleanupGate {
    pub const fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }

    /// True for exactly one caller; every later call sees the gate closed.
    pub fn try_enter(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
