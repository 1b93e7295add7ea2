// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct SignalState {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    hooks: Mutex<Vec<(u64, Hook)>>,
}

impl SignalState {
    fn hooks(&self) -> MutexGuard<'_, Vec<(u64, Hook)>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide cancellation flag with hooks.
///
/// Clones share state. `cancel` runs every registered hook once, on the
/// caller's thread. Registering after cancellation runs the hook
/// immediately.
#[derive(Clone, Default)]
pub struct CancelSignal {
    state: Arc<SignalState>,
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = std::mem::take(&mut *self.state.hooks());
        for (_, hook) in hooks {
            hook();
        }
    }

    pub fn register(&self, hook: impl FnOnce() + Send + 'static) -> CancelRegistration {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        let mut hooks = self.state.hooks();
        if self.is_cancelled() {
            drop(hooks);
            hook();
        } else {
            hooks.push((id, Box::new(hook)));
        }
        CancelRegistration {
            state: Arc::clone(&self.state),
            id,
        }
    }
}

/// Removes its hook from the signal when dropped.
pub struct CancelRegistration {
    state: Arc<SignalState>,
    id: u64,
}

impl fmt::Debug for CancelRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelRegistration")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for CancelRegistration {
    fn drop(&mut self) {
        self.state.hooks().retain(|(id, _)| *id != self.id);
    }
}
