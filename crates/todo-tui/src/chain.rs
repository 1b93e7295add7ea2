// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use todo_app::{ViewError, ViewKind};
use tracing::{debug, info, warn};

use crate::{CancelSignal, Runner, ViewModel};

/// What a finished chain went through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    pub visited: Vec<ViewKind>,
    /// Non-fatal errors recorded by views, in the order they happened.
    pub errors: Vec<ViewError>,
}

/// Runs views back to back until one asks for no successor.
///
/// `open` builds a fresh model for a view kind; `launch` starts a runner for
/// it. Fatal view errors end the chain with an error. Anything else is
/// collected into the report and the chain moves on to the requested view.
pub struct ViewChain<O, L>
where
    O: FnMut(ViewKind) -> Result<Box<dyn ViewModel>>,
    L: FnMut(Box<dyn ViewModel>, &CancelSignal) -> Runner,
{
    open: O,
    launch: L,
}

impl<O> ViewChain<O, fn(Box<dyn ViewModel>, &CancelSignal) -> Runner>
where
    O: FnMut(ViewKind) -> Result<Box<dyn ViewModel>>,
{
    /// A chain whose views take over the terminal.
    pub fn in_terminal(open: O) -> Self {
        Self {
            open,
            launch: Runner::start,
        }
    }
}

impl<O, L> ViewChain<O, L>
where
    O: FnMut(ViewKind) -> Result<Box<dyn ViewModel>>,
    L: FnMut(Box<dyn ViewModel>, &CancelSignal) -> Runner,
{
    pub fn new(open: O, launch: L) -> Self {
        Self { open, launch }
    }

    pub fn run(&mut self, first: ViewKind, cancel: &CancelSignal) -> Result<ChainReport> {
        let mut report = ChainReport::default();
        let mut current = first;

        while !current.is_none() && !cancel.is_cancelled() {
            debug!(view = current.as_str(), "opening view");
            let model = (self.open)(current)
                .with_context(|| format!("open {} view", current.as_str()))?;
            let runner = (self.launch)(model, cancel);

            let outcome = runner.wait();
            let next = runner.next();
            report.visited.push(current);

            match outcome {
                Err(error) if error.is_fatal() => {
                    return Err(error).with_context(|| format!("run {} view", current.as_str()));
                }
                Err(error) => {
                    warn!(view = current.as_str(), %error, "view finished with an error");
                    report.errors.push(error);
                }
                Ok(()) => {}
            }

            current = next;
        }

        info!(views = report.visited.len(), "view chain finished");
        Ok(report)
    }
}
