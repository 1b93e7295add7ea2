// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Runs one [`ViewModel`] to completion on its own thread.
//!
//! Everything the loop reacts to arrives on one channel: terminal input,
//! injected events, stop requests and input failures. The loop blocks on
//! that channel between frames. When it ends the runner calls the model's
//! `cleanup`, publishes the outcome, and wakes every waiter.

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use todo_app::{ViewError, ViewKind};
use tracing::{debug, error, info};

use crate::{CancelRegistration, CancelSignal, Flow, ViewEvent, ViewModel};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug)]
enum LoopMessage {
    Event(ViewEvent),
    Cancel,
    Failed(ViewError),
}

#[derive(Debug, Clone)]
struct Outcome {
    result: Result<(), ViewError>,
    next: ViewKind,
}

#[derive(Debug, Default)]
struct Completion {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl Completion {
    fn lock(&self) -> MutexGuard<'_, Option<Outcome>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, outcome: Outcome) {
        *self.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut guard = self.lock();
        loop {
            if let Some(outcome) = guard.as_ref() {
                return outcome.clone();
            }
            guard = self
                .done
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Requests early termination of a running loop. The first call wins.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<LoopMessage>,
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        if self.requested.swap(true, Ordering::AcqRel) {
            return;
        }
        // The loop may already be gone; nothing left to stop then.
        let _ = self.tx.send(LoopMessage::Cancel);
    }
}

#[derive(Debug)]
pub struct Runner {
    kind: ViewKind,
    tx: Sender<LoopMessage>,
    stop: StopHandle,
    completion: Arc<Completion>,
    _registration: CancelRegistration,
}

impl Runner {
    /// Takes over the terminal and runs `model` until it exits.
    pub fn start(model: Box<dyn ViewModel>, cancel: &CancelSignal) -> Self {
        Self::spawn(model, cancel, |model, rx, tx| run_in_terminal(model, &rx, tx))
    }

    /// Runs `model` against `backend` with no input thread; feed it with [`Runner::inject`].
    pub fn start_with_backend<B>(
        model: Box<dyn ViewModel>,
        cancel: &CancelSignal,
        backend: B,
    ) -> Self
    where
        B: Backend + Send + 'static,
    {
        Self::spawn(model, cancel, move |model, rx, tx| {
            drop(tx);
            let mut terminal = Terminal::new(backend)
                .map_err(|error| ViewError::lifecycle("create terminal", error))?;
            drive_guarded(&mut terminal, model, &rx)
        })
    }

    fn spawn<F>(mut model: Box<dyn ViewModel>, cancel: &CancelSignal, body: F) -> Self
    where
        F: FnOnce(
                &mut dyn ViewModel,
                Receiver<LoopMessage>,
                Sender<LoopMessage>,
            ) -> Result<(), ViewError>
            + Send
            + 'static,
    {
        let kind = model.kind();
        let (tx, rx) = mpsc::channel();
        let stop = StopHandle {
            tx: tx.clone(),
            requested: Arc::new(AtomicBool::new(false)),
        };
        let completion = Arc::new(Completion::default());

        let loop_tx = tx.clone();
        let loop_completion = Arc::clone(&completion);
        thread::spawn(move || {
            debug!(view = kind.as_str(), "view loop started");
            let loop_result = body(model.as_mut(), rx, loop_tx);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                model.cleanup();
                let result =
                    loop_result.and_then(|()| model.err().cloned().map_or(Ok(()), Err));
                Outcome {
                    result,
                    next: model.next(),
                }
            }))
            .unwrap_or_else(|_| Outcome {
                result: Err(ViewError::Lifecycle("view cleanup panicked".to_owned())),
                next: ViewKind::None,
            });
            if let Err(error) = &outcome.result
                && error.is_fatal()
            {
                error!(view = kind.as_str(), %error, "view loop failed");
            }
            debug!(view = kind.as_str(), next = outcome.next.as_str(), "view loop finished");
            loop_completion.publish(outcome);
        });

        let hook_stop = stop.clone();
        let registration = cancel.register(move || {
            info!(view = kind.as_str(), "cancellation requested");
            hook_stop.stop();
        });

        Self {
            kind,
            tx,
            stop,
            completion,
            _registration: registration,
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    /// Forwards an event to the loop. False once the loop has ended.
    pub fn inject(&self, event: ViewEvent) -> bool {
        !self.is_finished() && self.tx.send(LoopMessage::Event(event)).is_ok()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Blocks until the loop ends. A loop failure wins over the model's own error.
    pub fn wait(&self) -> Result<(), ViewError> {
        self.completion.wait().result
    }

    /// Blocks until the loop ends, then reports where the model wants to go.
    pub fn next(&self) -> ViewKind {
        self.completion.wait().next
    }

    pub fn is_finished(&self) -> bool {
        self.completion.lock().is_some()
    }
}

fn drive_guarded<B: Backend>(
    terminal: &mut Terminal<B>,
    model: &mut dyn ViewModel,
    rx: &Receiver<LoopMessage>,
) -> Result<(), ViewError> {
    panic::catch_unwind(AssertUnwindSafe(|| drive(terminal, model, rx)))
        .unwrap_or_else(|_| Err(ViewError::Lifecycle("view loop panicked".to_owned())))
}

fn drive<B: Backend>(
    terminal: &mut Terminal<B>,
    model: &mut dyn ViewModel,
    rx: &Receiver<LoopMessage>,
) -> Result<(), ViewError> {
    if model.init() == Flow::Exit {
        return Ok(());
    }

    loop {
        terminal
            .draw(|frame| model.render(frame))
            .map_err(|error| ViewError::lifecycle("draw frame", error))?;

        let message = rx.recv().unwrap_or(LoopMessage::Cancel);
        let flow = match message {
            LoopMessage::Event(event) => model.update(event),
            LoopMessage::Cancel => {
                model.update(ViewEvent::Cancel);
                Flow::Exit
            }
            LoopMessage::Failed(error) => return Err(error),
        };
        if flow == Flow::Exit {
            return Ok(());
        }
    }
}

fn run_in_terminal(
    model: &mut dyn ViewModel,
    rx: &Receiver<LoopMessage>,
    tx: Sender<LoopMessage>,
) -> Result<(), ViewError> {
    enable_raw_mode().map_err(|error| ViewError::lifecycle("enable raw mode", error))?;
    let mut stdout = io::stdout();
    if let Err(error) = execute!(stdout, terminal::EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(ViewError::lifecycle("enter alternate screen", error));
    }

    let result = match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(mut terminal) => {
            let stop_input = Arc::new(AtomicBool::new(false));
            let input = spawn_input_thread(tx, Arc::clone(&stop_input));
            let result = drive_guarded(&mut terminal, model, rx);
            stop_input.store(true, Ordering::Release);
            if input.join().is_err() {
                error!("input thread panicked");
            }
            result
        }
        Err(error) => Err(ViewError::lifecycle("create terminal", error)),
    };

    let restored = restore_terminal();
    result.and(restored)
}

fn restore_terminal() -> Result<(), ViewError> {
    disable_raw_mode().map_err(|error| ViewError::lifecycle("disable raw mode", error))?;
    execute!(
        io::stdout(),
        terminal::LeaveAlternateScreen,
        cursor::Show
    )
    .map_err(|error| ViewError::lifecycle("leave alternate screen", error))
}

fn spawn_input_thread(tx: Sender<LoopMessage>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Acquire) {
            let message = match event::poll(INPUT_POLL_INTERVAL) {
                Ok(false) => continue,
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        LoopMessage::Event(ViewEvent::Key(key))
                    }
                    Ok(Event::Resize(width, height)) => {
                        LoopMessage::Event(ViewEvent::Resize(width, height))
                    }
                    Ok(_) => continue,
                    Err(error) => LoopMessage::Failed(ViewError::lifecycle("read input", error)),
                },
                Err(error) => LoopMessage::Failed(ViewError::lifecycle("poll input", error)),
            };
            let failed = matches!(message, LoopMessage::Failed(_));
            if tx.send(message).is_err() || failed {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::Runner;
    use crate::test_support::ch;
    use crate::{CancelSignal, Flow, KeyMap, ListView, ViewEvent, ViewModel};
    use anyhow::Result;
    use ratatui::Frame;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;
    use todo_app::{StoreError, ViewError, ViewKind};
    use todo_testkit::{RecordingStore, StoreOp, sample_tasks};

    #[derive(Default)]
    struct StubView {
        quit_on_init: bool,
        panic_on_cleanup: bool,
        cleanups: Arc<AtomicUsize>,
        cancels: Arc<AtomicUsize>,
        error: Option<ViewError>,
        next: ViewKind,
    }

    impl ViewModel for StubView {
        fn kind(&self) -> ViewKind {
            ViewKind::List
        }

        fn init(&mut self) -> Flow {
            if self.quit_on_init {
                Flow::Exit
            } else {
                Flow::Continue
            }
        }

        fn update(&mut self, event: ViewEvent) -> Flow {
            match event {
                ViewEvent::Cancel => {
                    self.cancels.fetch_add(1, Ordering::SeqCst);
                    Flow::Exit
                }
                ViewEvent::Error(error) => {
                    self.error = Some(error);
                    Flow::Continue
                }
                ViewEvent::Key(_) => {
                    self.next = ViewKind::Add;
                    Flow::Exit
                }
                ViewEvent::Resize(..) => Flow::Continue,
            }
        }

        fn render(&self, _frame: &mut Frame<'_>) {}

        fn err(&self) -> Option<&ViewError> {
            self.error.as_ref()
        }

        fn next(&self) -> ViewKind {
            self.next
        }

        fn cleanup(&mut self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            if self.panic_on_cleanup {
                panic!("cleanup exploded");
            }
        }
    }

    fn headless(model: Box<dyn ViewModel>, cancel: &CancelSignal) -> Runner {
        Runner::start_with_backend(model, cancel, TestBackend::new(40, 10))
    }

    #[test]
    fn model_quitting_in_init_finishes_cleanly() {
        let runner = headless(
            Box::new(StubView {
                quit_on_init: true,
                ..StubView::default()
            }),
            &CancelSignal::new(),
        );
        assert_eq!(runner.wait(), Ok(()));
        assert_eq!(runner.next(), ViewKind::None);
        assert!(runner.is_finished());
        assert!(!runner.inject(ViewEvent::Cancel));
    }

    #[test]
    fn panicking_cleanup_still_releases_waiters() {
        let view = StubView {
            quit_on_init: true,
            panic_on_cleanup: true,
            next: ViewKind::Add,
            ..StubView::default()
        };
        let cleanups = Arc::clone(&view.cleanups);
        let runner = headless(Box::new(view), &CancelSignal::new());

        let error = runner.wait().expect_err("cleanup panic should surface");
        assert!(error.is_fatal());
        assert_eq!(runner.next(), ViewKind::None);
        assert!(runner.is_finished());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_is_idempotent_and_wait_repeats() {
        let view = StubView::default();
        let cancels = Arc::clone(&view.cancels);
        let cleanups = Arc::clone(&view.cleanups);
        let runner = headless(Box::new(view), &CancelSignal::new());

        runner.stop();
        runner.stop();

        assert_eq!(runner.wait(), Ok(()));
        assert_eq!(runner.wait(), Ok(()));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wait_blocks_until_stopped() {
        let runner = headless(Box::new(StubView::default()), &CancelSignal::new());
        let stop = runner.stop_handle();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            stop.stop();
        });

        let start = std::time::Instant::now();
        assert_eq!(runner.wait(), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(50));
        stopper.join().expect("stopper thread panicked");
    }

    #[test]
    fn concurrent_waiters_see_the_same_outcome() {
        let runner = Arc::new(headless(Box::new(StubView::default()), &CancelSignal::new()));
        let waiters = (0..4)
            .map(|_| {
                let runner = Arc::clone(&runner);
                thread::spawn(move || runner.wait())
            })
            .collect::<Vec<_>>();

        runner.inject(ViewEvent::Error(ViewError::from(StoreError::Closed)));
        runner.stop();

        for waiter in waiters {
            assert_eq!(
                waiter.join().expect("waiter panicked"),
                Err(ViewError::from(StoreError::Closed))
            );
        }
    }

    #[test]
    fn cancel_signal_stops_a_running_loop() {
        let cancel = CancelSignal::new();
        let view = StubView::default();
        let cancels = Arc::clone(&view.cancels);
        let runner = headless(Box::new(view), &cancel);

        cancel.cancel();

        assert_eq!(runner.wait(), Ok(()));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn already_cancelled_signal_stops_after_init() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        let view = StubView::default();
        let cancels = Arc::clone(&view.cancels);

        let runner = headless(Box::new(view), &cancel);

        assert_eq!(runner.wait(), Ok(()));
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn injected_key_reports_next_view() {
        let runner = headless(Box::new(StubView::default()), &CancelSignal::new());
        assert!(runner.inject(ViewEvent::Key(ch('a'))));
        assert_eq!(runner.next(), ViewKind::Add);
        assert_eq!(runner.kind(), ViewKind::List);
    }

    #[test]
    fn quit_racing_cancel_cleans_up_once() -> Result<()> {
        for _ in 0..20 {
            let store = Arc::new(RecordingStore::with_tasks(sample_tasks()));
            let view = ListView::new(store.clone(), KeyMap::default())?;
            let cancel = CancelSignal::new();
            let runner = headless(Box::new(view), &cancel);

            let canceller = {
                let cancel = cancel.clone();
                thread::spawn(move || cancel.cancel())
            };
            runner.inject(ViewEvent::Key(ch('q')));
            canceller.join().expect("cancel thread panicked");

            assert_eq!(runner.wait(), Ok(()));
            assert_eq!(store.count(StoreOp::UpdateBatch), 1);
            assert_eq!(store.count(StoreOp::Close), 1);
        }
        Ok(())
    }
}
