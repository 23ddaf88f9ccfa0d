//! Single-threaded foreground event loop
//!
//! Stands in for a UI thread: events are queued through a [`LoopHandle`]
//! and serviced strictly in order by whoever owns the [`ForegroundLoop`].

use crate::probe::TraceToken;
use anyhow::{anyhow, Result};
use log::debug;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Unit of work executed on the foreground thread
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Events accepted by the foreground loop
pub enum ForegroundEvent {
    /// Run a closure on the foreground thread
    Task(Task),
    /// Synthetic round-trip probe; completing it wakes the sampler
    Trace(TraceToken),
    /// Stop the loop after this event
    Quit,
}

/// Counters kept by the loop while it runs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Number of tasks executed
    pub tasks_run: u64,
    /// Number of probe events serviced
    pub traces_serviced: u64,
}

/// Cloneable sender side of the foreground loop
#[derive(Clone)]
pub struct LoopHandle {
    sender: Sender<ForegroundEvent>,
}

impl LoopHandle {
    /// Queue a closure to run on the foreground thread
    pub fn post<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(ForegroundEvent::Task(Box::new(task)))
    }

    /// Ask the loop to stop once it reaches this event
    pub fn quit(&self) -> Result<()> {
        self.send(ForegroundEvent::Quit)
    }

    pub(crate) fn send(&self, event: ForegroundEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| anyhow!("foreground loop has shut down"))
    }
}

/// Receiver side of the foreground loop
pub struct ForegroundLoop {
    receiver: Receiver<ForegroundEvent>,
    stats: LoopStats,
    quit: bool,
}

impl ForegroundLoop {
    /// Create a loop and the handle used to feed it
    pub fn new() -> (Self, LoopHandle) {
        let (sender, receiver) = mpsc::channel();
        let event_loop = Self {
            receiver,
            stats: LoopStats::default(),
            quit: false,
        };
        (event_loop, LoopHandle { sender })
    }

    /// Service events until `Quit` is received or every handle is dropped
    pub fn run(mut self) -> LoopStats {
        debug!("Foreground loop running");

        while !self.quit {
            match self.receiver.recv() {
                Ok(event) => self.dispatch(event),
                Err(_) => break,
            }
        }

        debug!(
            "Foreground loop exited: {} tasks, {} traces",
            self.stats.tasks_run, self.stats.traces_serviced
        );
        self.stats
    }

    /// Service everything already queued without blocking
    ///
    /// Returns the number of events dispatched. For embedding the loop
    /// into another one that owns the thread.
    pub fn pump_pending(&mut self) -> usize {
        let mut dispatched = 0;

        while !self.quit {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.dispatch(event);
                    dispatched += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        dispatched
    }

    /// Whether a `Quit` event has been serviced
    pub fn is_quit(&self) -> bool {
        self.quit
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    fn dispatch(&mut self, event: ForegroundEvent) {
        match event {
            ForegroundEvent::Task(task) => {
                task();
                self.stats.tasks_run += 1;
            }
            ForegroundEvent::Trace(token) => {
                token.complete();
                self.stats.traces_serviced += 1;
            }
            ForegroundEvent::Quit => self.quit = true,
        }
    }
}
