//! Test doubles shared by the unit tests

use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracer_common::{ProbeOutcome, RoundTripProbe};

/// In-memory sink that stays readable after the writer is dropped
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Gate {
    interrupted: Mutex<bool>,
    cond: Condvar,
}

/// Probe whose round trips take scripted amounts of time
///
/// Each `fire_and_wait` pops the next delay; once the script runs out the
/// probe blocks until interrupted, like a foreground loop that stopped
/// responding.
#[derive(Default)]
pub struct ScriptedProbe {
    delays: Mutex<VecDeque<Duration>>,
    gate: Gate,
    pub fail_init: AtomicBool,
    pub panic_on_fire: AtomicBool,
    pub inits: AtomicUsize,
    pub fires: AtomicUsize,
    pub interrupts: AtomicUsize,
    pub cleanups: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: Mutex::new(delays.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Probe that never completes a round trip
    pub fn hung() -> Self {
        Self::default()
    }

    pub fn failing_init() -> Self {
        let probe = Self::default();
        probe.fail_init.store(true, Ordering::SeqCst);
        probe
    }

    /// Probe that takes the sampler thread down on its first fire
    pub fn panicking() -> Self {
        let probe = Self::default();
        probe.panic_on_fire.store(true, Ordering::SeqCst);
        probe
    }
}

impl RoundTripProbe for ScriptedProbe {
    fn init(&self) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            bail!("scripted init failure");
        }
        *self.gate.interrupted.lock().unwrap() = false;
        Ok(())
    }

    fn fire_and_wait(&self) -> ProbeOutcome {
        self.fires.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_fire.load(Ordering::SeqCst) {
            panic!("scripted sampler failure");
        }
        let next = self.delays.lock().unwrap().pop_front();

        let guard = self.gate.interrupted.lock().unwrap();
        match next {
            Some(delay) => {
                let (interrupted, _) = self
                    .gate
                    .cond
                    .wait_timeout_while(guard, delay, |interrupted| !*interrupted)
                    .unwrap();
                if *interrupted {
                    ProbeOutcome::Interrupted
                } else {
                    ProbeOutcome::Completed
                }
            }
            None => {
                let _unused = self
                    .gate
                    .cond
                    .wait_while(guard, |interrupted| !*interrupted)
                    .unwrap();
                ProbeOutcome::Interrupted
            }
        }
    }

    fn interrupt(&self) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        *self.gate.interrupted.lock().unwrap() = true;
        self.gate.cond.notify_all();
    }

    fn cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }
}

/// Poll `condition` until it holds, failing the test after `timeout`
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) {
    let deadline = std::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not met within {:?}",
            timeout
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}
