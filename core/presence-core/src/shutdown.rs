//! Cooperative shutdown flag.
//!
//! Signal handlers only flip the flag. The supervisor observes it at the top
//! of each tick and while sleeping between ticks, so cleanup never runs
//! concurrently with an in-flight host or presence call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_SLICE_MS: u64 = 50;

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw flag, for registration with OS signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleeps for up to `duration`, returning early (with `true`) once the
    /// flag is set.
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;
            thread::sleep(remaining.min(Duration::from_millis(WAIT_SLICE_MS)));
        }
    }
}
