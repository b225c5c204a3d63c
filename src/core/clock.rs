//! Monotonic time source.
//!
//! Everything that needs "now" in seconds goes through this trait so tests
//! can drive keep-alive and timeout logic without sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of monotonic wall-clock seconds.
pub trait Clock: Send + Sync {
    /// Current time, seconds since the epoch.
    fn now_secs(&self) -> i64;

    /// Current time, milliseconds since the epoch.
    fn now_millis(&self) -> i64 {
        self.now_secs() * 1000
    }
}

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs() as i64
    }

    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_millis() as i64
    }
}

/// A manually advanced clock for deterministic tests.
#[derive(Debug, Default)]
pub struct TestClock {
    secs: AtomicI64,
}

impl TestClock {
    /// Build a test clock starting at `start_secs`.
    pub fn new(start_secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(start_secs),
        }
    }

    /// Advance the clock by `delta` seconds.
    pub fn advance(&self, delta: i64) {
        self.secs.fetch_add(delta, Ordering::SeqCst);
    }

    /// Set the clock to an absolute value.
    pub fn set(&self, secs: i64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_secs(&self) -> i64 {
        self.secs.load(Ordering::SeqCst)
    }
}
