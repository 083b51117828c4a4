//! Millisecond time sources for the cooperative loop.
//!
//! The scheduler never reads the wall clock directly; it asks a [`Clock`].
//! Production uses [`SystemClock`] (monotonic, starts at 0 when created, and
//! follows tokio's paused clock under `start_paused`); unit tests use
//! [`ManualClock`] and advance it by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin.  Never goes backwards.
    fn now_ms(&self) -> u64;
}

// ---------------------------------------------------------------------------
// Monotonic clock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// ---------------------------------------------------------------------------
// Manually advanced clock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.  Clones share the same time, so a
/// test can keep one handle while the node owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump to `at_ms`.  Earlier values are ignored so time stays monotonic.
    pub fn set(&self, at_ms: u64) {
        self.now.fetch_max(at_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
