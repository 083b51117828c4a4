//! Cooperative periodic timer.  A [`Ticker`] never sleeps and owns no
//! thread; the loop calls [`Ticker::update`] with the current time and the
//! ticker reports whether its deadline was reached.
//!
//! ## State machine
//!
//! ```text
//! Idle ──[start]──▶ Armed ──[update, now < next]──▶ Armed
//!                     ▲                                │
//!                     └──[fire, repeats remain]────────┤ [update, now >= next]
//!                                                      ▼
//!                                Stopped ◀──[fire, last repeat]
//! ```

use tracing::warn;

// ---------------------------------------------------------------------------
// Configuration types
// ---------------------------------------------------------------------------

/// How many times a ticker fires before stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

impl From<u32> for Repeat {
    /// `0` means "repeat forever", matching the classic ticker contract.
    fn from(count: u32) -> Self {
        if count == 0 {
            Self::Forever
        } else {
            Self::Times(count)
        }
    }
}

/// How the next deadline is computed after a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftPolicy {
    /// `next = previous deadline + interval`.  Callback duration does not
    /// accumulate; deadlines missed entirely are skipped, keeping the phase.
    #[default]
    FromDeadline,
    /// `next = now + interval`.  Each fire pushes the schedule back by however
    /// late the update was.
    FromNow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerState {
    Idle,
    Armed { next_fire_ms: u64 },
    Stopped,
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Ticker {
    interval_ms: u64,
    repeat: Repeat,
    policy: DriftPolicy,
    state: TickerState,
    fires: u32,
    missed: u64,
}

impl Ticker {
    /// A zero interval is treated as 1 ms so an armed ticker can never fire
    /// twice for the same instant.
    pub fn new(interval_ms: u64, repeat: Repeat) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            repeat,
            policy: DriftPolicy::default(),
            state: TickerState::Idle,
            fires: 0,
            missed: 0,
        }
    }

    pub fn with_policy(mut self, policy: DriftPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Arm the ticker: first deadline is `now + interval`.  Restarting an
    /// armed or stopped ticker resets its fire count.
    pub fn start(&mut self, now_ms: u64) {
        self.fires = 0;
        self.missed = 0;
        self.state = TickerState::Armed {
            next_fire_ms: now_ms + self.interval_ms,
        };
    }

    pub fn stop(&mut self) {
        self.state = TickerState::Stopped;
    }

    /// Returns `true` exactly when the ticker fired on this call.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let TickerState::Armed { next_fire_ms } = self.state else {
            return false;
        };
        if now_ms < next_fire_ms {
            return false;
        }

        self.fires = self.fires.saturating_add(1);

        if let Repeat::Times(n) = self.repeat {
            if self.fires >= n {
                self.state = TickerState::Stopped;
                return true;
            }
        }

        let next = match self.policy {
            DriftPolicy::FromNow => now_ms + self.interval_ms,
            DriftPolicy::FromDeadline => {
                let mut next = next_fire_ms + self.interval_ms;
                if next <= now_ms {
                    let skipped = (now_ms - next) / self.interval_ms + 1;
                    next += skipped * self.interval_ms;
                    self.missed += skipped;
                    warn!(
                        interval_ms = self.interval_ms,
                        skipped,
                        late_ms = now_ms - next_fire_ms,
                        "ticker fell behind, skipping missed deadlines"
                    );
                }
                next
            }
        };
        self.state = TickerState::Armed { next_fire_ms: next };
        true
    }

    pub fn state(&self) -> TickerState {
        self.state
    }

    pub fn next_fire_ms(&self) -> Option<u64> {
        match self.state {
            TickerState::Armed { next_fire_ms } => Some(next_fire_ms),
            _ => None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn fire_count(&self) -> u32 {
        self.fires
    }

    /// Deadlines skipped because the loop was more than one interval late.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

// ===========================================================================
// Tests
// ===========================================================================
