//! Fixed set of independently timed tasks driven from one cooperative loop.
//!
//! The scheduler decides *when*; it knows nothing about *what* a task does.
//! Each registered task carries an opaque action value that [`Scheduler::poll`]
//! hands back when the task is due, so the owner dispatches it with a plain
//! `match` and runs it to completion before looking at the next one.

use tracing::debug;

use crate::ticker::{DriftPolicy, Repeat, Ticker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

#[derive(Debug)]
struct Entry<T> {
    action: T,
    ticker: Ticker,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    entries: Vec<Entry<T>>,
    policy: DriftPolicy,
    started_at: Option<u64>,
}

impl<T: Clone + std::fmt::Debug> Scheduler<T> {
    pub fn new() -> Self {
        Self::with_policy(DriftPolicy::default())
    }

    pub fn with_policy(policy: DriftPolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            started_at: None,
        }
    }

    /// Register a task.  Tasks registered after [`start`](Self::start) are
    /// armed relative to the start time.
    pub fn register_task(&mut self, interval_ms: u64, repeat: Repeat, action: T) -> TaskId {
        let mut ticker = Ticker::new(interval_ms, repeat).with_policy(self.policy);
        if let Some(at) = self.started_at {
            ticker.start(at);
        }
        debug!(?action, interval_ms, ?repeat, "task registered");
        self.entries.push(Entry { action, ticker });
        TaskId(self.entries.len() - 1)
    }

    /// Arm every task at `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        self.started_at = Some(now_ms);
        for entry in &mut self.entries {
            entry.ticker.start(now_ms);
        }
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Update every ticker once, in registration order, and return the
    /// actions that fired.  Each task appears at most once per poll.
    pub fn poll(&mut self, now_ms: u64) -> Vec<T> {
        self.entries
            .iter_mut()
            .filter_map(|e| e.ticker.update(now_ms).then(|| e.action.clone()))
            .collect()
    }

    /// Earliest pending deadline across all armed tasks.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries
            .iter()
            .filter_map(|e| e.ticker.next_fire_ms())
            .min()
    }

    /// `true` once started and every task has run out of repeats.
    pub fn is_finished(&self) -> bool {
        self.is_started() && self.next_deadline().is_none()
    }

    pub fn ticker(&self, id: TaskId) -> Option<&Ticker> {
        self.entries.get(id.0).map(|e| &e.ticker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.action)
    }
}

impl<T: Clone + std::fmt::Debug> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
