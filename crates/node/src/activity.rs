use std::collections::VecDeque;

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    /// A sensor group was sampled successfully.
    Sample,
    /// A sensor read failed and the sentinel was stored.
    SensorFault,
    /// The store confirmed a write (path = value).
    Write,
    /// A write was refused or never reached the store.
    WriteFailed,
    /// Schema repair filled in a missing field.
    Repair,
    /// A history entry was appended.
    Snapshot,
    SnapshotFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub at_ms: u64,
    pub kind: ActivityKind,
    pub detail: String,
}

/// Bounded record of what the node did recently, newest last.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    events: VecDeque<Activity>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn push(&mut self, at_ms: u64, kind: ActivityKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(Activity {
            at_ms,
            kind,
            detail,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.events.iter()
    }

    pub fn of_kind(&self, kind: ActivityKind) -> impl Iterator<Item = &Activity> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: ActivityKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn last(&self) -> Option<&Activity> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
