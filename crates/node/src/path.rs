use std::fmt;

use thiserror::Error;

/// Characters the document store reserves inside a key segment.
const RESERVED: &[char] = &['/', '.', '$', '#', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{what} segment is empty")]
    Empty { what: &'static str },
    #[error("{what} segment {segment:?} contains reserved character {ch:?}")]
    Reserved {
        what: &'static str,
        segment: String,
        ch: char,
    },
}

// ---------------------------------------------------------------------------
// Record path
// ---------------------------------------------------------------------------

/// Location of one plant's record: `<user>/<plant>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPath {
    user: String,
    plant: String,
}

impl RecordPath {
    pub fn new(user: &str, plant: &str) -> Result<Self, PathError> {
        Ok(Self {
            user: check_segment("user", user)?.to_string(),
            plant: check_segment("plant", plant)?.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn plant(&self) -> &str {
        &self.plant
    }

    pub fn root(&self) -> String {
        format!("{}/{}", self.user, self.plant)
    }

    /// `"<user>/<plant>/<field>"`.
    pub fn field(&self, name: &str) -> String {
        format!("{}/{}/{name}", self.user, self.plant)
    }

    /// Append-only collection of history snapshots.
    pub fn history(&self) -> String {
        self.field("history")
    }

    /// Scalar field read by the startup reachability check.  The record
    /// root also holds `history`, which grows without bound.
    pub fn reachability_path(&self) -> String {
        self.field("plantID")
    }
}

impl fmt::Display for RecordPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user, self.plant)
    }
}

/// Validate a single key segment.  Returns the segment unchanged.
pub fn check_segment<'a>(what: &'static str, segment: &'a str) -> Result<&'a str, PathError> {
    if segment.trim().is_empty() {
        return Err(PathError::Empty { what });
    }
    if let Some(ch) = segment.chars().find(|c| RESERVED.contains(c)) {
        return Err(PathError::Reserved {
            what,
            segment: segment.to_string(),
            ch,
        });
    }
    Ok(segment)
}

/// Split a slash path into its non-empty segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

// ===========================================================================
// Tests
// ===========================================================================
