//! Remote document store boundary.
//!
//! The store is addressed by slash-separated key paths (`alice/plant-1/maxTemp`)
//! and holds JSON values.  Backends: [`MemoryStore`](crate::memory::MemoryStore)
//! and [`RestStore`](crate::rest::RestStore).

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::path::RecordPath;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// Nothing stored at `path`.  Expected during schema repair.
    #[error("no value at {path}")]
    NotFound { path: String },
    /// The store answered but refused the operation.
    #[error("store rejected {op} {path}: {reason}")]
    Rejected {
        op: &'static str,
        path: String,
        reason: String,
    },
    /// The store could not be reached (connect failure, timeout, reset).
    #[error("store unreachable: {0}")]
    Transport(String),
    /// The store replied with something that is not the expected shape.
    #[error("malformed store response: {0}")]
    Malformed(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A typed scalar written to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Int(v) => Value::from(*v),
            Self::Float(v) => Value::from(*v),
            Self::Str(v) => Value::from(v.as_str()),
        }
    }

    /// Fails for a NaN or infinite float, which has no JSON form.
    pub fn check_finite(&self, op: &'static str, path: &str) -> Result<(), RemoteError> {
        match self {
            Self::Float(v) => check_finite(op, path, *v),
            _ => Ok(()),
        }
    }
}

/// JSON has no NaN/inf and `serde_json` turns them into `null`, so backends
/// refuse them instead of storing a null.
pub fn check_finite(op: &'static str, path: &str, value: f64) -> Result<(), RemoteError> {
    if value.is_finite() {
        return Ok(());
    }
    Err(RemoteError::Rejected {
        op,
        path: path.to_string(),
        reason: format!("{value} is not a finite number"),
    })
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Key-path document store with typed field writes and append-only pushes.
///
/// Methods take `&self`; backends handle their own interior mutability so a
/// test can keep a clone of the store while the node owns another.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn get(&self, path: &str) -> Result<Value, RemoteError>;

    async fn set_int(&self, path: &str, value: i64) -> Result<(), RemoteError>;

    async fn set_float(&self, path: &str, value: f64) -> Result<(), RemoteError>;

    async fn set_string(&self, path: &str, value: &str) -> Result<(), RemoteError>;

    /// Append `json` under the collection at `path` and return the
    /// store-generated key of the new child.
    async fn push_json(&self, path: &str, json: &Value) -> Result<String, RemoteError>;

    /// Merge the members of the object `json` into the object at `path`,
    /// leaving other members untouched.
    async fn update_json(&self, path: &str, json: &Value) -> Result<(), RemoteError>;

    async fn set_value(&self, path: &str, value: &FieldValue) -> Result<(), RemoteError> {
        match value {
            FieldValue::Int(v) => self.set_int(path, *v).await,
            FieldValue::Float(v) => self.set_float(path, *v).await,
            FieldValue::Str(v) => self.set_string(path, v).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Startup bring-up
// ---------------------------------------------------------------------------

/// Block until the store answers a read of the record's
/// [`RecordPath::reachability_path`], retrying every `retry_delay`.
/// `NotFound` counts as reachable (a fresh record is empty).  Returns the
/// number of failed attempts.
pub async fn wait_until_reachable<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    retry_delay: Duration,
) -> u32 {
    let path = record.reachability_path();
    let mut failures = 0u32;
    loop {
        match store.get(&path).await {
            Ok(_) | Err(RemoteError::NotFound { .. }) => {
                info!(%path, failures, "remote store reachable");
                return failures;
            }
            Err(e) => {
                failures += 1;
                warn!(
                    %path,
                    attempt = failures,
                    retry_ms = retry_delay.as_millis() as u64,
                    "remote store not reachable: {e}"
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}
