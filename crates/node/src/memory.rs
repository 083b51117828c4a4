//! In-process document store.  Backs the `memory` remote backend (local runs
//! without a network) and the tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use crate::path::segments;
use crate::remote::{check_finite, RemoteError, RemoteStore};

#[derive(Debug)]
struct Inner {
    root: Value,
    next_push: u64,
}

/// JSON tree addressed by slash paths.  Clones share the same tree.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                root: Value::Object(Map::new()),
                next_push: 0,
            })),
        }
    }

    /// Copy of the whole tree.
    pub fn dump(&self) -> Value {
        self.lock().root.clone()
    }

    /// Value at `path`, or `None` when absent.
    pub fn peek(&self, path: &str) -> Option<Value> {
        lookup(&self.lock().root, path).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put(&self, path: &str, value: Value) {
        let mut inner = self.lock();
        *slot_mut(&mut inner.root, path) = value;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.peek(path).ok_or_else(|| RemoteError::NotFound {
            path: path.to_string(),
        })
    }

    async fn set_int(&self, path: &str, value: i64) -> Result<(), RemoteError> {
        self.put(path, Value::from(value));
        Ok(())
    }

    async fn set_float(&self, path: &str, value: f64) -> Result<(), RemoteError> {
        check_finite("set", path, value)?;
        self.put(path, Value::from(value));
        Ok(())
    }

    async fn set_string(&self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.put(path, Value::from(value));
        Ok(())
    }

    async fn push_json(&self, path: &str, json: &Value) -> Result<String, RemoteError> {
        let mut inner = self.lock();
        inner.next_push += 1;
        // Zero-padded so lexical key order equals insertion order.
        let id = format!("-m{:010}", inner.next_push);
        let collection = ensure_object(slot_mut(&mut inner.root, path));
        collection.insert(id.clone(), json.clone());
        Ok(id)
    }

    async fn update_json(&self, path: &str, json: &Value) -> Result<(), RemoteError> {
        let Some(members) = json.as_object() else {
            return Err(RemoteError::Rejected {
                op: "update",
                path: path.to_string(),
                reason: "update body must be a JSON object".to_string(),
            });
        };
        let mut inner = self.lock();
        let target = ensure_object(slot_mut(&mut inner.root, path));
        for (k, v) in members {
            target.insert(k.clone(), v.clone());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for seg in segments(path) {
        node = node.get(seg)?;
    }
    (!node.is_null()).then_some(node)
}

/// Walk to `path`, creating objects along the way (replacing any scalar that
/// sits where an object is needed).
fn slot_mut<'a>(root: &'a mut Value, path: &str) -> &'a mut Value {
    let mut node = root;
    for seg in segments(path) {
        node = ensure_object(node)
            .entry(seg.to_string())
            .or_insert(Value::Null);
    }
    node
}

fn ensure_object(v: &mut Value) -> &mut Map<String, Value> {
    if !v.is_object() {
        *v = Value::Object(Map::new());
    }
    match v {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
