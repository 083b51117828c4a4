//! Test doubles: scripted sensors and a fault-injecting store.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::memory::MemoryStore;
use crate::remote::{RemoteError, RemoteStore};
use crate::sensors::{ClimateReading, LightReading, SensorError, SensorSource};

// ---------------------------------------------------------------------------
// Scripted sensors
// ---------------------------------------------------------------------------

/// Returns queued results first, then a steady fallback value.
pub struct ScriptedSensors {
    pub soil_fallback: Result<i32, SensorError>,
    pub light_fallback: Result<LightReading, SensorError>,
    pub climate_fallback: Result<ClimateReading, SensorError>,
    soil: VecDeque<Result<i32, SensorError>>,
    climate: VecDeque<Result<ClimateReading, SensorError>>,
    pub soil_reads: usize,
    pub climate_reads: usize,
}

impl ScriptedSensors {
    pub fn new() -> Self {
        Self {
            soil_fallback: Ok(600),
            light_fallback: Ok(LightReading {
                infrared: 250,
                visible: 260,
                ultraviolet: 0.03,
            }),
            climate_fallback: Ok(ClimateReading {
                humidity_percent: 45.0,
                temperature_celsius: 21.0,
            }),
            soil: VecDeque::new(),
            climate: VecDeque::new(),
            soil_reads: 0,
            climate_reads: 0,
        }
    }

    pub fn queue_soil(mut self, reads: impl IntoIterator<Item = Result<i32, SensorError>>) -> Self {
        self.soil.extend(reads);
        self
    }

    pub fn queue_climate(
        mut self,
        reads: impl IntoIterator<Item = Result<ClimateReading, SensorError>>,
    ) -> Self {
        self.climate.extend(reads);
        self
    }
}

impl SensorSource for ScriptedSensors {
    fn read_soil_moisture_raw(&mut self) -> Result<i32, SensorError> {
        self.soil_reads += 1;
        self.soil
            .pop_front()
            .unwrap_or_else(|| self.soil_fallback.clone())
    }

    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        self.light_fallback.clone()
    }

    fn read_temp_humidity(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate_reads += 1;
        self.climate
            .pop_front()
            .unwrap_or_else(|| self.climate_fallback.clone())
    }
}

// ---------------------------------------------------------------------------
// Fault-injecting store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Set(String, Value),
    Push(String, Value),
    Update(String, Value),
}

#[derive(Default)]
struct Faults {
    write_paths: HashSet<String>,
    get_paths: HashSet<String>,
    gets_remaining: u32,
    pushes: bool,
    updates: bool,
}

/// [`MemoryStore`] plus a call log and per-path failure switches.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    calls: Arc<Mutex<Vec<Call>>>,
    faults: Arc<Mutex<Faults>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    pub fn fail_writes_to(&self, path: &str) {
        self.faults.lock().unwrap().write_paths.insert(path.to_string());
    }

    pub fn fail_gets_for(&self, path: &str) {
        self.faults.lock().unwrap().get_paths.insert(path.to_string());
    }

    /// The next `n` gets fail with a transport error.
    pub fn fail_gets_remaining(&self, n: u32) {
        self.faults.lock().unwrap().gets_remaining = n;
    }

    pub fn fail_pushes(&self, on: bool) {
        self.faults.lock().unwrap().pushes = on;
    }

    pub fn fail_updates(&self, on: bool) {
        self.faults.lock().unwrap().updates = on;
    }

    pub fn heal(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Paths of every set attempted (failed ones included), in order.
    pub fn set_paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Set(p, _) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Every value a set attempted to write to `path`, in order.
    pub fn sets_to(&self, path: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Set(p, v) if p == path => Some(v),
                _ => None,
            })
            .collect()
    }

    pub fn push_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Push(..)))
            .count()
    }

    fn log(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_write(&self, path: &str) -> Result<(), RemoteError> {
        if self.faults.lock().unwrap().write_paths.contains(path) {
            return Err(RemoteError::Transport(format!("injected write failure at {path}")));
        }
        Ok(())
    }
}

impl RemoteStore for FlakyStore {
    async fn get(&self, path: &str) -> Result<Value, RemoteError> {
        self.log(Call::Get(path.to_string()));
        {
            let mut f = self.faults.lock().unwrap();
            if f.gets_remaining > 0 {
                f.gets_remaining -= 1;
                return Err(RemoteError::Transport("injected outage".into()));
            }
            if f.get_paths.contains(path) {
                return Err(RemoteError::Transport(format!("injected read failure at {path}")));
            }
        }
        self.inner.get(path).await
    }

    async fn set_int(&self, path: &str, value: i64) -> Result<(), RemoteError> {
        self.log(Call::Set(path.to_string(), Value::from(value)));
        self.check_write(path)?;
        self.inner.set_int(path, value).await
    }

    async fn set_float(&self, path: &str, value: f64) -> Result<(), RemoteError> {
        self.log(Call::Set(path.to_string(), Value::from(value)));
        self.check_write(path)?;
        self.inner.set_float(path, value).await
    }

    async fn set_string(&self, path: &str, value: &str) -> Result<(), RemoteError> {
        self.log(Call::Set(path.to_string(), Value::from(value)));
        self.check_write(path)?;
        self.inner.set_string(path, value).await
    }

    async fn push_json(&self, path: &str, json: &Value) -> Result<String, RemoteError> {
        self.log(Call::Push(path.to_string(), json.clone()));
        if self.faults.lock().unwrap().pushes {
            return Err(RemoteError::Transport("injected push failure".into()));
        }
        self.inner.push_json(path, json).await
    }

    async fn update_json(&self, path: &str, json: &Value) -> Result<(), RemoteError> {
        self.log(Call::Update(path.to_string(), json.clone()));
        if self.faults.lock().unwrap().updates {
            return Err(RemoteError::Transport("injected update failure".into()));
        }
        self.inner.update_json(path, json).await
    }
}
