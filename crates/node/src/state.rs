//! Latest sensor readings, shared between the sampling tasks (writers) and the
//! sync/snapshot tasks (readers).
//!
//! Each sensor group has exactly one writer.  All access happens between
//! cooperative scheduler steps, so the state is a plain owned struct with no
//! locking.

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::remote::FieldValue;
use crate::sensors::{ClimateReading, LightReading};

// ---------------------------------------------------------------------------
// Per-group sample
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleStatus {
    /// Never sampled (sensor absent or its task has not fired yet).
    #[default]
    Pending,
    /// Last read succeeded.
    Fresh,
    /// Last read failed; the value holds the sentinel.
    Failed,
}

/// Latest value of one sensor group plus how it was obtained.  On failure
/// the value falls back to `T::default()` (the zero sentinel) and the status
/// records that it is not a real reading.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sample<T> {
    value: T,
    status: SampleStatus,
    updated_at_ms: Option<u64>,
    consecutive_failures: u32,
    total_failures: u64,
}

impl<T: Default> Sample<T> {
    pub fn record(&mut self, value: T, at_ms: u64) {
        self.value = value;
        self.status = SampleStatus::Fresh;
        self.updated_at_ms = Some(at_ms);
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self, at_ms: u64) {
        self.value = T::default();
        self.status = SampleStatus::Failed;
        self.updated_at_ms = Some(at_ms);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn status(&self) -> SampleStatus {
        self.status
    }

    pub fn is_fresh(&self) -> bool {
        self.status == SampleStatus::Fresh
    }

    pub fn updated_at_ms(&self) -> Option<u64> {
        self.updated_at_ms
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }
}

// ---------------------------------------------------------------------------
// Sensor state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoilReading {
    /// Averaged raw ADC value.
    pub raw: i32,
    /// Calibrated moisture, always within 0..=100.
    pub percent: i32,
}

impl SoilReading {
    pub fn from_raw(raw: i32, calibration: &Calibration) -> Self {
        Self {
            raw,
            percent: calibration.percent(raw),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SensorState {
    pub soil: Sample<SoilReading>,
    pub light: Sample<LightReading>,
    pub climate: Sample<ClimateReading>,
}

impl SensorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn soil_moisture_raw(&self) -> i32 {
        self.soil.value().raw
    }

    pub fn soil_moisture_percent(&self) -> i32 {
        self.soil.value().percent
    }

    pub fn infrared(&self) -> i32 {
        self.light.value().infrared
    }

    pub fn visible(&self) -> i32 {
        self.light.value().visible
    }

    pub fn ultraviolet(&self) -> f64 {
        self.light.value().ultraviolet
    }

    pub fn humidity_percent(&self) -> f64 {
        self.climate.value().humidity_percent
    }

    pub fn temperature_celsius(&self) -> f64 {
        self.climate.value().temperature_celsius
    }

    /// Current values in the shape they are mirrored to the store.
    pub fn telemetry(&self) -> Telemetry {
        Telemetry {
            soil_moisture: self.soil_moisture_percent(),
            ir_light: self.infrared(),
            vis_light: self.visible(),
            uv_light: self.ultraviolet(),
            humidity: self.humidity_percent(),
            temperature: self.temperature_celsius(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

/// The six mirrored telemetry values.  Serialized as-is this is also one
/// history entry: `{soilMoisture, irLight, visLight, uvLight, humidity,
/// temperature}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub soil_moisture: i32,
    pub ir_light: i32,
    pub vis_light: i32,
    pub uv_light: f64,
    pub humidity: f64,
    pub temperature: f64,
}

pub type HistoryEntry = Telemetry;

impl Telemetry {
    /// Field names and typed values, in the order the sync task writes them.
    pub fn fields(&self) -> [(&'static str, FieldValue); 6] {
        [
            ("soilMoisture", FieldValue::Int(self.soil_moisture.into())),
            ("humidity", FieldValue::Float(self.humidity)),
            ("temperature", FieldValue::Float(self.temperature)),
            ("irLight", FieldValue::Int(self.ir_light.into())),
            ("visLight", FieldValue::Int(self.vis_light.into())),
            ("uvLight", FieldValue::Float(self.uv_light)),
        ]
    }
}

// ===========================================================================
// Tests
// ===========================================================================
