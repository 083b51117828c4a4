//! Sensor capability boundary.  Hardware drivers and the simulator implement
//! [`SensorSource`]; the sampling tasks only ever see this trait.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// The sensor did not answer (not wired, bus error, timeout).
    #[error("sensor did not respond")]
    NoResponse,
    /// The sensor answered with data that failed its checksum or framing.
    #[error("corrupt reading: {0}")]
    Corrupt(String),
    /// The value is physically implausible for this sensor.
    #[error("reading out of range: {0}")]
    OutOfRange(String),
}

/// One light-sensor sample (infrared and visible counts, UV index).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightReading {
    pub infrared: i32,
    pub visible: i32,
    pub ultraviolet: f64,
}

impl LightReading {
    /// Counts are never negative and the UV index is a finite, non-negative
    /// number.
    pub fn checked(self) -> Result<Self, SensorError> {
        if self.infrared < 0 || self.visible < 0 {
            return Err(SensorError::OutOfRange(format!(
                "negative light count (ir {}, vis {})",
                self.infrared, self.visible
            )));
        }
        if !self.ultraviolet.is_finite() || self.ultraviolet < 0.0 {
            return Err(SensorError::OutOfRange(format!("uv index {}", self.ultraviolet)));
        }
        Ok(self)
    }
}

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateReading {
    pub humidity_percent: f64,
    pub temperature_celsius: f64,
}

/// Operating range of the usual hobby temperature/humidity parts.
pub const TEMPERATURE_RANGE_C: std::ops::RangeInclusive<f64> = -40.0..=80.0;

impl ClimateReading {
    /// Rejects NaN, humidity outside 0..=100 and temperatures outside
    /// [`TEMPERATURE_RANGE_C`].
    pub fn checked(self) -> Result<Self, SensorError> {
        if !(0.0..=100.0).contains(&self.humidity_percent) {
            return Err(SensorError::OutOfRange(format!(
                "humidity {}%",
                self.humidity_percent
            )));
        }
        if !TEMPERATURE_RANGE_C.contains(&self.temperature_celsius) {
            return Err(SensorError::OutOfRange(format!(
                "temperature {} C",
                self.temperature_celsius
            )));
        }
        Ok(self)
    }
}

pub trait SensorSource {
    /// One raw analog soil moisture conversion.
    fn read_soil_moisture_raw(&mut self) -> Result<i32, SensorError>;

    fn read_light(&mut self) -> Result<LightReading, SensorError>;

    fn read_temp_humidity(&mut self) -> Result<ClimateReading, SensorError>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    fn read_soil_moisture_raw(&mut self) -> Result<i32, SensorError> {
        (**self).read_soil_moisture_raw()
    }

    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        (**self).read_light()
    }

    fn read_temp_humidity(&mut self) -> Result<ClimateReading, SensorError> {
        (**self).read_temp_humidity()
    }
}
