//! Sampling tasks: read one sensor capability, store the result in
//! [`SensorState`].  A failed read stores the sentinel and is logged; it is
//! returned to the caller for bookkeeping but never treated as fatal.

use tracing::{debug, warn};

use crate::calibration::Calibration;
use crate::sensors::{ClimateReading, LightReading, SensorError, SensorSource};
use crate::state::{SensorState, SoilReading};

/// Default number of raw soil conversions averaged per sample.
pub const SOIL_WINDOW: usize = 20;

/// Average up to `window` raw soil reads.  Failed reads are left out of the
/// mean; if every read fails the last error is returned.
pub fn average_soil_raw<S: SensorSource>(source: &mut S, window: usize) -> Result<i32, SensorError> {
    let window = window.max(1);
    let mut sum: i64 = 0;
    let mut ok: i64 = 0;
    let mut last_err = SensorError::NoResponse;

    for _ in 0..window {
        match source.read_soil_moisture_raw() {
            Ok(raw) => {
                sum += i64::from(raw);
                ok += 1;
            }
            Err(e) => last_err = e,
        }
    }

    if ok == 0 {
        return Err(last_err);
    }
    if ok < window as i64 {
        debug!(window, ok, "soil window had failed conversions");
    }
    Ok((sum as f64 / ok as f64).round() as i32)
}

pub fn sample_soil<S: SensorSource>(
    source: &mut S,
    state: &mut SensorState,
    calibration: &Calibration,
    window: usize,
    now_ms: u64,
) -> Result<SoilReading, SensorError> {
    match average_soil_raw(source, window) {
        Ok(raw) => {
            let reading = SoilReading::from_raw(raw, calibration);
            debug!(raw, percent = reading.percent, "soil sampled");
            state.soil.record(reading, now_ms);
            Ok(reading)
        }
        Err(e) => {
            warn!(failures = state.soil.consecutive_failures() + 1, "soil read failed: {e}");
            state.soil.record_failure(now_ms);
            Err(e)
        }
    }
}

pub fn sample_light<S: SensorSource>(
    source: &mut S,
    state: &mut SensorState,
    now_ms: u64,
) -> Result<(), SensorError> {
    match source.read_light().and_then(LightReading::checked) {
        Ok(r) => {
            debug!(ir = r.infrared, vis = r.visible, uv = r.ultraviolet, "light sampled");
            state.light.record(r, now_ms);
            Ok(())
        }
        Err(e) => {
            warn!(failures = state.light.consecutive_failures() + 1, "light read failed: {e}");
            state.light.record_failure(now_ms);
            Err(e)
        }
    }
}

pub fn sample_climate<S: SensorSource>(
    source: &mut S,
    state: &mut SensorState,
    now_ms: u64,
) -> Result<(), SensorError> {
    match source.read_temp_humidity().and_then(ClimateReading::checked) {
        Ok(r) => {
            debug!(
                humidity = r.humidity_percent,
                temperature = r.temperature_celsius,
                "climate sampled"
            );
            state.climate.record(r, now_ms);
            Ok(())
        }
        Err(e) => {
            warn!(
                failures = state.climate.consecutive_failures() + 1,
                "temperature/humidity read failed: {e}"
            );
            state.climate.record_failure(now_ms);
            Err(e)
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
