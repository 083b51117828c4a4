//! Simulated sensor board for running the node without hardware.
//!
//! Models:
//! - Soil moisture as a random walk with mean reversion and a slow drying
//!   drift, plus per-conversion ADC noise and occasional spikes
//! - Light following a day/night cycle
//! - Temperature and humidity drifting with the same cycle
//! - Dropped reads (the flaky scenario loses some climate and light reads)

use std::fmt;

use crate::calibration::Calibration;
use crate::sensors::{ClimateReading, LightReading, SensorError, SensorSource};

/// Full scale of the simulated 10-bit soil ADC.
const ADC_MAX: f64 = 1023.0;

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Approximate a sample from N(0,1) using the Irwin-Hall method:
/// sum of 12 uniform [0,1) values minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

/// Sample from N(mean, sigma).
fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Simulation profiles, selected by `[simulation] scenario` or `SIM_SCENARIO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Starts mid-range and drifts toward dry.  Moderate noise.
    Drying,
    /// Hovers near the centre.  Low noise, rare spikes.
    Stable,
    /// Noisy soil readings and dropped light/climate reads.  Exercises the
    /// sentinel and failure paths end to end.
    Flaky,
    /// Starts near the wet end and dries very slowly.
    Wet,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stable" => Self::Stable,
            "flaky" => Self::Flaky,
            "wet" => Self::Wet,
            _ => Self::Drying, // default
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drying => write!(f, "drying"),
            Self::Stable => write!(f, "stable"),
            Self::Flaky => write!(f, "flaky"),
            Self::Wet => write!(f, "wet"),
        }
    }
}

struct Profile {
    drift: f64,
    walk_sigma: f64,
    mean_reversion: f64,
    noise_sigma: f64,
    spike_prob: f32,
    spike_sigma: f64,
    /// 0.0 = water calibration point, 1.0 = dry calibration point.
    start_frac: f64,
    /// Probability that a light or climate read fails.
    drop_prob: f32,
}

impl Profile {
    fn of(scenario: Scenario) -> Self {
        let (drift, walk_sigma, mean_reversion, noise_sigma, spike_prob, spike_sigma, start_frac, drop_prob) =
            match scenario {
                Scenario::Drying => (0.05, 0.6, 0.02, 3.0, 0.03, 40.0, 0.5, 0.0),
                Scenario::Stable => (0.0, 0.25, 0.05, 1.5, 0.005, 20.0, 0.5, 0.0),
                Scenario::Flaky => (0.03, 1.0, 0.02, 8.0, 0.10, 60.0, 0.5, 0.25),
                Scenario::Wet => (0.01, 0.3, 0.02, 2.0, 0.02, 30.0, 0.15, 0.0),
            };
        Self {
            drift,
            walk_sigma,
            mean_reversion,
            noise_sigma,
            spike_prob,
            spike_sigma,
            start_frac,
            drop_prob,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct SimulatedSensors {
    profile: Profile,
    raw_dry: f64,
    raw_wet: f64,
    center: f64,
    /// Current "true" soil value in ADC units.
    base: f64,
    /// Light/climate reads so far; drives the day/night phase.
    ticks: u64,
    /// Reads per simulated day.
    day_ticks: u64,
}

impl SimulatedSensors {
    /// `day_ticks` is the number of light/climate reads per simulated day;
    /// at the default 2 s interval, 300 gives a ten-minute day.
    pub fn new(scenario: Scenario, calibration: &Calibration, day_ticks: u64) -> Self {
        let profile = Profile::of(scenario);
        let raw_dry = f64::from(calibration.dry_value);
        let raw_wet = f64::from(calibration.water_value);
        let base = raw_wet + profile.start_frac * (raw_dry - raw_wet);
        Self {
            profile,
            raw_dry,
            raw_wet,
            center: (raw_dry + raw_wet) / 2.0,
            base,
            ticks: 0,
            day_ticks: day_ticks.max(1),
        }
    }

    /// 0.0 at midnight, 1.0 at noon.
    fn daylight(&self) -> f64 {
        let phase = 2.0 * std::f64::consts::PI * (self.ticks % self.day_ticks) as f64
            / self.day_ticks as f64;
        (0.5 - 0.5 * phase.cos()).clamp(0.0, 1.0)
    }

    fn dropped(&self) -> bool {
        fastrand::f32() < self.profile.drop_prob
    }
}

impl SensorSource for SimulatedSensors {
    fn read_soil_moisture_raw(&mut self) -> Result<i32, SensorError> {
        let p = &self.profile;

        // Evolve the base value: pull toward centre, random step, drying.
        let pull = p.mean_reversion * (self.center - self.base);
        let walk = gaussian(0.0, p.walk_sigma);
        let (lo, hi) = if self.raw_dry >= self.raw_wet {
            (self.raw_wet, self.raw_dry)
        } else {
            (self.raw_dry, self.raw_wet)
        };
        let toward_dry = (self.raw_dry - self.raw_wet).signum() * p.drift;
        self.base = (self.base + toward_dry + pull + walk).clamp(lo - 20.0, hi + 20.0);

        let noise = gaussian(0.0, p.noise_sigma);
        let spike = if fastrand::f32() < p.spike_prob {
            gaussian(0.0, p.spike_sigma)
        } else {
            0.0
        };

        Ok((self.base + noise + spike).round().clamp(0.0, ADC_MAX) as i32)
    }

    fn read_light(&mut self) -> Result<LightReading, SensorError> {
        self.ticks += 1;
        if self.dropped() {
            return Err(SensorError::NoResponse);
        }
        let day = self.daylight();
        Ok(LightReading {
            infrared: gaussian(250.0 + 1200.0 * day, 15.0).max(0.0).round() as i32,
            visible: gaussian(260.0 + 900.0 * day, 10.0).max(0.0).round() as i32,
            ultraviolet: (gaussian(0.02 + 4.0 * day, 0.05).max(0.0) * 100.0).round() / 100.0,
        })
    }

    fn read_temp_humidity(&mut self) -> Result<ClimateReading, SensorError> {
        if self.dropped() {
            return Err(SensorError::Corrupt("checksum mismatch".into()));
        }
        let day = self.daylight();
        let temperature = gaussian(17.0 + 8.0 * day, 0.2);
        let humidity = gaussian(65.0 - 20.0 * day, 0.8).clamp(0.0, 100.0);
        Ok(ClimateReading {
            humidity_percent: (humidity * 10.0).round() / 10.0,
            temperature_celsius: (temperature * 10.0).round() / 10.0,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
