/// Two-point soil moisture calibration: the raw ADC value read in dry air
/// (0%) and fully submerged in water (100%).  Either may be the larger one;
/// capacitive probes usually read lower when wet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub dry_value: i32,
    pub water_value: i32,
}

impl Calibration {
    pub fn new(dry_value: i32, water_value: i32) -> Self {
        Self {
            dry_value,
            water_value,
        }
    }

    pub fn percent(&self, raw: i32) -> i32 {
        moisture_percent(raw, self.dry_value, self.water_value)
    }
}

/// Map a raw reading onto 0..=100 % moisture, rounding to the nearest whole
/// percent.  Readings beyond either calibration point clamp to the end of the
/// range.
pub fn moisture_percent(raw: i32, dry_value: i32, water_value: i32) -> i32 {
    let span = water_value as f64 - dry_value as f64;
    if span == 0.0 {
        return 0; // degenerate calibration
    }
    let pct = (raw as f64 - dry_value as f64) * 100.0 / span;
    pct.round().clamp(0.0, 100.0) as i32
}
