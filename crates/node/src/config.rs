//! TOML config file loading and validation.

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::calibration::Calibration;
use crate::node::{Intervals, NodeSettings, SensorSet};
use crate::path::{check_segment, RecordPath};
use crate::sampling::SOIL_WINDOW;
use crate::sync::SyncStrategy;

/// Environment variable that overrides `[remote] auth_secret`.
pub const AUTH_SECRET_ENV: &str = "REMOTE_AUTH_SECRET";

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub record: RecordSection,
    pub calibration: CalibrationSection,
    #[serde(default)]
    pub sensors: SensorsSection,
    #[serde(default)]
    pub intervals: IntervalsSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub simulation: SimulationSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordSection {
    pub user_name: String,
    pub plant_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationSection {
    pub dry_value: i64,
    pub water_value: i64,
    #[serde(default = "default_soil_window")]
    pub soil_window: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsSection {
    #[serde(default = "yes")]
    pub soil: bool,
    #[serde(default = "yes")]
    pub light: bool,
    #[serde(default = "yes")]
    pub climate: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalsSection {
    #[serde(default = "default_sample_ms")]
    pub soil_ms: u64,
    #[serde(default = "default_sample_ms")]
    pub light_ms: u64,
    #[serde(default = "default_sample_ms")]
    pub climate_ms: u64,
    #[serde(default = "default_sync_ms")]
    pub sync_ms: u64,
    #[serde(default = "default_snapshot_ms")]
    pub snapshot_ms: u64,
    #[serde(default = "default_max_idle_ms")]
    pub max_idle_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub strategy: SyncStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process store; nothing leaves the device.
    #[default]
    Memory,
    /// Realtime-Database-style REST endpoint.
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSection {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub auth_secret: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_startup_retry_ms")]
    pub startup_retry_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSection {
    #[serde(default = "default_scenario")]
    pub scenario: String,
}

fn yes() -> bool {
    true
}

fn default_soil_window() -> usize {
    SOIL_WINDOW
}

fn default_sample_ms() -> u64 {
    Intervals::default().soil_ms
}

fn default_sync_ms() -> u64 {
    Intervals::default().sync_ms
}

fn default_snapshot_ms() -> u64 {
    Intervals::default().snapshot_ms
}

fn default_max_idle_ms() -> u64 {
    50
}

fn default_request_timeout_ms() -> u64 {
    3_000
}

fn default_startup_retry_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scenario() -> String {
    "drying".to_string()
}

impl Default for SensorsSection {
    fn default() -> Self {
        Self {
            soil: true,
            light: true,
            climate: true,
        }
    }
}

impl Default for IntervalsSection {
    fn default() -> Self {
        Self {
            soil_ms: default_sample_ms(),
            light_ms: default_sample_ms(),
            climate_ms: default_sample_ms(),
            sync_ms: default_sync_ms(),
            snapshot_ms: default_snapshot_ms(),
            max_idle_ms: default_max_idle_ms(),
        }
    }
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            endpoint: String::new(),
            auth_secret: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
            startup_retry_ms: default_startup_retry_ms(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            scenario: default_scenario(),
        }
    }
}

/// Largest raw value accepted for a calibration point (16-bit converters).
const RAW_MAX: i64 = 65_535;

/// Upper bound for `soil_window`.
const SOIL_WINDOW_MAX: usize = 256;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate the whole file. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_record(&mut errors);
        self.validate_calibration(&mut errors);
        self.validate_intervals(&mut errors);
        self.validate_remote(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    /// Settings that are legal but probably not what was intended.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let iv = &self.intervals;
        let shortest = [
            (self.sensors.soil, iv.soil_ms),
            (self.sensors.light, iv.light_ms),
            (self.sensors.climate, iv.climate_ms),
            (true, iv.sync_ms),
            (true, iv.snapshot_ms),
        ]
        .into_iter()
        .filter_map(|(enabled, ms)| enabled.then_some(ms))
        .min();

        if self.remote.backend == Backend::Rest {
            if let Some(shortest) = shortest {
                if self.remote.request_timeout_ms >= shortest {
                    warnings.push(format!(
                        "remote.request_timeout_ms ({}) is not shorter than the shortest task interval ({shortest} ms); \
                         a dead store will delay sampling",
                        self.remote.request_timeout_ms
                    ));
                }
            }
        }
        if iv.snapshot_ms < iv.sync_ms {
            warnings.push(format!(
                "intervals.snapshot_ms ({}) is shorter than intervals.sync_ms ({})",
                iv.snapshot_ms, iv.sync_ms
            ));
        }
        warnings
    }

    fn validate_record(&self, errors: &mut Vec<String>) {
        if let Err(e) = check_segment("user", &self.record.user_name) {
            errors.push(format!("record.user_name: {e}"));
        }
        if let Err(e) = check_segment("plant", &self.record.plant_id) {
            errors.push(format!("record.plant_id: {e}"));
        }
    }

    fn validate_calibration(&self, errors: &mut Vec<String>) {
        let c = &self.calibration;

        // ── Raw bounds ──────────────────────────────────────
        if !(0..=RAW_MAX).contains(&c.dry_value) {
            errors.push(format!(
                "calibration.dry_value {} out of range [0, {RAW_MAX}]",
                c.dry_value
            ));
        }
        if !(0..=RAW_MAX).contains(&c.water_value) {
            errors.push(format!(
                "calibration.water_value {} out of range [0, {RAW_MAX}]",
                c.water_value
            ));
        }
        if c.dry_value == c.water_value {
            errors.push(format!(
                "calibration.dry_value and water_value are both {}: calibration range is zero",
                c.dry_value
            ));
        }

        // ── Averaging window ────────────────────────────────
        if !(1..=SOIL_WINDOW_MAX).contains(&c.soil_window) {
            errors.push(format!(
                "calibration.soil_window {} out of range [1, {SOIL_WINDOW_MAX}]",
                c.soil_window
            ));
        }
    }

    fn validate_intervals(&self, errors: &mut Vec<String>) {
        let iv = &self.intervals;
        for (name, ms) in [
            ("soil_ms", iv.soil_ms),
            ("light_ms", iv.light_ms),
            ("climate_ms", iv.climate_ms),
            ("sync_ms", iv.sync_ms),
            ("snapshot_ms", iv.snapshot_ms),
            ("max_idle_ms", iv.max_idle_ms),
        ] {
            if ms == 0 {
                errors.push(format!("intervals.{name} must be positive"));
            }
        }
    }

    fn validate_remote(&self, errors: &mut Vec<String>) {
        let r = &self.remote;
        if r.backend == Backend::Rest {
            if r.endpoint.trim().is_empty() {
                errors.push("remote.endpoint is required for the rest backend".to_string());
            } else if !(r.endpoint.starts_with("http://") || r.endpoint.starts_with("https://")) {
                errors.push(format!(
                    "remote.endpoint {:?} must start with http:// or https://",
                    r.endpoint
                ));
            }
        }
        if r.request_timeout_ms == 0 {
            errors.push("remote.request_timeout_ms must be positive".to_string());
        }
        if r.startup_retry_ms == 0 {
            errors.push("remote.startup_retry_ms must be positive".to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Derived values
    // -----------------------------------------------------------------------

    pub fn record_path(&self) -> Result<RecordPath> {
        RecordPath::new(&self.record.user_name, &self.record.plant_id)
            .context("invalid record path")
    }

    pub fn calibration(&self) -> Result<Calibration> {
        let dry = i32::try_from(self.calibration.dry_value).context("dry_value out of range")?;
        let water =
            i32::try_from(self.calibration.water_value).context("water_value out of range")?;
        Ok(Calibration::new(dry, water))
    }

    pub fn node_settings(&self) -> Result<NodeSettings> {
        let mut settings = NodeSettings::new(self.record_path()?, self.calibration()?);
        settings.plant_id = self.record.plant_id.clone();
        settings.soil_window = self.calibration.soil_window;
        settings.sensors = SensorSet {
            soil: self.sensors.soil,
            light: self.sensors.light,
            climate: self.sensors.climate,
        };
        settings.intervals = Intervals {
            soil_ms: self.intervals.soil_ms,
            light_ms: self.intervals.light_ms,
            climate_ms: self.intervals.climate_ms,
            sync_ms: self.intervals.sync_ms,
            snapshot_ms: self.intervals.snapshot_ms,
        };
        settings.strategy = self.sync.strategy;
        settings.max_idle_ms = self.intervals.max_idle_ms;
        Ok(settings)
    }

    /// The store secret: `REMOTE_AUTH_SECRET` when set, else the file value.
    pub fn auth_secret(&self) -> Option<String> {
        self.remote
            .secret_with_override(std::env::var(AUTH_SECRET_ENV).ok())
    }
}

impl RemoteSection {
    fn secret_with_override(&self, env: Option<String>) -> Option<String> {
        env.filter(|s| !s.is_empty())
            .or_else(|| Some(self.auth_secret.clone()).filter(|s| !s.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.
pub fn load(path: &str) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("failed to read config: {path}"))?;
    let config: Config =
        toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[record]
user_name = "alice"
plant_id = "plant-1"

[calibration]
dry_value = 720
water_value = 500
"#;

    fn valid_config() -> Config {
        toml::from_str(MINIMAL).unwrap()
    }

    /// Assert validation fails and the error message contains `needle`.
    fn assert_validation_err(cfg: &Config, needle: &str) {
        let err = cfg.validate().unwrap_err();
        let msg = format!("{err:#}");
        assert!(
            msg.contains(needle),
            "expected error containing {needle:?}, got: {msg}"
        );
    }

    // -- Parsing ----------------------------------------------------------

    #[test]
    fn parse_minimal_config_applies_defaults() {
        let cfg = valid_config();
        assert_eq!(cfg.record.user_name, "alice");
        assert_eq!(cfg.calibration.soil_window, 20);
        assert!(cfg.sensors.soil && cfg.sensors.light && cfg.sensors.climate);
        assert_eq!(cfg.intervals.soil_ms, 2_000);
        assert_eq!(cfg.intervals.sync_ms, 5_000);
        assert_eq!(cfg.intervals.snapshot_ms, 300_000);
        assert_eq!(cfg.intervals.max_idle_ms, 50);
        assert_eq!(cfg.sync.strategy, SyncStrategy::Fields);
        assert_eq!(cfg.remote.backend, Backend::Memory);
        assert_eq!(cfg.remote.request_timeout_ms, 3_000);
        assert_eq!(cfg.remote.startup_retry_ms, 5_000);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.simulation.scenario, "drying");
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[record]
user_name = "bob"
plant_id = "basil"

[calibration]
dry_value = 26000
water_value = 12000
soil_window = 8

[sensors]
light = false

[intervals]
soil_ms = 1000
sync_ms = 10000
snapshot_ms = 60000

[sync]
strategy = "document"

[remote]
backend = "rest"
endpoint = "https://garden.example.com"
auth_secret = "s3cret"
request_timeout_ms = 800

[logging]
level = "debug"

[simulation]
scenario = "flaky"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        cfg.validate().unwrap();
        assert!(!cfg.sensors.light);
        assert!(cfg.sensors.climate);
        assert_eq!(cfg.intervals.climate_ms, 2_000);
        assert_eq!(cfg.sync.strategy, SyncStrategy::Document);
        assert_eq!(cfg.remote.backend, Backend::Rest);
        assert_eq!(cfg.simulation.scenario, "flaky");
    }

    #[test]
    fn missing_record_section_rejected() {
        let err = toml::from_str::<Config>("[calibration]\ndry_value = 1\nwater_value = 2\n");
        assert!(err.is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let toml_str = format!("{MINIMAL}\n[remote]\nbackend = \"ftp\"\n");
        assert!(toml::from_str::<Config>(&toml_str).is_err());
    }

    // -- Validation: valid configs pass -----------------------------------

    #[test]
    fn valid_config_passes() {
        valid_config().validate().unwrap();
    }

    #[test]
    fn inverted_calibration_passes() {
        let mut cfg = valid_config();
        cfg.calibration.dry_value = 300;
        cfg.calibration.water_value = 900;
        cfg.validate().unwrap();
    }

    // -- Record path ------------------------------------------------------

    #[test]
    fn empty_user_rejected() {
        let mut cfg = valid_config();
        cfg.record.user_name = " ".into();
        assert_validation_err(&cfg, "record.user_name: user segment is empty");
    }

    #[test]
    fn reserved_character_in_plant_rejected() {
        let mut cfg = valid_config();
        cfg.record.plant_id = "plant.1".into();
        assert_validation_err(&cfg, "record.plant_id");
    }

    // -- Calibration ------------------------------------------------------

    #[test]
    fn dry_equals_water_rejected() {
        let mut cfg = valid_config();
        cfg.calibration.water_value = 720;
        assert_validation_err(&cfg, "calibration range is zero");
    }

    #[test]
    fn negative_raw_rejected() {
        let mut cfg = valid_config();
        cfg.calibration.dry_value = -1;
        assert_validation_err(&cfg, "calibration.dry_value -1 out of range");
    }

    #[test]
    fn raw_above_16_bit_rejected() {
        let mut cfg = valid_config();
        cfg.calibration.water_value = 65_536;
        assert_validation_err(&cfg, "calibration.water_value 65536 out of range");
    }

    #[test]
    fn soil_window_bounds() {
        let mut cfg = valid_config();
        cfg.calibration.soil_window = 0;
        assert_validation_err(&cfg, "soil_window 0 out of range");
        cfg.calibration.soil_window = 257;
        assert_validation_err(&cfg, "soil_window 257 out of range");
        cfg.calibration.soil_window = 256;
        cfg.validate().unwrap();
    }

    // -- Intervals --------------------------------------------------------

    #[test]
    fn zero_interval_rejected() {
        let mut cfg = valid_config();
        cfg.intervals.sync_ms = 0;
        assert_validation_err(&cfg, "intervals.sync_ms must be positive");
    }

    #[test]
    fn zero_idle_rejected() {
        let mut cfg = valid_config();
        cfg.intervals.max_idle_ms = 0;
        assert_validation_err(&cfg, "intervals.max_idle_ms must be positive");
    }

    // -- Remote -----------------------------------------------------------

    #[test]
    fn rest_requires_endpoint() {
        let mut cfg = valid_config();
        cfg.remote.backend = Backend::Rest;
        assert_validation_err(&cfg, "remote.endpoint is required");
    }

    #[test]
    fn rest_requires_http_endpoint() {
        let mut cfg = valid_config();
        cfg.remote.backend = Backend::Rest;
        cfg.remote.endpoint = "garden.example.com".into();
        assert_validation_err(&cfg, "must start with http:// or https://");
    }

    #[test]
    fn memory_backend_ignores_endpoint() {
        let mut cfg = valid_config();
        cfg.remote.endpoint = "not a url".into();
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg = valid_config();
        cfg.remote.request_timeout_ms = 0;
        assert_validation_err(&cfg, "request_timeout_ms must be positive");
    }

    // -- Multiple errors reported at once ---------------------------------

    #[test]
    fn multiple_errors_collected() {
        let mut cfg = valid_config();
        cfg.record.plant_id = String::new();
        cfg.calibration.water_value = 720;
        cfg.intervals.soil_ms = 0;
        cfg.remote.backend = Backend::Rest;

        let msg = format!("{:#}", cfg.validate().unwrap_err());
        assert!(msg.contains("4 errors"), "wrong count in: {msg}");
        assert!(msg.contains("plant segment is empty"), "missing path error in: {msg}");
        assert!(msg.contains("calibration range is zero"), "missing calibration error in: {msg}");
        assert!(msg.contains("soil_ms"), "missing interval error in: {msg}");
        assert!(msg.contains("remote.endpoint"), "missing endpoint error in: {msg}");
    }

    // -- Warnings ---------------------------------------------------------

    #[test]
    fn slow_timeout_warns_for_rest() {
        let mut cfg = valid_config();
        cfg.remote.backend = Backend::Rest;
        cfg.remote.endpoint = "https://garden.example.com".into();
        assert_eq!(cfg.warnings().len(), 1);

        cfg.remote.request_timeout_ms = 1_500;
        assert!(cfg.warnings().is_empty());
    }

    #[test]
    fn disabled_sensor_interval_not_considered() {
        let mut cfg = valid_config();
        cfg.remote.backend = Backend::Rest;
        cfg.remote.endpoint = "https://garden.example.com".into();
        cfg.sensors = SensorsSection {
            soil: false,
            light: false,
            climate: false,
        };
        assert!(cfg.warnings().is_empty());
    }

    // -- Derived values ---------------------------------------------------

    #[test]
    fn node_settings_follow_config() {
        let mut cfg = valid_config();
        cfg.sensors.climate = false;
        cfg.intervals.sync_ms = 7_000;
        cfg.sync.strategy = SyncStrategy::Document;

        let s = cfg.node_settings().unwrap();
        assert_eq!(s.record.root(), "alice/plant-1");
        assert_eq!(s.plant_id, "plant-1");
        assert_eq!(s.calibration, Calibration::new(720, 500));
        assert!(!s.sensors.climate);
        assert_eq!(s.intervals.sync_ms, 7_000);
        assert_eq!(s.strategy, SyncStrategy::Document);
        assert_eq!(s.max_idle_ms, 50);
    }

    #[test]
    fn env_secret_overrides_file() {
        let mut r = RemoteSection::default();
        assert_eq!(r.secret_with_override(None), None);
        r.auth_secret = "from-file".into();
        assert_eq!(r.secret_with_override(None).as_deref(), Some("from-file"));
        assert_eq!(
            r.secret_with_override(Some("from-env".into())).as_deref(),
            Some("from-env")
        );
        assert_eq!(
            r.secret_with_override(Some(String::new())).as_deref(),
            Some("from-file")
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load("/nonexistent/plant-node.toml").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
