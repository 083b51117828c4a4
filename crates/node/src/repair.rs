//! One-shot schema repair: make sure every required field of the plant record
//! exists, writing a typed default for each one the store reports missing.

use tracing::{debug, info, warn};

use crate::path::RecordPath;
use crate::remote::{FieldValue, RemoteStore};

pub const DEFAULT_PLANT_NAME: &str = "Plant";
pub const DEFAULT_PLANT_TYPE: &str = "Plant";
pub const DEFAULT_PHOTO_URL: &str = "plant_default.png";

/// Required record fields and their defaults, in repair order.
pub fn required_fields(plant_id: &str) -> [(&'static str, FieldValue); 10] {
    [
        ("maxLight", FieldValue::Int(10_000)),
        ("minLight", FieldValue::Int(0)),
        ("maxTemp", FieldValue::Int(60)),
        ("minTemp", FieldValue::Int(-10)),
        ("maxSoilMoisture", FieldValue::Int(100)),
        ("minSoilMoisture", FieldValue::Int(0)),
        ("photoUrl", FieldValue::Str(DEFAULT_PHOTO_URL.to_string())),
        ("plantID", FieldValue::Str(plant_id.to_string())),
        ("plantName", FieldValue::Str(DEFAULT_PLANT_NAME.to_string())),
        ("plantType", FieldValue::Str(DEFAULT_PLANT_TYPE.to_string())),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    /// Fields that already existed.
    pub present: Vec<&'static str>,
    /// Defaults the store confirmed, with the value written.
    pub written: Vec<(&'static str, FieldValue)>,
    /// Fields whose get (other than not-found) or set failed.
    pub failed: Vec<&'static str>,
}

impl RepairReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Check each required field of `record` and fill in the missing ones.
///
/// Best-effort per field: a failed read other than not-found leaves that
/// field alone, and a failed write does not stop the remaining fields.
pub async fn repair_record<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    plant_id: &str,
) -> RepairReport {
    let mut report = RepairReport::default();

    for (name, default) in required_fields(plant_id) {
        let path = record.field(name);
        match store.get(&path).await {
            Ok(_) => {
                debug!(%path, "field present");
                report.present.push(name);
            }
            Err(e) if e.is_not_found() => match store.set_value(&path, &default).await {
                Ok(()) => {
                    info!(%path, value = %default, "wrote default");
                    report.written.push((name, default));
                }
                Err(e) => {
                    warn!(%path, "default write failed: {e}");
                    report.failed.push(name);
                }
            },
            Err(e) => {
                warn!(%path, "field check failed, leaving it untouched: {e}");
                report.failed.push(name);
            }
        }
    }

    info!(
        record = %record,
        present = report.present.len(),
        written = report.written.len(),
        failed = report.failed.len(),
        "schema repair finished"
    );
    report
}

// ===========================================================================
// Tests
// ===========================================================================
