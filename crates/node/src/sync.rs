//! Mirror the current telemetry into the plant record.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::path::RecordPath;
use crate::remote::{FieldValue, RemoteError, RemoteStore};
use crate::state::Telemetry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// One typed set per field; each field succeeds or fails on its own.
    #[default]
    Fields,
    /// One merge-update carrying all fields.
    Document,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Confirmed writes as (full path, value).
    pub written: Vec<(String, FieldValue)>,
    pub failed: Vec<(String, RemoteError)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub async fn sync_telemetry<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    telemetry: &Telemetry,
    strategy: SyncStrategy,
) -> SyncReport {
    match strategy {
        SyncStrategy::Fields => sync_fields(store, record, telemetry).await,
        SyncStrategy::Document => sync_document(store, record, telemetry).await,
    }
}

async fn sync_fields<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    telemetry: &Telemetry,
) -> SyncReport {
    let mut report = SyncReport::default();
    for (name, value) in telemetry.fields() {
        let path = record.field(name);
        match store.set_value(&path, &value).await {
            Ok(()) => {
                info!(%path, %value, "synced");
                report.written.push((path, value));
            }
            Err(e) => {
                warn!(%path, "sync write failed: {e}");
                report.failed.push((path, e));
            }
        }
    }
    report
}

async fn sync_document<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    telemetry: &Telemetry,
) -> SyncReport {
    let mut report = SyncReport::default();
    let mut body = Map::new();
    let mut included = Vec::new();
    // A field with no JSON form fails on its own, as it would in `Fields`.
    for (name, value) in telemetry.fields() {
        let path = record.field(name);
        match value.check_finite("update", &path) {
            Ok(()) => {
                body.insert(name.to_string(), value.to_json());
                included.push((path, value));
            }
            Err(e) => {
                warn!(%path, "sync value dropped from update: {e}");
                report.failed.push((path, e));
            }
        }
    }

    let root = record.root();
    match store.update_json(&root, &Value::Object(body)).await {
        Ok(()) => {
            for (path, value) in included {
                info!(%path, %value, "synced");
                report.written.push((path, value));
            }
        }
        Err(e) => {
            warn!(path = %root, "sync update failed: {e}");
            for (path, _) in included {
                report.failed.push((path, e.clone()));
            }
        }
    }
    report
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::testing::{Call, FlakyStore};

    fn record() -> RecordPath {
        RecordPath::new("alice", "plant-1").unwrap()
    }

    fn telemetry() -> Telemetry {
        Telemetry {
            soil_moisture: 55,
            ir_light: 300,
            vis_light: 260,
            uv_light: 0.02,
            humidity: 48.5,
            temperature: 22.0,
        }
    }

    #[tokio::test]
    async fn fields_are_written_in_order_with_types() {
        let store = FlakyStore::new();
        let report = sync_telemetry(&store, &record(), &telemetry(), SyncStrategy::Fields).await;

        assert!(report.is_complete());
        assert_eq!(
            store.set_paths(),
            [
                "alice/plant-1/soilMoisture",
                "alice/plant-1/humidity",
                "alice/plant-1/temperature",
                "alice/plant-1/irLight",
                "alice/plant-1/visLight",
                "alice/plant-1/uvLight",
            ]
        );
        assert_eq!(
            store.inner.peek("alice/plant-1"),
            Some(json!({
                "soilMoisture": 55,
                "humidity": 48.5,
                "temperature": 22.0,
                "irLight": 300,
                "visLight": 260,
                "uvLight": 0.02,
            }))
        );
        assert_eq!(
            report.written[0],
            ("alice/plant-1/soilMoisture".to_string(), FieldValue::Int(55))
        );
    }

    #[tokio::test]
    async fn failing_field_does_not_block_the_others() {
        let store = FlakyStore::new();
        store.fail_writes_to("alice/plant-1/uvLight");

        let report = sync_telemetry(&store, &record(), &telemetry(), SyncStrategy::Fields).await;

        assert_eq!(report.written.len(), 5);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "alice/plant-1/uvLight");
        assert!(store.inner.peek("alice/plant-1/uvLight").is_none());
        assert_eq!(store.inner.peek("alice/plant-1/visLight"), Some(json!(260)));
    }

    #[tokio::test]
    async fn first_field_failing_still_writes_the_rest() {
        let store = FlakyStore::new();
        store.fail_writes_to("alice/plant-1/soilMoisture");

        let report = sync_telemetry(&store, &record(), &telemetry(), SyncStrategy::Fields).await;

        assert_eq!(report.written.len(), 5);
        assert_eq!(store.set_paths().len(), 6);
    }

    #[tokio::test]
    async fn sentinel_values_are_still_written() {
        let store = FlakyStore::new();
        sync_telemetry(&store, &record(), &Telemetry::default(), SyncStrategy::Fields).await;
        assert_eq!(store.sets_to("alice/plant-1/temperature"), vec![json!(0.0)]);
        assert_eq!(store.sets_to("alice/plant-1/humidity"), vec![json!(0.0)]);
    }

    #[tokio::test]
    async fn document_strategy_uses_one_update() {
        let store = FlakyStore::new();
        store
            .inner
            .set_string("alice/plant-1/plantName", "Fern")
            .await
            .unwrap();

        let report =
            sync_telemetry(&store, &record(), &telemetry(), SyncStrategy::Document).await;

        assert_eq!(report.written.len(), 6);
        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Update(p, _) if p == "alice/plant-1"));
        // Merge keeps unrelated members.
        assert_eq!(
            store.inner.peek("alice/plant-1/plantName"),
            Some(json!("Fern"))
        );
        assert_eq!(store.inner.peek("alice/plant-1/humidity"), Some(json!(48.5)));
    }

    #[tokio::test]
    async fn document_failure_fails_every_field() {
        let store = FlakyStore::new();
        store.fail_updates(true);

        let report =
            sync_telemetry(&store, &record(), &telemetry(), SyncStrategy::Document).await;

        assert!(report.written.is_empty());
        assert_eq!(report.failed.len(), 6);
        assert!(store.inner.peek("alice/plant-1").is_none());
    }

    #[tokio::test]
    async fn non_finite_value_fails_alone_under_both_strategies() {
        let bad = Telemetry {
            temperature: f64::NAN,
            ..telemetry()
        };
        let temp_path = "alice/plant-1/temperature".to_string();

        let fields_store = FlakyStore::new();
        let by_field = sync_telemetry(&fields_store, &record(), &bad, SyncStrategy::Fields).await;

        let doc_store = FlakyStore::new();
        doc_store
            .inner
            .set_float("alice/plant-1/temperature", 19.0)
            .await
            .unwrap();
        let by_doc = sync_telemetry(&doc_store, &record(), &bad, SyncStrategy::Document).await;

        for report in [&by_field, &by_doc] {
            assert_eq!(report.written.len(), 5);
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.failed[0].0, temp_path);
            assert!(matches!(report.failed[0].1, RemoteError::Rejected { .. }));
        }

        // The merge carries the other five members and never a null.
        let calls = doc_store.calls();
        assert_eq!(calls.len(), 1);
        let Call::Update(_, body) = &calls[0] else {
            panic!("expected an update, got {:?}", calls[0]);
        };
        assert!(body.get("temperature").is_none());
        assert_eq!(body.as_object().unwrap().len(), 5);
        assert_eq!(doc_store.inner.peek(&temp_path), Some(json!(19.0)));
        assert_eq!(fields_store.inner.peek(&temp_path), None);
    }

    #[test]
    fn strategy_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct W {
            s: SyncStrategy,
        }
        let w: W = toml::from_str("s = \"document\"").unwrap();
        assert_eq!(w.s, SyncStrategy::Document);
        assert!(toml::from_str::<W>("s = \"Fields\"").is_err());
    }
}
