use tracing::{error, info};

use crate::path::RecordPath;
use crate::remote::{RemoteError, RemoteStore};
use crate::state::HistoryEntry;

/// Append `entry` to the record's history collection and return the id the
/// store generated for it.
pub async fn push_snapshot<R: RemoteStore>(
    store: &R,
    record: &RecordPath,
    entry: &HistoryEntry,
) -> Result<String, RemoteError> {
    let path = record.history();
    let json = serde_json::to_value(entry).map_err(|e| RemoteError::Malformed(e.to_string()))?;

    match store.push_json(&path, &json).await {
        Ok(id) => {
            info!(%path, %id, "history snapshot appended");
            Ok(id)
        }
        Err(e) => {
            error!(%path, "history snapshot failed: {e}");
            Err(e)
        }
    }
}
