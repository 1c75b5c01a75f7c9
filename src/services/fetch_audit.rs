use std::sync::Arc;

use anyhow::Result;

use crate::db::Store;
use crate::models::FetchAudit;
use crate::ws::Hub;

/// Outcome of one fetch attempt by a known device
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub device_id: String,
    pub success: bool,
    pub reason: &'static str,
    pub remark: String,
}

impl FetchOutcome {
    pub fn success(device_id: &str, reason: &'static str, remark: impl Into<String>) -> Self {
        Self {
            device_id: device_id.to_string(),
            success: true,
            reason,
            remark: remark.into(),
        }
    }

    pub fn failure(device_id: &str, reason: &'static str, remark: impl Into<String>) -> Self {
        Self {
            device_id: device_id.to_string(),
            success: false,
            reason,
            remark: remark.into(),
        }
    }
}

/// Persist a fetch outcome, broadcast it and trim the log to `retention`
/// rows. Runs in the background so the device's response is not delayed.
pub fn record_fetch(store: Store, ws_hub: Arc<Hub>, retention: i64, outcome: FetchOutcome) {
    tokio::spawn(async move {
        if let Err(e) = write_audit(&store, &ws_hub, retention, &outcome).await {
            tracing::warn!(
                "Failed to record fetch audit for device {}: {}",
                outcome.device_id,
                e
            );
        }
    });
}

pub async fn write_audit(
    store: &Store,
    ws_hub: &Hub,
    retention: i64,
    outcome: &FetchOutcome,
) -> Result<FetchAudit> {
    let entry = store
        .create_fetch_audit(&outcome.device_id, outcome.success, outcome.reason, &outcome.remark)
        .await?;
    ws_hub.broadcast_device_fetch(&entry);

    let pruned = store.prune_fetch_audit(retention).await?;
    if pruned > 0 {
        tracing::debug!("Pruned {} fetch audit rows", pruned);
    }
    Ok(entry)
}
