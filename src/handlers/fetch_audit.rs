use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::models::FetchAudit;
use crate::AppState;

use super::{ApiError, LimitQuery};

/// Most recent fetch attempts, newest first
pub async fn list_fetch_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<FetchAudit>>, ApiError> {
    let entries = state.store.list_fetch_audit(query.sanitize()).await?;
    Ok(Json(entries))
}

/// Fetch attempts of a single device
pub async fn list_device_fetch_audit(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<FetchAudit>>, ApiError> {
    let entries = state
        .store
        .list_fetch_audit_by_device(&device_id, query.sanitize())
        .await?;
    Ok(Json(entries))
}
