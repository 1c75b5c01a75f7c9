use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

async fn require_site(state: &AppState, site_id: &str) -> Result<Site, ApiError> {
    state
        .store
        .get_site(site_id)
        .await?
        .ok_or_else(|| ApiError::not_found("site"))
}

/// List the virtual devices of a site
pub async fn list_virtual_devices(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<Json<Vec<VirtualDevice>>, ApiError> {
    require_site(&state, &site_id).await?;
    let vdevs = state.store.list_virtual_devices(&site_id).await?;
    Ok(Json(vdevs))
}

pub async fn get_virtual_device(
    State(state): State<Arc<AppState>>,
    Path((site_id, id)): Path<(String, String)>,
) -> Result<Json<VirtualDevice>, ApiError> {
    let vdev = state
        .store
        .get_virtual_device(&site_id, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("virtual device"))?;
    Ok(Json(vdev))
}

/// Create a virtual device under a site. Starts disabled.
pub async fn create_virtual_device(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Json(req): Json<CreateVirtualDeviceRequest>,
) -> Result<(StatusCode, Json<VirtualDevice>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if req.model_id.trim().is_empty() {
        return Err(ApiError::bad_request("model_id is required"));
    }

    let site = require_site(&state, &site_id).await?;
    if state.store.get_device_model(&req.model_id).await?.is_none() {
        return Err(ApiError::bad_request("unknown device model"));
    }

    let vdev = state.store.create_virtual_device(&site.id, &req).await?;
    tracing::info!(
        "Created virtual device '{}' ({}) in site '{}'",
        vdev.name,
        vdev.id,
        site.name
    );
    Ok(created(vdev))
}

pub async fn update_virtual_device(
    State(state): State<Arc<AppState>>,
    Path((site_id, id)): Path<(String, String)>,
    Json(req): Json<UpdateVirtualDeviceRequest>,
) -> Result<Json<VirtualDevice>, ApiError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("name may not be empty"));
    }
    let vdev = state.store.update_virtual_device(&site_id, &id, &req).await?;
    Ok(Json(vdev))
}

pub async fn delete_virtual_device(
    State(state): State<Arc<AppState>>,
    Path((site_id, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_virtual_device(&site_id, &id).await?;
    tracing::info!("Deleted virtual device {}", id);
    Ok(StatusCode::NO_CONTENT)
}
