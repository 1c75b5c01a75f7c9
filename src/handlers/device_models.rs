use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::utils::new_id;
use crate::AppState;

use super::{created, ApiError};

/// List all device models
pub async fn list_device_models(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeviceModel>>, ApiError> {
    let models = state.store.list_device_models().await?;
    Ok(Json(models))
}

/// Get a single device model by ID
pub async fn get_device_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceModel>, ApiError> {
    let model = state
        .store
        .get_device_model(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("device model"))?;
    Ok(Json(model))
}

/// Create a new device model
pub async fn create_device_model(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDeviceModelRequest>,
) -> Result<(StatusCode, Json<DeviceModel>), ApiError> {
    if req.name.trim().is_empty() || req.default_config_name.trim().is_empty() {
        return Err(ApiError::bad_request("name and default_config_name are required"));
    }

    let id = match req.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => new_id(),
    };

    // Check for duplicate
    if state.store.get_device_model(&id).await?.is_some() {
        return Err(ApiError::conflict("device model with this ID already exists"));
    }

    let model = state.store.create_device_model(&id, &req).await?;
    tracing::info!("Created device model '{}' ({})", model.name, model.id);
    Ok(created(model))
}

/// Update an existing device model
pub async fn update_device_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeviceModelRequest>,
) -> Result<Json<DeviceModel>, ApiError> {
    let model = state.store.update_device_model(&id, &req).await?;
    Ok(Json(model))
}

/// Delete a device model that no device uses
pub async fn delete_device_model(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let model = state
        .store
        .get_device_model(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("device model"))?;
    if model.device_count.unwrap_or(0) > 0 {
        return Err(ApiError::conflict("device model is still in use"));
    }
    if state.store.count_virtual_devices_by_model(&id).await? > 0 {
        return Err(ApiError::conflict("device model is still in use by virtual devices"));
    }

    state.store.delete_device_model(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
