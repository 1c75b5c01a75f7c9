use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::*;
use crate::tree::{render_config_file, ConfigMap, FlattenMode};
use crate::utils::{generate_password, is_valid_mac, normalize_mac};
use crate::AppState;

use super::{created, ApiError};

/// Query for configuration previews
#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    #[serde(default)]
    pub include_unpublished: bool,
}

impl PreviewQuery {
    fn mode(&self) -> FlattenMode {
        if self.include_unpublished {
            FlattenMode::IncludeUnpublished
        } else {
            FlattenMode::PublishedOnly
        }
    }
}

/// List the devices of a site
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
) -> Result<Json<Vec<Device>>, ApiError> {
    if state.store.get_site(&site_id).await?.is_none() {
        return Err(ApiError::not_found("site"));
    }
    let devices = state.store.list_devices_by_site(&site_id).await?;
    Ok(Json(devices))
}

/// Get a single device by ID
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .store
        .get_device(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    Ok(Json(device))
}

/// Register a device under a site. The generated password is returned once.
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Path(site_id): Path<String>,
    Json(req): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<CreatedDevice>), ApiError> {
    if req.name.trim().is_empty() || req.model_id.trim().is_empty() {
        return Err(ApiError::bad_request("name and model_id are required"));
    }

    let mac = normalize_mac(&req.mac_address);
    if !is_valid_mac(&mac) {
        return Err(ApiError::bad_request("invalid MAC address"));
    }

    if state.store.get_site(&site_id).await?.is_none() {
        return Err(ApiError::not_found("site"));
    }
    if state.store.get_device_model(&req.model_id).await?.is_none() {
        return Err(ApiError::bad_request("unknown device model"));
    }

    // Check for duplicate
    if state.store.get_device_by_mac(&mac).await?.is_some() {
        return Err(ApiError::conflict("mac_address_in_use"));
    }

    let password = generate_password();
    let password_hash = bcrypt::hash(&password, state.config.bcrypt_cost)
        .map_err(|_| ApiError::internal("password hashing error"))?;

    let device = state
        .store
        .create_device(&site_id, &mac, &password_hash, &req)
        .await?;
    tracing::info!(
        "Created device '{}' ({}) with MAC {} in site {}",
        device.name,
        device.id,
        device.mac_address,
        device.site_id
    );
    Ok(created(CreatedDevice { device, password }))
}

/// Update an existing device
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeviceRequest>,
) -> Result<Json<Device>, ApiError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("name may not be empty"));
    }
    if let Some(site_id) = &req.site_id {
        if state.store.get_site(site_id).await?.is_none() {
            return Err(ApiError::bad_request("unknown site"));
        }
    }

    let device = state.store.update_device(&id, &req).await?;
    Ok(Json(device))
}

pub async fn enable_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let device = state.store.set_device_enabled(&id, true).await?;
    tracing::info!("Enabled device '{}' ({})", device.name, device.id);
    Ok(Json(device))
}

pub async fn disable_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let device = state.store.set_device_enabled(&id, false).await?;
    tracing::info!("Disabled device '{}' ({})", device.name, device.id);
    Ok(Json(device))
}

/// Delete a device
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_device(&id).await?;
    tracing::info!("Deleted device {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Merged configuration document a device would receive
pub async fn get_device_config(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<ConfigMap>, ApiError> {
    let config = preview(&state, &id, &query).await?;
    Ok(Json(config))
}

/// Same document in the phone's text format
pub async fn get_device_config_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let config = preview(&state, &id, &query).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_config_file(&config),
    ))
}

async fn preview(state: &AppState, id: &str, query: &PreviewQuery) -> Result<ConfigMap, ApiError> {
    let device = state
        .store
        .get_device(id)
        .await?
        .ok_or_else(|| ApiError::not_found("device"))?;
    let config = state
        .tree
        .build_device_configuration(&device.target(), query.mode())
        .await?;
    Ok(config)
}
