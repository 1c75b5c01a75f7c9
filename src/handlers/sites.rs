use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// List all sites
pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Site>>, ApiError> {
    let sites = state.store.list_sites().await?;
    Ok(Json(sites))
}

/// Get a single site by ID
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    let site = state
        .store
        .get_site(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("site"))?;
    Ok(Json(site))
}

/// Create a new site (disabled until enabled explicitly)
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let site = state.store.create_site(&req).await?;
    tracing::info!("Created site '{}' ({})", site.name, site.id);
    Ok(created(site))
}

pub async fn update_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSiteRequest>,
) -> Result<Json<Site>, ApiError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("name may not be empty"));
    }
    let site = state.store.update_site(&id, &req).await?;
    Ok(Json(site))
}

pub async fn enable_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    let site = state.store.set_site_enabled(&id, true).await?;
    tracing::info!("Enabled site '{}' ({})", site.name, site.id);
    Ok(Json(site))
}

pub async fn disable_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Site>, ApiError> {
    let site = state.store.set_site_enabled(&id, false).await?;
    tracing::info!("Disabled site '{}' ({})", site.name, site.id);
    Ok(Json(site))
}

/// Delete a site that no longer has devices or virtual devices
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let site = state
        .store
        .get_site(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("site"))?;
    if site.device_count.unwrap_or(0) > 0 {
        return Err(ApiError::conflict("site still has devices"));
    }
    if state.store.count_virtual_devices_by_site(&id).await? > 0 {
        return Err(ApiError::conflict("site still has virtual devices"));
    }

    state.store.delete_site(&id).await?;
    tracing::info!("Deleted site '{}' ({})", site.name, site.id);
    Ok(StatusCode::NO_CONTENT)
}
