//! Provisioning endpoints the phones call.
//!
//! Every attempt by a known device is audited, whatever its outcome.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{fetch_reason, Device, DeviceModel, Site};
use crate::services::fetch_audit::{record_fetch, FetchOutcome};
use crate::tree::{render_config_file, ConfigMap, FlattenMode, TreeError};
use crate::utils::{is_valid_mac, mac_from_config_filename, normalize_mac};
use crate::AppState;

use super::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct FetchCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Everything a phone receives on a successful fetch
#[derive(Debug, Serialize)]
pub struct FetchResponse {
    pub site: Site,
    pub device: Device,
    pub model: DeviceModel,
    pub config: ConfigMap,
}

/// Fetch the merged configuration as JSON
pub async fn fetch_device(
    State(state): State<Arc<AppState>>,
    Path(mac): Path<String>,
    Query(creds): Query<FetchCredentials>,
) -> Result<Json<FetchResponse>, ApiError> {
    let mac = normalize_mac(&mac);
    if !is_valid_mac(&mac) {
        return Err(ApiError::not_found("device"));
    }
    let response = authorize_fetch(&state, &mac, &creds).await?;
    Ok(Json(response))
}

/// Fetch `<mac>.cfg` in the phone's text format
pub async fn fetch_config_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
    Query(creds): Query<FetchCredentials>,
) -> Result<impl IntoResponse, ApiError> {
    let mac = mac_from_config_filename(&file).ok_or_else(|| ApiError::not_found("config file"))?;
    let response = authorize_fetch(&state, &mac, &creds).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_config_file(&response.config),
    ))
}

async fn authorize_fetch(
    state: &AppState,
    mac: &str,
    creds: &FetchCredentials,
) -> Result<FetchResponse, ApiError> {
    let device = match state.store.get_device_by_mac(mac).await? {
        Some(device) => device,
        None => {
            tracing::warn!("Fetch for unknown MAC {}", mac);
            return Err(ApiError::not_found("device"));
        }
    };

    let reject = |reason: &'static str, err: ApiError| {
        tracing::warn!("Rejected fetch by device {} ({}): {}", device.id, mac, reason);
        audit(state, FetchOutcome::failure(&device.id, reason, mac));
        err
    };

    if !device.enabled {
        return Err(reject(
            fetch_reason::DEVICE_NOT_ENABLED,
            ApiError::forbidden("device not enabled"),
        ));
    }
    if creds.username != device.id {
        return Err(reject(
            fetch_reason::INCORRECT_USERNAME,
            ApiError::forbidden("incorrect username or password"),
        ));
    }
    let password_ok = bcrypt::verify(&creds.password, &device.password_hash)
        .map_err(|_| ApiError::internal("password verification error"))?;
    if !password_ok {
        return Err(reject(
            fetch_reason::INCORRECT_PASSWORD,
            ApiError::forbidden("incorrect username or password"),
        ));
    }

    let site = match state.store.get_site(&device.site_id).await? {
        Some(site) => site,
        None => return Err(reject(fetch_reason::SITE_NOT_FOUND, ApiError::not_found("site"))),
    };
    if !site.enabled {
        return Err(reject(
            fetch_reason::SITE_NOT_ENABLED,
            ApiError::forbidden("site not enabled"),
        ));
    }
    let model = match state.store.get_device_model(&device.model_id).await? {
        Some(model) => model,
        None => {
            return Err(reject(
                fetch_reason::MODEL_NOT_FOUND,
                ApiError::not_found("device model"),
            ))
        }
    };

    let config = match state
        .tree
        .build_device_configuration(&device.target(), FlattenMode::PublishedOnly)
        .await
    {
        Ok(config) => config,
        Err(e) => {
            if matches!(e.downcast_ref::<TreeError>(), Some(TreeError::NoConfiguration(_))) {
                return Err(reject(fetch_reason::NO_CONFIGURATION, e.into()));
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        "Device {} ({}) fetched configuration with {} top-level keys",
        device.id,
        mac,
        config.len()
    );
    audit(
        state,
        FetchOutcome::success(&device.id, fetch_reason::AUTH_OK_CONFIG_PRESENT, mac),
    );

    Ok(FetchResponse {
        site,
        device,
        model,
        config,
    })
}

fn audit(state: &AppState, outcome: FetchOutcome) {
    record_fetch(
        state.store.clone(),
        state.ws_hub.clone(),
        state.config.fetch_audit_retention,
        outcome,
    );
}
