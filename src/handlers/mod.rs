pub mod config_tree;
pub mod device_models;
pub mod devices;
pub mod elements;
pub mod fetch;
pub mod fetch_audit;
pub mod groups;
pub mod sites;
pub mod virtual_devices;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::tree::TreeError;

/// Error response body: {"error": "message"}
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("{} not found", resource),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<TreeError> for ApiError {
    fn from(err: TreeError) -> Self {
        let status = match &err {
            TreeError::NotFound { .. } | TreeError::NoConfiguration(_) => StatusCode::NOT_FOUND,
            TreeError::Duplicate(_) | TreeError::NonEmpty(_) | TreeError::ParentNotPublished(_) => {
                StatusCode::CONFLICT
            }
            TreeError::InvalidScope(_) | TreeError::InvalidPath(_) | TreeError::InvalidValue(_) => {
                StatusCode::BAD_REQUEST
            }
            TreeError::CycleDetected(_) | TreeError::DepthLimit(_) => {
                tracing::error!("Configuration tree integrity error: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Typed errors first, no string matching
        if let Some(tree_err) = err.downcast_ref::<TreeError>() {
            return tree_err.clone().into();
        }
        if let Some(nf) = err.downcast_ref::<crate::db::NotFoundError>() {
            return Self {
                status: StatusCode::NOT_FOUND,
                message: nf.to_string(),
            };
        }
        tracing::error!("Request failed: {:#}", err);
        Self::internal(err.to_string())
    }
}

/// Limit query for list endpoints. Defaults to 100, clamped to [1, 1000].
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: i32,
}

impl LimitQuery {
    pub fn sanitize(&self) -> i32 {
        self.limit.clamp(1, 1000)
    }
}

fn default_limit() -> i32 {
    100
}

/// Response helper: return 201 Created with JSON body
pub fn created<T: Serialize>(item: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(item))
}

/// Healthcheck endpoint, returns 200 OK with status
pub async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "yealink-provision",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
