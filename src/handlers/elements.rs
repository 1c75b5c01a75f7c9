use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::ApiError;

pub async fn update_element_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateValueRequest>,
) -> Result<Json<ConfigElement>, ApiError> {
    let element = state
        .tree
        .update_element_value(&id, &req.value, req.remark)
        .await?;
    Ok(Json(element))
}

pub async fn delete_element(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tree.delete_element_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_element(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConfigElement>, ApiError> {
    let element = state.tree.set_element_published(&id, true).await?;
    Ok(Json(element))
}

pub async fn unpublish_element(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConfigElement>, ApiError> {
    let element = state.tree.set_element_published(&id, false).await?;
    Ok(Json(element))
}
