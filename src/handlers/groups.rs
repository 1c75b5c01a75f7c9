use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::models::*;
use crate::tree::GroupTree;
use crate::AppState;

use super::ApiError;

/// Get a group with its direct children
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupWithChildren>, ApiError> {
    let group = state.tree.get_group_with_children(&id).await?;
    Ok(Json(group))
}

/// Get a group with every descendant loaded
pub async fn get_group_tree(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<GroupTree>, ApiError> {
    let tree = state.tree.materialize(&id).await?;
    Ok(Json(tree))
}

/// Delete an empty group
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.tree.delete_group_by_id(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConfigGroup>, ApiError> {
    let group = state.tree.set_group_published(&id, true).await?;
    Ok(Json(group))
}

/// Unpublish a group and every group below it
pub async fn unpublish_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConfigGroup>, ApiError> {
    let group = state.tree.set_group_published(&id, false).await?;
    Ok(Json(group))
}
