use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::*;
use crate::AppState;

use super::{created, ApiError};

/// A resolved path: every node from the root group to the leaf, plus the
/// leaf's children when it is a group.
#[derive(Debug, Serialize)]
pub struct PathView {
    pub nodes: Vec<Node>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<GroupChildren>,
}

/// Parse the scope from the URL and check the bound site, model or device exists
pub(crate) async fn resolve_scope(state: &AppState, kind: &str, id: &str) -> Result<ScopeRef, ApiError> {
    let scope = ScopeRef::parse(kind, id)?;
    let exists = match scope.kind {
        ScopeKind::Global => true,
        ScopeKind::Model => state.store.get_device_model(&scope.id).await?.is_some(),
        ScopeKind::Site => state.store.get_site(&scope.id).await?.is_some(),
        ScopeKind::Device => state.store.get_device(&scope.id).await?.is_some(),
        ScopeKind::Group => false,
    };
    if !exists {
        return Err(ApiError::not_found(&scope.to_string()));
    }
    Ok(scope)
}

/// List the root groups bound to a scope
pub async fn list_roots(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id)): Path<(String, String)>,
) -> Result<Json<Vec<ConfigGroup>>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let roots = state.tree.list_roots(&scope).await?;
    Ok(Json(roots))
}

/// Resolve a path; groups come back with their direct children
pub async fn get_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
) -> Result<Json<PathView>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let resolved = state.tree.resolve_path(&scope, &path).await?;

    let children = match &resolved.leaf {
        Some(Node::Group(group)) => Some(state.tree.list_children(&group.id).await?),
        Some(Node::Element(_)) => None,
        None => return Err(ApiError::not_found(&path)),
    };
    Ok(Json(PathView {
        nodes: resolved.nodes(),
        children,
    }))
}

/// Create a group, or an element when the body carries a value
pub async fn create_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
    Json(req): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let node = state.tree.create_at_path(&scope, &path, &req).await?;
    Ok(created(node))
}

/// Change an element's value
pub async fn update_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
    Json(req): Json<UpdateValueRequest>,
) -> Result<Json<ConfigElement>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let element = state
        .tree
        .update_value_at_path(&scope, &path, &req.value, req.remark)
        .await?;
    Ok(Json(element))
}

/// Delete an element or an empty group
pub async fn delete_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    state.tree.delete_at_path(&scope, &path).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn rename_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Node>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let node = state.tree.rename_leaf(&scope, &path, &req.name).await?;
    Ok(Json(node))
}

pub async fn publish_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
) -> Result<Json<Node>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let node = state.tree.set_published_at_path(&scope, &path, true).await?;
    Ok(Json(node))
}

pub async fn unpublish_at_path(
    State(state): State<Arc<AppState>>,
    Path((kind, scope_id, path)): Path<(String, String, String)>,
) -> Result<Json<Node>, ApiError> {
    let scope = resolve_scope(&state, &kind, &scope_id).await?;
    let node = state.tree.set_published_at_path(&scope, &path, false).await?;
    Ok(Json(node))
}
