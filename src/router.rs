use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the application router with all routes
pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        // Provisioning routes (called by the phones)
        .route("/fetch/device/:mac", get(handlers::fetch::fetch_device))
        .route("/cfg/:file", get(handlers::fetch::fetch_config_file))
        // Path-based configuration routes
        .route("/api/config/:scope/:scope_id", get(handlers::config_tree::list_roots))
        .route(
            "/api/config/:scope/:scope_id/*path",
            get(handlers::config_tree::get_path)
                .post(handlers::config_tree::create_at_path)
                .patch(handlers::config_tree::update_at_path)
                .delete(handlers::config_tree::delete_at_path),
        )
        .route("/api/rename/:scope/:scope_id/*path", post(handlers::config_tree::rename_at_path))
        .route(
            "/api/publish/:scope/:scope_id/*path",
            post(handlers::config_tree::publish_at_path).delete(handlers::config_tree::unpublish_at_path),
        )
        // Id-based group routes
        .route("/api/groups/:id", get(handlers::groups::get_group).delete(handlers::groups::delete_group))
        .route("/api/groups/:id/tree", get(handlers::groups::get_group_tree))
        .route(
            "/api/groups/:id/publish",
            post(handlers::groups::publish_group).delete(handlers::groups::unpublish_group),
        )
        // Id-based element routes
        .route("/api/elements/:id", axum::routing::delete(handlers::elements::delete_element))
        .route("/api/elements/:id/value", put(handlers::elements::update_element_value))
        .route(
            "/api/elements/:id/publish",
            post(handlers::elements::publish_element).delete(handlers::elements::unpublish_element),
        )
        // Site routes
        .route("/api/sites", get(handlers::sites::list_sites).post(handlers::sites::create_site))
        .route(
            "/api/sites/:id",
            get(handlers::sites::get_site)
                .put(handlers::sites::update_site)
                .delete(handlers::sites::delete_site),
        )
        .route(
            "/api/sites/:id/enable",
            post(handlers::sites::enable_site).delete(handlers::sites::disable_site),
        )
        .route(
            "/api/sites/:id/devices",
            get(handlers::devices::list_devices).post(handlers::devices::create_device),
        )
        .route(
            "/api/sites/:id/virtual-devices",
            get(handlers::virtual_devices::list_virtual_devices)
                .post(handlers::virtual_devices::create_virtual_device),
        )
        .route(
            "/api/sites/:id/virtual-devices/:vid",
            get(handlers::virtual_devices::get_virtual_device)
                .patch(handlers::virtual_devices::update_virtual_device)
                .delete(handlers::virtual_devices::delete_virtual_device),
        )
        // Device model routes
        .route(
            "/api/models",
            get(handlers::device_models::list_device_models).post(handlers::device_models::create_device_model),
        )
        .route(
            "/api/models/:id",
            get(handlers::device_models::get_device_model)
                .put(handlers::device_models::update_device_model)
                .delete(handlers::device_models::delete_device_model),
        )
        // Device routes
        .route(
            "/api/devices/:id",
            get(handlers::devices::get_device)
                .put(handlers::devices::update_device)
                .delete(handlers::devices::delete_device),
        )
        .route(
            "/api/devices/:id/enable",
            post(handlers::devices::enable_device).delete(handlers::devices::disable_device),
        )
        .route("/api/devices/:id/config", get(handlers::devices::get_device_config))
        .route("/api/devices/:id/config.cfg", get(handlers::devices::get_device_config_file))
        .route("/api/devices/:id/fetch-audit", get(handlers::fetch_audit::list_device_fetch_audit))
        // Fetch audit routes
        .route("/api/fetch-audit", get(handlers::fetch_audit::list_fetch_audit))
        // WebSocket route
        .route("/api/ws", get(crate::ws_upgrade_handler))
        // Health check
        .route("/api/health", get(handlers::healthcheck))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
