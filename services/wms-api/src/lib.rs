//! Nautical chart WMS and XYZ tile service.
//!
//! HTTP server implementing OGC WMS 1.1.1/1.3.0 and XYZ tiles over a
//! catalog of scanned, georeferenced charts.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use state::AppState;

/// Public routes of the service.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // WMS endpoints
        .route("/wms", get(handlers::wms_handler))
        .route("/wms/", get(handlers::wms_handler))
        // XYZ tiles and their documents
        .route("/tile", get(handlers::service_document_handler))
        .route("/tile/", get(handlers::service_document_handler))
        .route("/tile/*path", get(handlers::tile_route_handler))
        // Health check
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        // Metrics
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

/// Administration routes. Reloading can wipe the whole tile cache and is not
/// authenticated, so these are served on their own listener, loopback by
/// default.
pub fn build_admin_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/admin/reload", post(handlers::reload_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}
