//! Health checks, metrics and catalog administration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

// ============================================================================
// Health Checks
// ============================================================================

/// GET /health - Liveness
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub entries: usize,
    pub layers: Vec<String>,
    pub metrics: MetricsSnapshot,
}

/// GET /ready - Catalog loaded and non-empty
pub async fn ready_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let catalog = state.catalog().await;
    let ready = !catalog.is_empty();
    let body = ReadyResponse {
        status: if ready { "ready" } else { "empty catalog" },
        entries: catalog.len(),
        layers: catalog.layer_names().map(String::from).collect(),
        metrics: state.metrics.snapshot(),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// Prometheus Metrics
// ============================================================================

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}

// ============================================================================
// Catalog Reload
// ============================================================================

/// Instant before which a catalog cache is considered stale.
///
/// `rebuild_before` is a unix timestamp in seconds; `force=1` means now.
fn rebuild_threshold(query: &HashMap<String, String>) -> Result<Option<SystemTime>, String> {
    if query.get("force").is_some_and(|v| v == "1" || v == "true") {
        return Ok(Some(SystemTime::now()));
    }
    match query.get("rebuild_before") {
        Some(value) => value
            .parse::<u64>()
            .map(|secs| Some(UNIX_EPOCH + Duration::from_secs(secs)))
            .map_err(|_| format!("rebuild_before '{}' is not a unix timestamp", value)),
        None => Ok(None),
    }
}

/// POST /admin/reload - Reload the catalog, rebuilding it if stale
#[instrument(skip(state))]
pub async fn reload_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let threshold = match rebuild_threshold(&query) {
        Ok(t) => t,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };
    info!(?threshold, "Catalog reload requested");
    match state.reload(threshold).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Catalog reload failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {:#}", e)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_rebuild_threshold() {
        assert_eq!(rebuild_threshold(&query(&[])).unwrap(), None);
        assert_eq!(
            rebuild_threshold(&query(&[("rebuild_before", "1700000000")])).unwrap(),
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
        assert!(rebuild_threshold(&query(&[("force", "1")])).unwrap().is_some());
        assert!(rebuild_threshold(&query(&[("rebuild_before", "yesterday")])).is_err());
    }
}
