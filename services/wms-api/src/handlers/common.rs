//! Shared response helpers and error mapping.

use axum::{
    body::Body,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use projection::ProjectionError;
use renderer::RenderError;
use tracing::error;
use wms_common::WmsError;
use wms_protocol::service_exception;

use crate::state::AppState;

/// Map a rendering failure to its protocol error.
pub fn render_error(err: RenderError) -> WmsError {
    match err {
        RenderError::UnknownLayer(layer) => WmsError::LayerNotFound(layer),
        RenderError::InvalidSize { width, height } => {
            WmsError::InvalidRequest(format!("cannot render {}x{}", width, height))
        }
        RenderError::Projection(e @ ProjectionError::OutOfRange { .. }) => WmsError::ProjectionRange {
            param: "BBOX".to_string(),
            message: e.to_string(),
        },
        other => WmsError::RenderError(other.to_string()),
    }
}

fn status_of(err: &WmsError) -> StatusCode {
    StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// WMS exception document with the error's status.
pub fn wms_exception(err: &WmsError, version: &str) -> Response {
    let status = status_of(err);
    if status.is_server_error() {
        error!(error = %err, "WMS request failed");
    }
    let xml = service_exception(err, version);
    let content_type = if version == "1.3.0" {
        "text/xml"
    } else {
        "application/vnd.ogc.se_xml"
    };
    response(status, content_type, xml)
}

/// Plain-text error for the tile protocol.
pub fn tile_error(err: &WmsError) -> Response {
    let status = status_of(err);
    if status.is_server_error() {
        error!(error = %err, "Tile request failed");
    }
    response(status, "text/plain; charset=utf-8", err.to_string())
}

pub fn response(status: StatusCode, content_type: &str, body: impl Into<Body>) -> Response {
    let mut res = Response::new(body.into());
    *res.status_mut() = status;
    if let Ok(value) = content_type.parse() {
        res.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    res
}

/// Base URL for self links: configured, or taken from the request's Host.
pub fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = &state.config.public_base_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_mapping() {
        assert!(matches!(
            render_error(RenderError::UnknownLayer("gt7k".into())),
            WmsError::LayerNotFound(_)
        ));
        let range = render_error(RenderError::Projection(ProjectionError::OutOfRange {
            lat: 95.0,
            max: 89.0,
            projection: "EPSG:3395",
        }));
        assert_eq!(range.http_status_code(), 400);
        assert_eq!(
            render_error(RenderError::Encode("boom".into())).http_status_code(),
            500
        );
    }

    #[test]
    fn test_exception_response() {
        let res = wms_exception(&WmsError::MissingParameter("BBOX".into()), "1.3.0");
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/xml");
    }
}
