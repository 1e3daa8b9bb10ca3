//! WMS request handlers.
//!
//! - GetCapabilities: layers, CRS list and extents
//! - GetMap: composited chart image
//! - GetFeatureInfo: charts under a pixel

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use renderer::{encode, parse_bgcolor, Compositor, EncodeOptions, MapRequest, OutputFormat};
use storage::{Catalog, GeoTiff, LayerKind, LABEL_PREFIX, PYRAMID_LAYER};
use tracing::{debug, instrument};
use wms_common::{BoundingBox, WmsError, WmsResult};
use wms_protocol::{
    CapabilitiesBuilder, FeatureInfo, FeatureInfoResponse, GetFeatureInfoRequest, GetMapRequest,
    LayerInfo, WmsOperation, WmsParams,
};
use wms_protocol::getfeatureinfo::Location;

use super::common::{base_url, render_error, response, wms_exception};
use crate::state::AppState;

// ============================================================================
// WMS Handler Entry Point
// ============================================================================

#[instrument(skip_all)]
pub async fn wms_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = WmsParams::from_pairs(pairs);
    let version = params.version().to_string();
    match dispatch(&state, &headers, &params).await {
        Ok(res) => res,
        Err(e) => {
            debug!(error = %e, "WMS request rejected");
            wms_exception(&e, &version)
        }
    }
}

async fn dispatch(state: &Arc<AppState>, headers: &HeaderMap, params: &WmsParams) -> WmsResult<Response> {
    if let Some(service) = params.get("SERVICE") {
        if !service.trim().eq_ignore_ascii_case("WMS") {
            return Err(WmsError::invalid("SERVICE", "SERVICE must be WMS"));
        }
    }
    let operation = params.operation()?;
    state.metrics.record_wms_request(match operation {
        WmsOperation::GetCapabilities => "GetCapabilities",
        WmsOperation::GetMap => "GetMap",
        WmsOperation::GetFeatureInfo => "GetFeatureInfo",
    });

    match operation {
        WmsOperation::GetCapabilities => get_capabilities(state, headers, params).await,
        WmsOperation::GetMap => get_map(state, params).await,
        WmsOperation::GetFeatureInfo => get_feature_info(state, params).await,
    }
}

// ============================================================================
// GetCapabilities
// ============================================================================

async fn get_capabilities(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    params: &WmsParams,
) -> WmsResult<Response> {
    let version = params.version();
    let catalog = state.catalog().await;
    let layers = catalog
        .public_layer_names()
        .into_iter()
        .filter_map(|name| layer_info(&catalog, &name));
    let xml = CapabilitiesBuilder::new(base_url(state, headers))
        .layers(layers)
        .build(version);
    Ok(response(
        StatusCode::OK,
        CapabilitiesBuilder::content_type(version),
        xml,
    ))
}

/// Human title of a public layer.
pub fn layer_title(name: &str) -> String {
    if name == PYRAMID_LAYER {
        return "All charts, scale-dependent".to_string();
    }
    if let Some(tier) = name.strip_prefix(LABEL_PREFIX) {
        return format!("Chart numbers ({})", tier);
    }
    match name {
        "gtaem" => "Action de l'Etat en mer charts".to_string(),
        "gtMancheGrid" => "Channel grid chart".to_string(),
        "gtZonMar" => "Maritime zones chart".to_string(),
        _ => format!("Charts {}", name.trim_start_matches("gt")),
    }
}

/// Geographic extent of some entries, longitudes clipped to ±180°.
pub fn geo_extent<'a>(entries: impl IntoIterator<Item = &'a GeoTiff>) -> Option<BoundingBox> {
    entries
        .into_iter()
        .filter(|e| e.interior.is_some())
        .filter_map(|e| e.geo_exterior)
        .map(|b| {
            BoundingBox::new(
                b.min_x.clamp(-180.0, 180.0),
                b.min_y,
                b.max_x.clamp(-180.0, 180.0),
                b.max_y,
            )
        })
        .reduce(|a, b| a.union(&b))
}

/// Catalog layers behind a public layer name.
pub fn source_layers(catalog: &Catalog, kind: &LayerKind, state: &AppState) -> Vec<String> {
    match kind {
        LayerKind::Raster(layer) | LayerKind::Labels(layer) => vec![layer.clone()],
        LayerKind::Pyramid => catalog
            .layer_names()
            .filter(|l| state.settings.tiers.by_layer(l).is_some())
            .map(String::from)
            .collect(),
    }
}

fn layer_info(catalog: &Catalog, name: &str) -> Option<LayerInfo> {
    let kind = catalog.resolve_layer(name)?;
    let geo_bbox = match &kind {
        LayerKind::Raster(layer) | LayerKind::Labels(layer) => geo_extent(catalog.layer(layer)?),
        LayerKind::Pyramid => geo_extent(
            catalog
                .layer_names()
                .filter_map(|l| catalog.layer(l))
                .flatten(),
        ),
    };
    Some(LayerInfo {
        name: name.to_string(),
        title: layer_title(name),
        geo_bbox,
        queryable: true,
    })
}

// ============================================================================
// GetMap
// ============================================================================

async fn get_map(state: &Arc<AppState>, params: &WmsParams) -> WmsResult<Response> {
    let req = GetMapRequest::from_params(params)?;
    let catalog = state.catalog().await;
    for layer in &req.layers {
        if catalog.resolve_layer(layer).is_none() {
            return Err(WmsError::LayerNotFound(layer.clone()));
        }
    }

    let format =
        OutputFormat::from_mime(&req.format).ok_or_else(|| WmsError::UnsupportedFormat(req.format.clone()))?;
    let background = match &req.bgcolor {
        Some(value) => parse_bgcolor(value)
            .ok_or_else(|| WmsError::invalid("BGCOLOR", format!("'{}' is not 0xRRGGBB", value)))?,
        None => EncodeOptions::default().background,
    };
    let options = EncodeOptions {
        format,
        transparent: req.transparent,
        background,
    };
    let map = MapRequest {
        layers: req.layers.clone(),
        bbox: req.world_box,
        width: req.width,
        height: req.height,
        zoom: None,
        substitute_small_scale: true,
    };

    let started = Instant::now();
    let worker = state.clone();
    let bytes = tokio::task::spawn_blocking(move || {
        let img = Compositor::new(&catalog, &worker.dalles, &worker.settings).render(&map)?;
        encode(&img, &options)
    })
    .await
    .map_err(|e| WmsError::InternalError(format!("render task: {}", e)))?
    .map_err(|e| {
        state.metrics.record_render_error();
        render_error(e)
    })?;
    state.metrics.record_render("wms", started.elapsed());

    Ok(response(StatusCode::OK, format.mime_type(), bytes))
}

// ============================================================================
// GetFeatureInfo
// ============================================================================

async fn get_feature_info(state: &Arc<AppState>, params: &WmsParams) -> WmsResult<Response> {
    let req = GetFeatureInfoRequest::from_params(params)?;
    let catalog = state.catalog().await;
    let (x, y) = req.world_point();
    let (longitude, latitude) = req.geo_point()?;

    let mut seen = HashSet::new();
    let mut features = Vec::new();
    for name in &req.query_layers {
        let kind = catalog
            .resolve_layer(name)
            .ok_or_else(|| WmsError::LayerNotFound(name.clone()))?;
        for layer in source_layers(&catalog, &kind, state) {
            for entry in catalog.layer(&layer).unwrap_or_default() {
                let hit = entry.interior.is_some_and(|i| i.contains_point(x, y));
                if hit && seen.insert(entry.name.clone()) {
                    features.push(FeatureInfo {
                        layer: layer.clone(),
                        name: entry.name.clone(),
                        title: entry.title.clone(),
                        scale_denominator: entry.scale_denominator.unwrap_or(0.0),
                        edition: entry.edition.clone(),
                        last_update: entry.last_update.clone(),
                    });
                }
            }
        }
    }
    // most detailed chart first
    features.sort_by(|a, b| a.scale_denominator.total_cmp(&b.scale_denominator));
    if let Some(max) = req.feature_count {
        features.truncate(max as usize);
    }

    let body = FeatureInfoResponse::new(Location { longitude, latitude }, features)
        .render(req.info_format)?;
    Ok(response(StatusCode::OK, req.info_format.to_mime(), body))
}
