//! XYZ tile endpoints: service document, layer documents and tiles.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use projection::tile_to_world_box;
use renderer::{encode, select_layers, Compositor, EncodeOptions, MapRequest};
use serde::Serialize;
use storage::{CacheKey, CacheMode, Catalog, LayerKind};
use tracing::{debug, instrument, warn};
use wms_common::{BoundingBox, TileCoord, WmsError, WmsResult, MAX_ZOOM};
use wms_protocol::{world_to_geo, xml_escape, TilePath};

use super::common::{base_url, render_error, response, tile_error};
use super::wms::{geo_extent, layer_title, source_layers};
use crate::state::AppState;

/// Output tile edge in pixels.
pub const TILE_SIZE: u32 = 256;

#[derive(Debug, Serialize)]
pub struct ServiceDocument {
    pub tiles: String,
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub title: String,
    pub href: String,
}

/// TileJSON-style description of one layer.
#[derive(Debug, Serialize)]
pub struct LayerDocument {
    pub name: String,
    pub title: String,
    pub tiles: Vec<String>,
    pub minzoom: u32,
    pub maxzoom: u32,
    /// west, south, east, north in degrees
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[f64; 4]>,
}

/// How a tile request wants its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebugMode {
    Off,
    /// HTML page describing the tile.
    Page,
    /// The tile image, rendered fresh.
    Image,
}

impl DebugMode {
    fn from_query(query: &HashMap<String, String>) -> Self {
        match query.get("debug").map(String::as_str) {
            Some("image") => DebugMode::Image,
            Some("") | Some("0") | Some("false") | None => DebugMode::Off,
            Some(_) => DebugMode::Page,
        }
    }
}

/// GET /tile and /tile/
pub async fn service_document_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ServiceDocument> {
    let base = base_url(&state, &headers);
    let catalog = state.catalog().await;
    let layers = catalog
        .public_layer_names()
        .into_iter()
        .map(|name| LayerSummary {
            title: layer_title(&name),
            href: format!("{}/tile/{}", base, name),
            name,
        })
        .collect();
    Json(ServiceDocument {
        tiles: format!("{}/tile/{{layer}}/{{z}}/{{x}}/{{y}}.png", base),
        layers,
    })
}

/// GET /tile/{layer} and /tile/{layer}/{z}/{x}/{y}.png
#[instrument(skip(state, headers, query))]
pub async fn tile_route_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let trimmed = path.trim_matches('/');
    if !trimmed.is_empty() && !trimmed.contains('/') {
        return layer_document(&state, &headers, trimmed).await;
    }

    state.metrics.record_tile_request();
    let tile = match TilePath::parse(trimmed) {
        Ok(tile) => tile,
        Err(e) => return tile_error(&e),
    };
    let (catalog, generation) = state.snapshot().await;
    let Some(kind) = catalog.resolve_layer(&tile.layer) else {
        return tile_error(&WmsError::LayerNotFound(tile.layer));
    };

    let result = match DebugMode::from_query(&query) {
        DebugMode::Off => serve_tile(&state, catalog, generation, tile).await,
        DebugMode::Image => render_tile(&state, catalog, &tile, CacheMode::Bypass)
            .await
            .map(|png| response(StatusCode::OK, "image/png", png)),
        DebugMode::Page => debug_page(&state, &catalog, &kind, &tile),
    };
    result.unwrap_or_else(|e| tile_error(&e))
}

async fn layer_document(state: &Arc<AppState>, headers: &HeaderMap, name: &str) -> Response {
    let catalog = state.catalog().await;
    let Some(kind) = catalog.resolve_layer(name) else {
        return tile_error(&WmsError::LayerNotFound(name.to_string()));
    };
    let base = base_url(state, headers);
    let bounds = match &kind {
        LayerKind::Raster(layer) | LayerKind::Labels(layer) => {
            catalog.layer(layer).and_then(|entries| geo_extent(entries))
        }
        LayerKind::Pyramid => geo_extent(
            catalog
                .layer_names()
                .filter_map(|l| catalog.layer(l))
                .flatten(),
        ),
    };
    let doc = LayerDocument {
        name: name.to_string(),
        title: layer_title(name),
        tiles: vec![format!("{}/tile/{}/{{z}}/{{x}}/{{y}}.png", base, name)],
        minzoom: 0,
        maxzoom: MAX_ZOOM,
        bounds: bounds.map(|b| [b.min_x, b.min_y, b.max_x, b.max_y]),
    };
    let mut res = response(
        StatusCode::OK,
        "application/json",
        serde_json::to_vec(&doc).unwrap_or_default(),
    );
    res.headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    res
}

/// Cache first, then render and write back.
async fn serve_tile(
    state: &Arc<AppState>,
    catalog: Arc<Catalog>,
    generation: u64,
    tile: TilePath,
) -> WmsResult<Response> {
    let key = CacheKey::new(tile.layer.clone(), tile.coord);
    let cache = state.cache.clone();
    let lookup = key.clone();
    let cached = tokio::task::spawn_blocking(move || cache.try_read(&lookup, CacheMode::Normal))
        .await
        .map_err(|e| WmsError::InternalError(format!("cache task: {}", e)))?;

    if let Some(bytes) = cached {
        state.metrics.record_cache_hit();
        let mut res = tile_response(state, bytes);
        res.headers_mut().insert("x-cache", HeaderValue::from_static("HIT"));
        return Ok(res);
    }
    state.metrics.record_cache_miss();

    let png = render_tile(state, catalog, &tile, CacheMode::Normal).await?;
    match state.store_tile(key, png.clone(), generation).await {
        Ok(true) => debug!(layer = %tile.layer, z = tile.coord.z, "Tile written to cache"),
        Ok(false) => {}
        Err(e) => warn!(error = %format!("{:#}", e), "Tile cache write failed"),
    }

    let mut res = tile_response(state, png);
    res.headers_mut().insert("x-cache", HeaderValue::from_static("MISS"));
    Ok(res)
}

fn tile_response(state: &AppState, body: impl Into<axum::body::Body>) -> Response {
    let mut res = response(StatusCode::OK, "image/png", body);
    let headers = res.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", state.config.tile_max_age)) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    res
}

/// Composite and encode one tile.
async fn render_tile(
    state: &Arc<AppState>,
    catalog: Arc<Catalog>,
    tile: &TilePath,
    mode: CacheMode,
) -> WmsResult<Vec<u8>> {
    let bbox = tile_box(&tile.coord)?;
    let map = MapRequest {
        layers: vec![tile.layer.clone()],
        bbox,
        width: TILE_SIZE,
        height: TILE_SIZE,
        zoom: Some(tile.coord.z as f64),
        substitute_small_scale: false,
    };
    debug!(layer = %tile.layer, coord = %tile.coord.cache_key(), ?mode, "Rendering tile");

    let started = Instant::now();
    let worker = state.clone();
    let png = tokio::task::spawn_blocking(move || {
        let img = Compositor::new(&catalog, &worker.dalles, &worker.settings).render(&map)?;
        encode(&img, &EncodeOptions::default())
    })
    .await
    .map_err(|e| WmsError::InternalError(format!("render task: {}", e)))?
    .map_err(|e| {
        state.metrics.record_render_error();
        render_error(e)
    })?;
    state.metrics.record_render("tile", started.elapsed());
    Ok(png)
}

fn tile_box(coord: &TileCoord) -> WmsResult<BoundingBox> {
    tile_to_world_box(coord).map_err(|e| render_error(e.into()))
}

fn debug_page(state: &AppState, catalog: &Catalog, kind: &LayerKind, tile: &TilePath) -> WmsResult<Response> {
    let bbox = tile_box(&tile.coord)?;
    let layers = match kind {
        LayerKind::Pyramid => select_layers(
            catalog,
            &state.settings.tiers,
            &bbox,
            tile.coord.z as f64,
            state.settings.coverage,
        ),
        other => source_layers(catalog, other, state),
    };

    let mut rows = String::new();
    for layer in &layers {
        for entry in catalog.layer(layer).unwrap_or_default() {
            if entry.interior.is_some_and(|i| i.intersects(&bbox)) {
                rows.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                    xml_escape(layer),
                    xml_escape(&entry.name),
                    xml_escape(&entry.title),
                    entry.zorder
                ));
            }
        }
    }

    let (west, south) = world_to_geo(bbox.min_x, bbox.min_y)?;
    let (east, north) = world_to_geo(bbox.max_x, bbox.max_y)?;
    let TileCoord { z, x, y } = tile.coord;
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{layer} {z}/{x}/{y}</title></head>
<body>
<h1>{layer} {z}/{x}/{y}</h1>
<p>World Mercator box: {min_x:.2}, {min_y:.2}, {max_x:.2}, {max_y:.2}</p>
<p>Geographic box: {west:.6}, {south:.6}, {east:.6}, {north:.6}</p>
<p>Layers drawn: {layers}</p>
<table border="1">
<tr><th>Layer</th><th>Chart</th><th>Title</th><th>Z-order</th></tr>
{rows}</table>
<p><img src="{y}.png?debug=image" width="{size}" height="{size}"></p>
</body>
</html>
"#,
        layer = xml_escape(&tile.layer),
        min_x = bbox.min_x,
        min_y = bbox.min_y,
        max_x = bbox.max_x,
        max_y = bbox.max_y,
        layers = xml_escape(&layers.join(", ")),
        size = TILE_SIZE,
    );
    Ok(response(StatusCode::OK, "text/html; charset=utf-8", html))
}
