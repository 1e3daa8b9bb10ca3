//! End-to-end tests of the HTTP routes against a temporary data tree.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use tower::ServiceExt;

use storage::CacheKey;
use test_utils::{create_solid_raster, fixtures::SAMPLE_CATALOG, TestDataDir};
use wms_api::{build_admin_router, build_router, AppState, ServerConfig};
use wms_common::TileCoord;

const RED: [u8; 4] = [200, 30, 30, 255];
const BLUE: [u8; 4] = [30, 30, 200, 255];

fn setup_state() -> (TestDataDir, Arc<AppState>) {
    let data = TestDataDir::new();
    data.write_catalog(SAMPLE_CATALOG);
    data.write_dalle("7001_pal300", 0, 0, &create_solid_raster(200, 200, RED));
    data.write_dalle("7002_pal300", 0, 0, &create_solid_raster(200, 200, BLUE));

    let config = ServerConfig::with_data_dir(data.root());
    let state = AppState::new(config, None).unwrap();
    (data, Arc::new(state))
}

fn setup() -> (TestDataDir, Router) {
    let (data, state) = setup_state();
    (data, build_router(state))
}

/// Public and admin routers over one state.
fn setup_with_admin() -> (TestDataDir, Router, Router) {
    let (data, state) = setup_state();
    (data, build_router(state.clone()), build_admin_router(state))
}

async fn post(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

// any catalog cache is older than 2100-01-01
const FAR_FUTURE: u64 = 4_102_444_800;

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(res: Response) -> Vec<u8> {
    to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_text(res: Response) -> String {
    String::from_utf8(body_bytes(res).await).unwrap()
}

fn content_type(res: &Response) -> String {
    res.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string()
}

// 10/498/354 sits over the western half of chart 7001
const GT50K_TILE: &str = "/tile/gt50k/10/498/354.png";

#[tokio::test]
async fn test_health_and_ready() {
    let (_data, app) = setup();
    let res = get(&app, "/health").await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = get(&app, "/ready").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json["status"], "ready");
    assert!(json["entries"].as_u64().unwrap() >= 5);
}

#[tokio::test]
async fn test_get_capabilities() {
    let (_data, app) = setup();
    let res = get(&app, "/wms?SERVICE=WMS&REQUEST=GetCapabilities&VERSION=1.3.0").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "text/xml");
    let xml = body_text(res).await;
    assert!(xml.contains("<WMS_Capabilities"));
    for layer in ["gt50k", "gtpyr", "num50k", "gtaem"] {
        assert!(xml.contains(&format!("<Name>{}</Name>", layer)), "missing {}", layer);
    }
    assert!(xml.contains("EPSG:3395"));
}

#[tokio::test]
async fn test_get_map_png() {
    let (_data, app) = setup();
    // about 1:150 000, fine enough to draw gt50k itself
    let res = get(
        &app,
        "/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS=gt50k&STYLES=&SRS=EPSG:4326\
         &BBOX=-4.9,48.1,-4.6,48.4&WIDTH=800&HEIGHT=800&FORMAT=image/png&TRANSPARENT=TRUE",
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "image/png");

    let img = image::load_from_memory(&body_bytes(res).await).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (800, 800));
    let opaque = img.pixels().filter(|p| p.0[3] == 255).count();
    assert!(opaque > 800 * 800 / 2, "only {} opaque pixels", opaque);
    assert!(img.pixels().all(|p| p.0[3] == 0 || p.0 == RED || p.0 == BLUE));
}

#[tokio::test]
async fn test_get_map_rejects_oversized_request() {
    let (_data, app) = setup();
    let res = get(
        &app,
        "/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0&LAYERS=gt50k&CRS=EPSG:3857\
         &BBOX=-556597,6106854,-500938,6190443&WIDTH=5000&HEIGHT=256&FORMAT=image/png",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let xml = body_text(res).await;
    assert!(xml.contains("ServiceExceptionReport"));
    assert!(xml.contains("InvalidParameterValue"));
}

#[tokio::test]
async fn test_get_map_unknown_layer() {
    let (_data, app) = setup();
    let res = get(
        &app,
        "/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0&LAYERS=gt7k&CRS=EPSG:3395\
         &BBOX=-556597,6106854,-500938,6190443&WIDTH=256&HEIGHT=256&FORMAT=image/png",
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(body_text(res).await.contains("LayerNotDefined"));
}

#[tokio::test]
async fn test_get_map_latitude_out_of_range() {
    let (_data, app) = setup();
    let res = get(
        &app,
        "/wms?SERVICE=WMS&REQUEST=GetMap&VERSION=1.1.1&LAYERS=gt50k&SRS=EPSG:4326\
         &BBOX=-5,47,-4,95&WIDTH=256&HEIGHT=256&FORMAT=image/png",
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(res).await.contains("BBOX"));
}

#[tokio::test]
async fn test_get_feature_info_json() {
    let (_data, app) = setup();
    let res = get(
        &app,
        "/wms?SERVICE=WMS&REQUEST=GetFeatureInfo&VERSION=1.1.1&LAYERS=gt50k&QUERY_LAYERS=gt50k\
         &SRS=EPSG:4326&BBOX=-5,48,-4.5,48.5&WIDTH=100&HEIGHT=100&X=30&Y=70\
         &INFO_FORMAT=application/json",
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    let names: Vec<&str> = json["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"7001_pal300"), "{:?}", names);
}

#[tokio::test]
async fn test_tile_service_and_layer_documents() {
    let (_data, app) = setup();
    let res = get(&app, "/tile/").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert!(json["tiles"].as_str().unwrap().ends_with("/tile/{layer}/{z}/{x}/{y}.png"));
    assert!(json["layers"]
        .as_array()
        .unwrap()
        .iter()
        .any(|l| l["name"] == "gtpyr"));

    let res = get(&app, "/tile/gt50k").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json["name"], "gt50k");
    let bounds = json["bounds"].as_array().unwrap();
    assert!(bounds[0].as_f64().unwrap() < -4.9);

    let res = get(&app, "/tile/gt7k").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tile_headers_and_no_cache_for_tier_layer() {
    let (data, app) = setup();
    let res = get(&app, GT50K_TILE).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "image/png");
    assert!(res.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .starts_with("public, max-age="));
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let img = image::load_from_memory(&body_bytes(res).await).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (256, 256));
    assert!(img.pixels().any(|p| p.0 == RED));

    // only the pyramid is cached by default
    assert!(!data.cache_root().join("gt50k").exists());
}

#[tokio::test]
async fn test_pyramid_tile_written_then_served_from_cache() {
    let (data, app) = setup();
    let res = get(&app, "/tile/gtpyr/8/124/88.png").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-cache"], "MISS");
    let first = body_bytes(res).await;
    assert!(data.cache_root().join("gtpyr/8/124/88.png").is_file());

    let res = get(&app, "/tile/gtpyr/8/124/88.png").await;
    assert_eq!(res.headers()["x-cache"], "HIT");
    assert_eq!(body_bytes(res).await, first);
}

#[tokio::test]
async fn test_tile_errors() {
    let (_data, app) = setup();
    assert_eq!(get(&app, "/tile/bogus/x/y/z.png").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/tile/gt50k/2/9/0.png").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, "/tile/unknownlayer/1/0/0.png").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_debug_page_and_image_bypass_cache() {
    let (data, app) = setup();
    let res = get(&app, "/tile/gtpyr/3/3/2.png?debug=1").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(content_type(&res).starts_with("text/html"));
    assert!(res.headers().get(header::CACHE_CONTROL).is_none());
    assert!(body_text(res).await.contains("2.png?debug=image"));

    let res = get(&app, "/tile/gtpyr/3/3/2.png?debug=image").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(content_type(&res), "image/png");
    assert!(res.headers().get(header::CACHE_CONTROL).is_none());
    assert!(!data.cache_root().join("gtpyr/3/3/2.png").exists());

    let res = get(&app, &format!("{}?debug=1", GT50K_TILE)).await;
    assert!(body_text(res).await.contains("7001_pal300"));
}

#[tokio::test]
async fn test_reload_rebuild_clears_cache() {
    let (data, app, admin) = setup_with_admin();
    get(&app, "/tile/gtpyr/8/124/88.png").await;
    assert!(data.cache_root().join("gtpyr/8/124/88.png").is_file());

    let res = post(&admin, &format!("/admin/reload?rebuild_before={}", FAR_FUTURE)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json["rebuilt"], true);
    assert!(json["cache_cleared"].as_u64().unwrap() >= 1);
    assert!(!data.cache_root().join("gtpyr/8/124/88.png").exists());
}

#[tokio::test]
async fn test_tile_from_replaced_catalog_is_not_cached() {
    let (data, state) = setup_state();
    let tile = data.cache_root().join("gtpyr/8/124/88.png");
    let key = CacheKey::new("gtpyr", TileCoord::new(8, 124, 88));

    // a render starts on the current catalog and finishes after a rebuild
    let (old_catalog, old_generation) = state.snapshot().await;
    let summary = state
        .reload(Some(UNIX_EPOCH + Duration::from_secs(FAR_FUTURE)))
        .await
        .unwrap();
    assert!(summary.rebuilt);
    assert!(!Arc::ptr_eq(&old_catalog, &state.catalog().await));

    assert!(!state.store_tile(key.clone(), b"stale".to_vec(), old_generation).await.unwrap());
    assert!(!tile.exists());

    let (_, generation) = state.snapshot().await;
    assert_ne!(generation, old_generation);
    assert!(state.store_tile(key, b"fresh".to_vec(), generation).await.unwrap());
    assert_eq!(std::fs::read(&tile).unwrap(), b"fresh");
}

#[tokio::test]
async fn test_reload_without_rebuild_keeps_cache() {
    let (data, app, admin) = setup_with_admin();
    get(&app, "/tile/gtpyr/8/124/88.png").await;

    let res = post(&admin, "/admin/reload").await;
    assert_eq!(res.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(res).await).unwrap();
    assert_eq!(json["rebuilt"], false);
    assert!(data.cache_root().join("gtpyr/8/124/88.png").is_file());
}

#[tokio::test]
async fn test_reload_not_served_on_public_router() {
    let (data, app, admin) = setup_with_admin();
    get(&app, "/tile/gtpyr/8/124/88.png").await;

    let uri = format!("/admin/reload?rebuild_before={}", FAR_FUTURE);
    assert_eq!(post(&app, &uri).await.status(), StatusCode::NOT_FOUND);
    assert!(data.cache_root().join("gtpyr/8/124/88.png").is_file());

    assert_eq!(get(&admin, "/health").await.status(), StatusCode::OK);
    assert_eq!(get(&admin, "/wms?SERVICE=WMS&REQUEST=GetCapabilities").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_without_exporter() {
    let (_data, app) = setup();
    assert_eq!(get(&app, "/metrics").await.status(), StatusCode::NOT_FOUND);
}
