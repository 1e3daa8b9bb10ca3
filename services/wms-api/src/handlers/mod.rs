//! HTTP request handlers.
//!
//! - `wms`: GetCapabilities, GetMap, GetFeatureInfo
//! - `tiles`: XYZ service and layer documents, tiles
//! - `admin`: health, readiness, Prometheus metrics, catalog reload
//! - `common`: error mapping and response helpers

pub mod admin;
pub mod common;
pub mod tiles;
pub mod wms;

pub use admin::{health_handler, metrics_handler, ready_handler, reload_handler};
pub use tiles::{service_document_handler, tile_route_handler};
pub use wms::wms_handler;
