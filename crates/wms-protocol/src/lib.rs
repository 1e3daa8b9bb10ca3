//! OGC WMS and XYZ tile protocol handling.
//!
//! Supports:
//! - WMS 1.1.1 and 1.3.0 GetCapabilities, GetMap and GetFeatureInfo parameters
//! - XYZ tile paths `/{layer}/{z}/{x}/{y}.png`
//! - Service exception documents
//!
//! Everything here is pure parsing and formatting; no I/O.

pub mod capabilities;
pub mod convert;
pub mod exceptions;
pub mod getfeatureinfo;
pub mod getmap;
pub mod params;
pub mod tile_path;

pub use capabilities::{CapabilitiesBuilder, LayerInfo};
pub use convert::{to_world_box, world_to_geo};
pub use exceptions::{service_exception, xml_escape};
pub use getfeatureinfo::{FeatureInfo, FeatureInfoResponse, GetFeatureInfoRequest, InfoFormat};
pub use getmap::{parse_bbox, parse_crs, GetMapRequest, MAX_SIZE, MIN_SIZE, SUPPORTED_FORMATS};
pub use params::{WmsOperation, WmsParams};
pub use tile_path::TilePath;
