//! Common types shared across the chart WMS/tile services.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod tile;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, CrsCode};
pub use error::{WmsError, WmsResult};
pub use tile::{TileCoord, MAX_ZOOM};
