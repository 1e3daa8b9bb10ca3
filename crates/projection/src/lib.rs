//! Coordinate reference system transformations.
//!
//! Implements the three systems the chart server works with, from scratch:
//! - geographic lon/lat (EPSG:4326, CRS:84)
//! - spherical Web Mercator (EPSG:3857), used by tile clients
//! - ellipsoidal World Mercator (EPSG:3395), used internally for all
//!   compositing and coverage computations

pub mod antimeridian;
pub mod dms;
pub mod error;
pub mod mercator;
pub mod transform;

pub use antimeridian::split_antimeridian;
pub use dms::parse_dm_position;
pub use error::{ProjectionError, Result};
pub use mercator::{WebMercator, WorldMercator};
pub use transform::{
    project, scale_denominator, scale_for_zoom, tile_to_projected_box, tile_to_world_box,
    unproject, zoom_for_scale, Projection,
};
