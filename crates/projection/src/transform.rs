//! Box-level conversions between geographic, Web Mercator and World Mercator
//! coordinates, plus tile/zoom/scale helpers.

use wms_common::{BoundingBox, CrsCode, TileCoord};

use crate::error::Result;
use crate::mercator::{check_lat, WebMercator, WorldMercator};

/// Scale denominator of zoom level 0 for 256 px tiles and 0.28 mm pixels.
pub const ZOOM0_SCALE_DENOMINATOR: f64 = 559_082_264.028_717_8;

/// OGC standardized rendering pixel size in meters.
pub const STANDARD_PIXEL_SIZE: f64 = 0.000_28;

/// A coordinate system the engine can convert to and from geographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Geographic,
    WebMercator,
    WorldMercator,
}

impl Projection {
    pub fn from_crs(crs: CrsCode) -> Self {
        match crs {
            CrsCode::Crs84 | CrsCode::Epsg4326 => Projection::Geographic,
            CrsCode::Epsg3857 => Projection::WebMercator,
            CrsCode::Epsg3395 => Projection::WorldMercator,
        }
    }

    /// Largest absolute latitude this projection accepts.
    pub fn max_lat(&self) -> f64 {
        match self {
            Projection::Geographic => 90.0,
            Projection::WebMercator => WebMercator::MAX_LAT,
            Projection::WorldMercator => WorldMercator::MAX_LAT,
        }
    }

    /// Geographic (lon, lat) to this system.
    pub fn proj(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        match self {
            Projection::Geographic => {
                check_lat(lat, 90.0, "EPSG:4326")?;
                Ok((lon, lat))
            }
            Projection::WebMercator => WebMercator::proj(lon, lat),
            Projection::WorldMercator => WorldMercator::proj(lon, lat),
        }
    }

    /// This system to geographic (lon, lat).
    pub fn unproj(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self {
            Projection::Geographic => {
                check_lat(y, 90.0, "EPSG:4326")?;
                Ok((x, y))
            }
            Projection::WebMercator => WebMercator::unproj(x, y),
            Projection::WorldMercator => WorldMercator::unproj(x, y),
        }
    }
}

/// Project a geographic box. Mercator projections are monotonic on both
/// axes, so the corners are enough.
pub fn project(geo: &BoundingBox, projection: Projection) -> Result<BoundingBox> {
    let (min_x, min_y) = projection.proj(geo.min_x, geo.min_y)?;
    let (max_x, max_y) = projection.proj(geo.max_x, geo.max_y)?;
    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

/// Inverse of [`project`].
pub fn unproject(projected: &BoundingBox, projection: Projection) -> Result<BoundingBox> {
    let (min_x, min_y) = projection.unproj(projected.min_x, projected.min_y)?;
    let (max_x, max_y) = projection.unproj(projected.max_x, projected.max_y)?;
    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

/// Web Mercator box of an XYZ tile (top-left origin).
pub fn tile_to_projected_box(coord: &TileCoord) -> BoundingBox {
    let size = 2.0 * WebMercator::MAX_EXTENT / coord.matrix_size() as f64;
    let min_x = -WebMercator::MAX_EXTENT + coord.x as f64 * size;
    let max_y = WebMercator::MAX_EXTENT - coord.y as f64 * size;
    BoundingBox::new(min_x, max_y - size, min_x + size, max_y)
}

/// World Mercator box of an XYZ tile, the box the compositing engine draws.
pub fn tile_to_world_box(coord: &TileCoord) -> Result<BoundingBox> {
    let web = tile_to_projected_box(coord);
    let geo = unproject(&web, Projection::WebMercator)?;
    project(&geo, Projection::WorldMercator)
}

/// Scale denominator of a map `box_width` meters wide drawn on `width_px` pixels.
pub fn scale_denominator(box_width: f64, width_px: u32) -> f64 {
    box_width / width_px.max(1) as f64 / STANDARD_PIXEL_SIZE
}

/// Scale denominator of a zoom level.
pub fn scale_for_zoom(zoom: f64) -> f64 {
    ZOOM0_SCALE_DENOMINATOR / 2f64.powf(zoom)
}

/// Fractional zoom level matching a scale denominator.
pub fn zoom_for_scale(scale_denominator: f64) -> f64 {
    (ZOOM0_SCALE_DENOMINATOR / scale_denominator).log2()
}
