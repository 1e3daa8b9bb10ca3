//! Erasure masking: parts of a scanned chart that must never be drawn
//! (insets, overlapping neighbours) are made fully transparent before
//! slicing.

use image::{Rgba, RgbaImage};
use projection::WorldMercator;
use storage::{GeoTiff, Zone};
use tracing::debug;

use crate::error::{IngestionError, Result};

const ERASED: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Pixel georeferencing of a chart raster: World Mercator exterior box and
/// per-pixel resolution.
#[derive(Debug, Clone, Copy)]
pub struct Georef {
    min_x: f64,
    max_y: f64,
    resx: f64,
    resy: f64,
    /// Longitudes west of this belong to the far side of the antimeridian.
    west: f64,
    wraps: bool,
}

impl Georef {
    pub fn of(entry: &GeoTiff) -> Result<Self> {
        let not_georef = || IngestionError::NotGeoreferenced {
            name: entry.name.clone(),
        };
        let exterior = entry.exterior.ok_or_else(not_georef)?;
        let geo = entry.geo_exterior.ok_or_else(not_georef)?;
        let (resx, resy) = entry.resolution().ok_or_else(not_georef)?;
        Ok(Self {
            min_x: exterior.min_x,
            max_y: exterior.max_y,
            resx,
            resy,
            west: geo.min_x,
            wraps: geo.max_x > 180.0,
        })
    }

    /// Fractional pixel position (column, row) of a geographic point.
    pub fn to_pixel(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        let lon = if self.wraps && lon < self.west { lon + 360.0 } else { lon };
        let (x, y) = WorldMercator::proj(lon, lat)?;
        Ok(((x - self.min_x) / self.resx, (self.max_y - y) / self.resy))
    }
}

/// Clear every erasure zone of `entry` in `img`. Returns the number of
/// pixels cleared.
pub fn apply_erasures(img: &mut RgbaImage, entry: &GeoTiff) -> Result<u64> {
    if entry.erasures.is_empty() {
        return Ok(0);
    }
    let georef = Georef::of(entry)?;
    let invalid = |message: String| IngestionError::InvalidZone {
        name: entry.name.clone(),
        message,
    };

    let mut cleared = 0;
    for zone in &entry.erasures {
        cleared += match zone {
            Zone::Rect(rect) => {
                let (c0, r0) = georef.to_pixel(rect.min_x, rect.max_y)?;
                let (c1, r1) = georef.to_pixel(rect.max_x, rect.min_y)?;
                if c1 < c0 || r1 < r0 {
                    return Err(invalid(format!("inverted rectangle {:?}", rect)));
                }
                fill_rect(img, c0, r0, c1, r1)
            }
            Zone::Polygon(ring) => {
                if ring.len() < 3 {
                    return Err(invalid(format!("polygon with {} vertices", ring.len())));
                }
                let points = ring
                    .iter()
                    .map(|&(lon, lat)| georef.to_pixel(lon, lat))
                    .collect::<Result<Vec<_>>>()?;
                fill_polygon(img, &points)
            }
        };
    }
    debug!(chart = %entry.name, zones = entry.erasures.len(), cleared, "Erasures applied");
    Ok(cleared)
}

/// First and last pixel index whose centre lies in `[lo, hi]`, clipped to `len`.
fn center_span(lo: f64, hi: f64, len: u32) -> Option<(u32, u32)> {
    let first = (lo - 0.5).ceil().max(0.0);
    let last = (hi - 0.5).floor().min(len as f64 - 1.0);
    (first <= last).then(|| (first as u32, last as u32))
}

fn fill_rect(img: &mut RgbaImage, c0: f64, r0: f64, c1: f64, r1: f64) -> u64 {
    let (Some((x0, x1)), Some((y0, y1))) = (
        center_span(c0, c1, img.width()),
        center_span(r0, r1, img.height()),
    ) else {
        return 0;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, ERASED);
        }
    }
    (x1 - x0 + 1) as u64 * (y1 - y0 + 1) as u64
}

/// Even-odd scanline fill sampled at pixel centres.
fn fill_polygon(img: &mut RgbaImage, points: &[(f64, f64)]) -> u64 {
    let min_row = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_row = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let Some((row0, row1)) = center_span(min_row, max_row, img.height()) else {
        return 0;
    };

    let mut cleared = 0;
    let mut crossings = Vec::new();
    for row in row0..=row1 {
        let y = row as f64 + 0.5;
        crossings.clear();
        for (i, &(xa, ya)) in points.iter().enumerate() {
            let (xb, yb) = points[(i + 1) % points.len()];
            if (ya <= y && y < yb) || (yb <= y && y < ya) {
                crossings.push(xa + (y - ya) * (xb - xa) / (yb - ya));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let first = (pair[0] - 0.5).ceil().max(0.0);
            let end = (pair[1] - 0.5).ceil().min(img.width() as f64);
            if first >= end {
                continue;
            }
            for x in first as u32..end as u32 {
                img.put_pixel(x, row, ERASED);
                cleared += 1;
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{count_pixels, create_solid_raster};

    const RED: [u8; 4] = [255, 0, 0, 255];

    #[test]
    fn test_fill_rect_pixel_centres() {
        let mut img = create_solid_raster(10, 10, RED);
        assert_eq!(fill_rect(&mut img, 2.0, 3.0, 5.0, 4.0), 3);
        assert_eq!(img.get_pixel(2, 3).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(4, 3).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(5, 3).0, RED);
        assert_eq!(img.get_pixel(2, 4).0, RED);
    }

    #[test]
    fn test_fill_rect_clipped() {
        let mut img = create_solid_raster(10, 10, RED);
        assert_eq!(fill_rect(&mut img, -5.0, -5.0, 50.0, 2.0), 20);
        assert_eq!(fill_rect(&mut img, 20.0, 0.0, 30.0, 5.0), 0);
    }

    #[test]
    fn test_fill_polygon_square() {
        let mut img = create_solid_raster(10, 10, RED);
        let square = [(2.0, 2.0), (6.0, 2.0), (6.0, 6.0), (2.0, 6.0)];
        assert_eq!(fill_polygon(&mut img, &square), 16);
        assert_eq!(count_pixels(&img, [0, 0, 0, 0]), 16);
    }

    #[test]
    fn test_fill_polygon_even_odd() {
        // bow tie: the two lobes are inside, the crossing point splits them
        let mut img = create_solid_raster(20, 20, RED);
        let bow = [(0.0, 0.0), (20.0, 20.0), (20.0, 0.0), (0.0, 20.0)];
        let cleared = fill_polygon(&mut img, &bow);
        assert!(cleared > 150 && cleared < 250, "{}", cleared);
        assert_eq!(img.get_pixel(1, 10).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(18, 10).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(10, 1).0, RED);
        assert_eq!(img.get_pixel(10, 18).0, RED);
    }
}
