//! Catalog entries: one georeferenced source raster and its placement.

use serde::{Deserialize, Serialize};
use tracing::warn;
use wms_common::BoundingBox;

use projection::{project, split_antimeridian, Projection};

use crate::document::{ChartRecord, ZoneRecord};
use crate::error::{Result, StorageError};

/// Erasure zone resolved to geographic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Zone {
    /// Axis-aligned box in degrees.
    Rect(BoundingBox),
    /// Ring of (lon, lat) vertices, filled with the even-odd rule.
    Polygon(Vec<(f64, f64)>),
}

impl Zone {
    pub fn from_record(record: &ZoneRecord) -> projection::Result<Option<Zone>> {
        match (&record.rect, &record.polygon) {
            (Some(rect), None) => {
                let (west, south) = rect.sw.lon_lat()?;
                let (east, north) = rect.ne.lon_lat()?;
                Ok(Some(Zone::Rect(BoundingBox::new(west, south, east, north))))
            }
            (None, Some(points)) => {
                let ring = points
                    .iter()
                    .map(|p| p.lon_lat())
                    .collect::<projection::Result<Vec<_>>>()?;
                Ok(Some(Zone::Polygon(ring)))
            }
            _ => Ok(None),
        }
    }
}

/// Border widths in pixels, each within `[0, dimension / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTiff {
    /// Layer-relative name, also the dalle directory name.
    pub name: String,
    pub layer: String,
    pub title: String,
    pub edition: String,
    pub last_update: String,
    pub scale_denominator: Option<f64>,
    pub zorder: i32,

    pub width: u32,
    pub height: u32,
    pub margins: Margins,

    /// Exterior box in degrees, after antimeridian normalization.
    pub geo_exterior: Option<BoundingBox>,
    /// Exterior box in World Mercator meters.
    pub exterior: Option<BoundingBox>,
    /// Exterior minus margins, World Mercator meters.
    pub interior: Option<BoundingBox>,

    pub erasures: Vec<Zone>,
    pub partially_erased: bool,

    /// Longitude translation applied to this copy (0, or -360 for the
    /// western twin of a chart crossing the antimeridian).
    pub lon_shift: f64,
}

impl GeoTiff {
    /// Build the entries for one document record: one entry normally, two
    /// when the exterior box crosses the antimeridian.
    pub fn from_record(layer: &str, record: &ChartRecord, border_default: u32) -> Result<Vec<GeoTiff>> {
        if record.width == 0 || record.height == 0 {
            return Err(StorageError::invalid_entry(&record.name, "zero width or height"));
        }

        let margins = normalize_margins(record, border_default);
        let mut erasures = Vec::with_capacity(record.erasures.len());
        for zone in &record.erasures {
            match Zone::from_record(zone)
                .map_err(|e| StorageError::invalid_entry(&record.name, e.to_string()))?
            {
                Some(zone) => erasures.push(zone),
                None => {
                    return Err(StorageError::invalid_entry(
                        &record.name,
                        "erasure zone needs exactly one of rect or polygon",
                    ))
                }
            }
        }

        let base = GeoTiff {
            name: record.name.clone(),
            layer: layer.to_string(),
            title: record.title.clone(),
            edition: record.edition.clone(),
            last_update: record.last_update.clone(),
            scale_denominator: record.scale_denominator,
            zorder: record.zorder.unwrap_or(0),
            width: record.width,
            height: record.height,
            margins,
            geo_exterior: None,
            exterior: None,
            interior: None,
            partially_erased: !erasures.is_empty(),
            erasures,
            lon_shift: 0.0,
        };

        let Some((west, south, east, north)) = record.geo_box() else {
            return Ok(vec![base]);
        };
        if south >= north {
            return Err(StorageError::invalid_entry(&record.name, "south is not below north"));
        }

        let parts = split_antimeridian(&BoundingBox::new(west, south, east, north));
        let first_min_x = parts[0].min_x;
        let mut entries = Vec::with_capacity(parts.len());
        for geo in parts {
            let exterior = project(&geo, Projection::WorldMercator)?;
            let mut entry = base.clone();
            entry.lon_shift = geo.min_x - first_min_x;
            entry.interior = Some(interior_box(&exterior, record.width, record.height, &margins));
            entry.exterior = Some(exterior);
            entry.geo_exterior = Some(geo);
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Meters per pixel along x and y.
    pub fn resolution(&self) -> Option<(f64, f64)> {
        let ext = self.exterior?;
        Some((
            ext.width() / self.width as f64,
            ext.height() / self.height as f64,
        ))
    }

    /// Pixel window of the interior: (left, top, right, bottom), right/bottom exclusive.
    pub fn interior_window(&self) -> (u32, u32, u32, u32) {
        (
            self.margins.left,
            self.margins.top,
            self.width - self.margins.right,
            self.height - self.margins.bottom,
        )
    }

    /// Chart number: the name up to the first `_`.
    pub fn chart_number(&self) -> &str {
        self.name.split('_').next().unwrap_or(&self.name)
    }

    /// The entry's own copy of a geographic point, honouring `lon_shift`.
    pub fn contains_geo_point(&self, lon: f64, lat: f64) -> bool {
        let Some(interior) = self.interior else {
            return false;
        };
        match Projection::WorldMercator.proj(lon, lat) {
            Ok((x, y)) => interior.contains_point(x, y),
            Err(_) => false,
        }
    }
}

fn interior_box(exterior: &BoundingBox, width: u32, height: u32, m: &Margins) -> BoundingBox {
    let resx = exterior.width() / width as f64;
    let resy = exterior.height() / height as f64;
    BoundingBox::new(
        exterior.min_x + m.left as f64 * resx,
        exterior.min_y + m.bottom as f64 * resy,
        exterior.max_x - m.right as f64 * resx,
        exterior.max_y - m.top as f64 * resy,
    )
}

/// Turn the document's margin fields into border widths.
///
/// `right`/`bottom` are the pixel positions of the interior's far edges;
/// negative values count from the far edge. Widths outside `[0, dim / 2)`
/// fall back to `border_default`, or 0 when the default itself does not fit.
fn normalize_margins(record: &ChartRecord, border_default: u32) -> Margins {
    let abs = |v: i64, dim: u32| if v < 0 { v + dim as i64 } else { v };
    let right_edge = abs(record.right, record.width);
    let bottom_edge = abs(record.bottom, record.height);

    let clamp = |side: &str, value: i64, dim: u32| -> u32 {
        if value >= 0 && 2 * value < dim as i64 {
            return value as u32;
        }
        let fallback = if 2 * (border_default as u64) < dim as u64 {
            border_default
        } else {
            0
        };
        warn!(
            chart = %record.name,
            side,
            value,
            dimension = dim,
            fallback,
            "Border margin out of range, clamped"
        );
        fallback
    };

    Margins {
        left: clamp("left", record.left, record.width),
        top: clamp("top", record.top, record.height),
        right: clamp("right", record.width as i64 - right_edge, record.width),
        bottom: clamp("bottom", record.height as i64 - bottom_edge, record.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::CatalogDocument;

    fn record(name: &str) -> ChartRecord {
        let doc = CatalogDocument::from_yaml(test_utils::fixtures::SAMPLE_CATALOG).unwrap();
        doc.layers
            .values()
            .flatten()
            .find(|r| r.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_negative_margins_normalized() {
        let entries = GeoTiff::from_record("gt50k", &record("7001_pal300"), 400).unwrap();
        assert_eq!(entries.len(), 1);
        let m = entries[0].margins;
        assert_eq!((m.left, m.top, m.right, m.bottom), (10, 10, 10, 10));
        assert_eq!(entries[0].interior_window(), (10, 10, 190, 190));
    }

    #[test]
    fn test_interior_inside_exterior() {
        for name in ["7001_pal300", "7002_pal300", "6977_pal300", "0101_pal300"] {
            for entry in GeoTiff::from_record("gtx", &record(name), 400).unwrap() {
                let ext = entry.exterior.unwrap();
                let int = entry.interior.unwrap();
                assert!(ext.contains(&int), "{} interior escapes exterior", name);
            }
        }
    }

    #[test]
    fn test_out_of_range_margin_clamped() {
        let mut r = record("7001_pal300");
        r.width = 2000;
        r.height = 2000;
        r.left = 1500;
        r.right = 1990;
        r.bottom = 1990;
        r.top = -3;
        let entry = &GeoTiff::from_record("gt50k", &r, 400).unwrap()[0];
        assert_eq!(entry.margins.left, 400);
        assert_eq!(entry.margins.top, 400);
        assert_eq!(entry.margins.right, 10);

        // default does not fit in a 600 px chart
        r.width = 600;
        r.right = 590;
        let entry = &GeoTiff::from_record("gt50k", &r, 400).unwrap()[0];
        assert_eq!(entry.margins.left, 0);
    }

    #[test]
    fn test_no_geo_box_means_no_interior() {
        let entries = GeoTiff::from_record("gt50k", &record("7003_pal300"), 400).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].interior.is_none());
        assert!(entries[0].resolution().is_none());
    }

    #[test]
    fn test_antimeridian_duplicated() {
        let entries = GeoTiff::from_record("gt1M", &record("6977_pal300"), 400).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, entries[1].name);
        assert_eq!(entries[1].lon_shift, -360.0);

        let a = entries[0].interior.unwrap();
        let b = entries[1].interior.unwrap();
        let world = 2.0 * std::f64::consts::PI * projection::mercator::EARTH_RADIUS;
        assert!((a.min_x - b.min_x - world).abs() < 1e-6);
        assert!((a.max_x - b.max_x - world).abs() < 1e-6);
        assert_eq!(a.min_y, b.min_y);

        // east side of 180 is reachable through the western twin
        assert!(entries[1].contains_geo_point(-179.0, -14.0));
        assert!(entries[0].contains_geo_point(179.0, -14.0));
    }

    #[test]
    fn test_zones_resolved() {
        let entry = &GeoTiff::from_record("gt50k", &record("7002_pal300"), 400).unwrap()[0];
        assert!(entry.partially_erased);
        assert!(matches!(entry.erasures[0], Zone::Rect(_)));
        assert!(matches!(&entry.erasures[1], Zone::Polygon(p) if p.len() == 3));
    }

    #[test]
    fn test_chart_number() {
        let entry = &GeoTiff::from_record("gt50k", &record("7002_pal300"), 400).unwrap()[0];
        assert_eq!(entry.chart_number(), "7002");
    }
}
