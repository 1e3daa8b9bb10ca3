//! Antimeridian normalization.
//!
//! A geographic box crossing longitude 180° is represented by two copies
//! shifted by 360°, so downstream intersection code only ever deals with
//! plain boxes.

use wms_common::BoundingBox;

/// Normalize a geographic box and split it if it crosses the antimeridian.
///
/// `west` is brought into [-180, 180) and `east` is made greater than `west`
/// (an `east` smaller than `west` means the box wraps). The first returned box
/// is the normalized one; the second, when present, is its copy shifted by
/// -360° and covers the part beyond the antimeridian on the western side.
pub fn split_antimeridian(geo: &BoundingBox) -> Vec<BoundingBox> {
    let mut west = geo.min_x;
    let mut east = geo.max_x;
    while west < -180.0 {
        west += 360.0;
        east += 360.0;
    }
    while west >= 180.0 {
        west -= 360.0;
        east -= 360.0;
    }
    if east < west {
        east += 360.0;
    }

    let normalized = BoundingBox::new(west, geo.min_y, east, geo.max_y);
    if east > 180.0 {
        vec![normalized, normalized.translate_x(-360.0)]
    } else {
        vec![normalized]
    }
}
