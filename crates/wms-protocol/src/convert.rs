//! Conversion of client boxes to the internal World Mercator system.

use projection::{project, unproject, Projection, ProjectionError, WorldMercator};
use wms_common::{BoundingBox, CrsCode, WmsError, WmsResult};

fn range_error(param: &str, err: ProjectionError) -> WmsError {
    match err {
        ProjectionError::OutOfRange { .. } => WmsError::ProjectionRange {
            param: param.to_string(),
            message: err.to_string(),
        },
        ProjectionError::InvalidCoordinate(c) => WmsError::invalid(param, c),
    }
}

/// World Mercator box of a client box in `crs` (x/y order).
///
/// Geographic latitudes must lie within ±90°; they are then clamped to the
/// World Mercator domain. Projected boxes must unproject to valid latitudes.
/// Range failures name `param`.
pub fn to_world_box(bbox: &BoundingBox, crs: CrsCode, param: &str) -> WmsResult<BoundingBox> {
    if !bbox.is_valid() {
        return Err(WmsError::InvalidBbox(format!(
            "{},{},{},{}: minimum must be below maximum on both axes",
            bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
        )));
    }

    let geo = match Projection::from_crs(crs) {
        Projection::Geographic => {
            for lat in [bbox.min_y, bbox.max_y] {
                Projection::Geographic
                    .proj(0.0, lat)
                    .map_err(|e| range_error(param, e))?;
            }
            let max = WorldMercator::MAX_LAT;
            BoundingBox::new(
                bbox.min_x,
                bbox.min_y.clamp(-max, max),
                bbox.max_x,
                bbox.max_y.clamp(-max, max),
            )
        }
        Projection::WorldMercator => {
            unproject(bbox, Projection::WorldMercator).map_err(|e| range_error(param, e))?;
            return Ok(*bbox);
        }
        Projection::WebMercator => {
            unproject(bbox, Projection::WebMercator).map_err(|e| range_error(param, e))?
        }
    };

    let world = project(&geo, Projection::WorldMercator).map_err(|e| range_error(param, e))?;
    if !world.is_valid() {
        return Err(WmsError::InvalidBbox("box collapses at the poles".to_string()));
    }
    Ok(world)
}

/// (lon, lat) of a World Mercator point.
pub fn world_to_geo(x: f64, y: f64) -> WmsResult<(f64, f64)> {
    WorldMercator::unproj(x, y).map_err(|e| range_error("BBOX", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_geographic_out_of_range() {
        let err = to_world_box(&BoundingBox::new(-5.0, 47.0, -4.0, 95.0), CrsCode::Epsg4326, "BBOX")
            .unwrap_err();
        assert!(matches!(err, WmsError::ProjectionRange { ref param, .. } if param == "BBOX"));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_geographic_near_pole_clamped() {
        let world = to_world_box(&BoundingBox::new(-5.0, 80.0, 5.0, 90.0), CrsCode::Crs84, "BBOX").unwrap();
        assert!(world.is_valid());
    }

    #[test]
    fn test_web_mercator_converted() {
        let web = project(&BoundingBox::new(-5.0, 47.0, -4.0, 48.0), Projection::WebMercator).unwrap();
        let world = to_world_box(&web, CrsCode::Epsg3857, "BBOX").unwrap();
        let direct = project(&BoundingBox::new(-5.0, 47.0, -4.0, 48.0), Projection::WorldMercator).unwrap();
        assert_approx_eq!(world.min_x, direct.min_x, 1e-6);
        assert_approx_eq!(world.max_y, direct.max_y, 1e-6);
    }

    #[test]
    fn test_web_mercator_beyond_extent() {
        let err = to_world_box(
            &BoundingBox::new(0.0, 0.0, 1000.0, 3.0e7),
            CrsCode::Epsg3857,
            "BBOX",
        )
        .unwrap_err();
        assert!(matches!(err, WmsError::ProjectionRange { .. }));
    }

    #[test]
    fn test_inverted_box() {
        assert!(matches!(
            to_world_box(&BoundingBox::new(1.0, 0.0, 0.0, 1.0), CrsCode::Epsg3395, "BBOX"),
            Err(WmsError::InvalidBbox(_))
        ));
    }

    #[test]
    fn test_world_to_geo() {
        let (x, y) = WorldMercator::proj(-4.5, 48.3).unwrap();
        let (lon, lat) = world_to_geo(x, y).unwrap();
        assert_approx_eq!(lon, -4.5, 1e-9);
        assert_approx_eq!(lat, 48.3, 1e-9);
    }
}
