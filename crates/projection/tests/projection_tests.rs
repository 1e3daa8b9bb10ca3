//! Cross-module projection tests.

use projection::{
    project, split_antimeridian, tile_to_projected_box, unproject, Projection, ProjectionError,
};
use test_utils::assert_approx_eq;
use wms_common::{BoundingBox, TileCoord};

#[test]
fn test_project_unproject_world_mercator_box() {
    let geo = BoundingBox::new(-5.2, 47.8, -4.1, 48.6);
    let world = project(&geo, Projection::WorldMercator).unwrap();
    assert!(world.is_valid());
    let back = unproject(&world, Projection::WorldMercator).unwrap();
    assert_approx_eq!(back.min_x, geo.min_x, 1e-9);
    assert_approx_eq!(back.min_y, geo.min_y, 1e-9);
    assert_approx_eq!(back.max_x, geo.max_x, 1e-9);
    assert_approx_eq!(back.max_y, geo.max_y, 1e-9);
}

#[test]
fn test_tile_box_matches_known_tile() {
    // z=12 tile containing Brest
    let bbox = tile_to_projected_box(&TileCoord::new(12, 1997, 1416));
    let geo = unproject(&bbox, Projection::WebMercator).unwrap();
    assert!(geo.contains_point(-4.45, 48.39));
    assert_approx_eq!(geo.width(), 360.0 / 4096.0, 1e-9);
}

#[test]
fn test_out_of_range_is_distinguishable() {
    let err = project(&BoundingBox::new(0.0, 0.0, 1.0, 86.0), Projection::WebMercator).unwrap_err();
    assert!(matches!(err, ProjectionError::OutOfRange { .. }));

    let err = projection::parse_dm_position("nonsense").unwrap_err();
    assert!(matches!(err, ProjectionError::InvalidCoordinate(_)));
}

#[test]
fn test_antimeridian_halves_cover_same_width() {
    let parts = split_antimeridian(&BoundingBox::new(175.0, -18.0, -178.0, -15.0));
    assert_eq!(parts.len(), 2);
    assert_approx_eq!(parts[0].width(), 7.0, 1e-12);
    assert_approx_eq!(parts[1].width(), 7.0, 1e-12);
    assert_approx_eq!(parts[0].min_x - parts[1].min_x, 360.0, 1e-12);
}
