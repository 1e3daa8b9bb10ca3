//! Mercator projections.
//!
//! Both projections share the WGS84 semi-major axis. Web Mercator treats the
//! Earth as a sphere; World Mercator uses the WGS84 ellipsoid, so its
//! northings grow slightly slower with latitude.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use crate::error::{ProjectionError, Result};

/// WGS84 semi-major axis in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081_819_190_842_621_5;

/// Spherical Web Mercator (EPSG:3857).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl WebMercator {
    /// Latitude where the square world extent ends.
    pub const MAX_LAT: f64 = 85.051_128_779_806_6;

    /// Half the width of the world in meters.
    pub const MAX_EXTENT: f64 = 20_037_508.342_789_244;

    pub fn proj(lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_lat(lat, Self::MAX_LAT + 1e-9, "EPSG:3857")?;
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        Ok((x, y))
    }

    pub fn unproj(x: f64, y: f64) -> Result<(f64, f64)> {
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
        // small tolerance so the extent corners themselves are accepted
        check_lat(lat, Self::MAX_LAT + 1e-9, "EPSG:3857")?;
        Ok(((x / EARTH_RADIUS).to_degrees(), lat))
    }
}

/// Ellipsoidal World Mercator (EPSG:3395).
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldMercator;

impl WorldMercator {
    /// Beyond this latitude northings are numerically meaningless.
    pub const MAX_LAT: f64 = 89.0;

    pub fn proj(lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_lat(lat, Self::MAX_LAT, "EPSG:3395")?;
        let phi = lat.to_radians();
        let esin = WGS84_E * phi.sin();
        let y = EARTH_RADIUS
            * ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - esin) / (1.0 + esin)).powf(WGS84_E / 2.0))
                .ln();
        Ok((EARTH_RADIUS * lon.to_radians(), y))
    }

    pub fn unproj(x: f64, y: f64) -> Result<(f64, f64)> {
        let t = (-y / EARTH_RADIUS).exp();
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..30 {
            let esin = WGS84_E * phi.sin();
            let next =
                FRAC_PI_2 - 2.0 * (t * ((1.0 - esin) / (1.0 + esin)).powf(WGS84_E / 2.0)).atan();
            let done = (next - phi).abs() < 1e-13;
            phi = next;
            if done {
                break;
            }
        }
        let lat = phi.to_degrees();
        check_lat(lat, Self::MAX_LAT + 1e-9, "EPSG:3395")?;
        Ok(((x / EARTH_RADIUS).to_degrees(), lat))
    }
}

pub(crate) fn check_lat(lat: f64, max: f64, projection: &'static str) -> Result<()> {
    if !lat.is_finite() || lat.abs() > max {
        return Err(ProjectionError::OutOfRange {
            lat,
            max,
            projection,
        });
    }
    Ok(())
}
