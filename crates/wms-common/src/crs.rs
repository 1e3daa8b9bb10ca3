//! Coordinate Reference System codes accepted by the WMS front-end.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known CRS codes supported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 geographic, lon/lat axis order in every protocol version
    Crs84,
    /// WGS84 geographic (lat/lon axis order in WMS 1.3.0)
    Epsg4326,
    /// Spherical Web Mercator (meters)
    Epsg3857,
    /// Ellipsoidal World Mercator (meters)
    Epsg3395,
}

impl CrsCode {
    /// All codes, in the order advertised in capabilities documents.
    pub const ALL: [CrsCode; 4] = [
        CrsCode::Epsg3395,
        CrsCode::Epsg3857,
        CrsCode::Epsg4326,
        CrsCode::Crs84,
    ];

    /// Parse a CRS string from a WMS request (SRS or CRS parameter).
    ///
    /// Accepts formats like:
    /// - "EPSG:3395"
    /// - "epsg:3857" or the legacy "EPSG:900913"
    /// - "CRS:84"
    pub fn from_wms_string(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "CRS:84" => Ok(CrsCode::Crs84),
            "EPSG:4326" => Ok(CrsCode::Epsg4326),
            "EPSG:3857" | "EPSG:900913" => Ok(CrsCode::Epsg3857),
            "EPSG:3395" => Ok(CrsCode::Epsg3395),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Axis order of BBOX values for the given WMS version.
    ///
    /// WMS 1.3.0 uses the "natural" axis order of EPSG:4326 (lat, lon);
    /// earlier versions and every other CRS use (x, y).
    pub fn axis_order(&self, version: &str) -> AxisOrder {
        match (self, version) {
            (CrsCode::Epsg4326, "1.3.0") => AxisOrder::LatLon,
            _ => AxisOrder::XY,
        }
    }

    /// Check if this is a geographic (degrees) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Crs84 | CrsCode::Epsg4326)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Crs84 => "CRS:84",
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg3857 => "EPSG:3857",
            CrsCode::Epsg3395 => "EPSG:3395",
        };
        write!(f, "{}", code)
    }
}

/// Axis order for coordinate interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// X (longitude/easting), Y (latitude/northing)
    XY,
    /// Y (latitude), X (longitude)
    LatLon,
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
