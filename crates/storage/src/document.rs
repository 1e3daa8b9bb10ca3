//! Serde model of the YAML catalog document.
//!
//! The document is read as-is here; interpretation (margin normalization,
//! projection, erasure zone resolution) happens in [`crate::geotiff`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Top-level catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    /// Pairs of charts whose relative draw order is forced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub draw_after: Vec<DrawAfter>,

    /// Layer name (`gt50k`, `gtaem`, ...) to its charts.
    #[serde(default)]
    pub layers: BTreeMap<String, Vec<ChartRecord>>,
}

impl CatalogDocument {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| StorageError::Document(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| StorageError::Document(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| StorageError::io(path, e))?;
        Self::from_yaml(&text)
    }
}

/// `above` must be drawn after (on top of) `below`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawAfter {
    pub below: String,
    pub above: String,
}

/// One chart as written in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecord {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_denominator: Option<f64>,
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub last_update: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zorder: Option<i32>,

    pub width: u32,
    pub height: u32,

    /// Exterior box in degrees. Absent for charts with no principal area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub south: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub west: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub north: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub east: Option<f64>,

    /// Margins in pixels. Negative `right`/`bottom` are measured from the far edge.
    #[serde(default)]
    pub left: i64,
    #[serde(default)]
    pub bottom: i64,
    #[serde(default)]
    pub right: i64,
    #[serde(default)]
    pub top: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub erasures: Vec<ZoneRecord>,
}

impl ChartRecord {
    /// Exterior box as (west, south, east, north), when all four are present.
    pub fn geo_box(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.west?, self.south?, self.east?, self.north?))
    }
}

/// Erasure zone as written: exactly one of `rect` or `polygon`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<RectRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygon: Option<Vec<Coord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectRecord {
    #[serde(rename = "SW")]
    pub sw: Coord,
    #[serde(rename = "NE")]
    pub ne: Coord,
}

/// A position: `[lon, lat]` or a degree/minute string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coord {
    LonLat([f64; 2]),
    DegreeMinutes(String),
}

impl Coord {
    /// (lon, lat) in degrees.
    pub fn lon_lat(&self) -> projection::Result<(f64, f64)> {
        match self {
            Coord::LonLat([lon, lat]) => Ok((*lon, *lat)),
            Coord::DegreeMinutes(s) => projection::parse_dm_position(s),
        }
    }
}
