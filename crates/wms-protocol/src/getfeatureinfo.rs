//! WMS GetFeatureInfo handling
//!
//! Answers "which charts cover this pixel": the queried pixel centre is
//! mapped back through the map box to World Mercator, then to lon/lat.

use serde::{Deserialize, Serialize};
use wms_common::{BoundingBox, CrsCode, WmsError, WmsResult};

use crate::convert::{to_world_box, world_to_geo};
use crate::exceptions::xml_escape;
use crate::getmap::{parse_bbox, parse_crs};
use crate::params::WmsParams;

/// GetFeatureInfo request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GetFeatureInfoRequest {
    pub version: String,
    /// Layers to query for information
    pub query_layers: Vec<String>,
    pub crs: CrsCode,
    /// Map box in World Mercator meters
    pub world_box: BoundingBox,
    pub width: u32,
    pub height: u32,
    /// Pixel column (0-based from left)
    pub i: u32,
    /// Pixel row (0-based from top)
    pub j: u32,
    pub info_format: InfoFormat,
    pub feature_count: Option<u32>,
}

impl GetFeatureInfoRequest {
    pub fn from_params(params: &WmsParams) -> WmsResult<Self> {
        let version = params.version().to_string();
        let query_layers = match params.list("QUERY_LAYERS") {
            l if !l.is_empty() => l,
            _ => params.list("LAYERS"),
        };
        if query_layers.is_empty() {
            return Err(WmsError::MissingParameter("QUERY_LAYERS".to_string()));
        }

        let width = params.require_u32("WIDTH")?;
        let height = params.require_u32("HEIGHT")?;
        if width == 0 || height == 0 {
            return Err(WmsError::invalid("WIDTH", "map size must be positive"));
        }

        let (ikey, jkey) = if version == "1.3.0" { ("I", "J") } else { ("X", "Y") };
        let i = params.require_u32(ikey)?;
        let j = params.require_u32(jkey)?;
        if i >= width {
            return Err(WmsError::invalid(ikey, format!("{} is outside the {} px map", i, width)));
        }
        if j >= height {
            return Err(WmsError::invalid(jkey, format!("{} is outside the {} px map", j, height)));
        }

        let info_format = match params.get("INFO_FORMAT") {
            Some(f) => InfoFormat::from_mime(f).ok_or_else(|| WmsError::UnsupportedFormat(f.to_string()))?,
            None => InfoFormat::default(),
        };

        let crs = parse_crs(params, &version)?;
        let bbox = parse_bbox(params, crs, &version)?;
        let world_box = to_world_box(&bbox, crs, "BBOX")?;

        let feature_count = match params.get("FEATURE_COUNT") {
            Some(_) => Some(params.require_u32("FEATURE_COUNT")?),
            None => None,
        };

        Ok(Self {
            version,
            query_layers,
            crs,
            world_box,
            width,
            height,
            i,
            j,
            info_format,
            feature_count,
        })
    }

    /// World Mercator position of the queried pixel centre.
    pub fn world_point(&self) -> (f64, f64) {
        let b = &self.world_box;
        let x = b.min_x + (self.i as f64 + 0.5) / self.width as f64 * b.width();
        let y = b.max_y - (self.j as f64 + 0.5) / self.height as f64 * b.height();
        (x, y)
    }

    /// (lon, lat) of the queried pixel centre.
    pub fn geo_point(&self) -> WmsResult<(f64, f64)> {
        let (x, y) = self.world_point();
        world_to_geo(x, y)
    }
}

/// Supported GetFeatureInfo response formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum InfoFormat {
    #[serde(rename = "application/json")]
    Json,
    /// text/html, for popups
    #[serde(rename = "text/html")]
    #[default]
    Html,
    #[serde(rename = "text/plain")]
    Text,
}

impl InfoFormat {
    /// Parse from MIME type string
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "application/json" => Some(InfoFormat::Json),
            "text/html" => Some(InfoFormat::Html),
            "text/plain" => Some(InfoFormat::Text),
            _ => None,
        }
    }

    pub fn to_mime(&self) -> &'static str {
        match self {
            InfoFormat::Json => "application/json",
            InfoFormat::Html => "text/html",
            InfoFormat::Text => "text/plain",
        }
    }
}

/// One chart found under the queried point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfo {
    /// Layer the chart was found in (e.g. "gt50k")
    pub layer: String,
    /// Chart name (e.g. "7330_pal300")
    pub name: String,
    pub title: String,
    pub scale_denominator: f64,
    pub edition: String,
    pub last_update: String,
}

/// Geographic location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub longitude: f64,
    pub latitude: f64,
}

/// GetFeatureInfo response container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfoResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub location: Location,
    pub features: Vec<FeatureInfo>,
}

impl FeatureInfoResponse {
    pub fn new(location: Location, features: Vec<FeatureInfo>) -> Self {
        Self {
            response_type: "FeatureInfoResponse".to_string(),
            location,
            features,
        }
    }

    /// Render in the requested format.
    pub fn render(&self, format: InfoFormat) -> WmsResult<String> {
        Ok(match format {
            InfoFormat::Json => self.to_json()?,
            InfoFormat::Html => self.to_html(),
            InfoFormat::Text => self.to_text(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Format as HTML for popup display
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"feature-info\">\n");
        html.push_str(&format!(
            "  <p>{:.5}°, {:.5}°</p>\n",
            self.location.latitude, self.location.longitude
        ));
        if self.features.is_empty() {
            html.push_str("  <p>No chart at this position</p>\n");
        }
        for feature in &self.features {
            html.push_str(&format!(
                "  <h4>{} ({})</h4>\n",
                xml_escape(&feature.name),
                xml_escape(&feature.layer)
            ));
            html.push_str("  <table>\n");
            for (label, value) in [
                ("Title", feature.title.clone()),
                ("Scale", format!("1:{:.0}", feature.scale_denominator)),
                ("Edition", feature.edition.clone()),
                ("Last update", feature.last_update.clone()),
            ] {
                html.push_str(&format!(
                    "    <tr><td>{}:</td><td class=\"value\">{}</td></tr>\n",
                    label,
                    xml_escape(&value)
                ));
            }
            html.push_str("  </table>\n");
        }
        html.push_str("</div>");
        html
    }

    pub fn to_text(&self) -> String {
        let mut text = format!(
            "Location: {:.5}°N, {:.5}°E\n",
            self.location.latitude, self.location.longitude
        );
        for feature in &self.features {
            text.push_str("---\n");
            text.push_str(&format!("Chart: {} ({})\n", feature.name, feature.layer));
            text.push_str(&format!("Title: {}\n", feature.title));
            text.push_str(&format!("Scale: 1:{:.0}\n", feature.scale_denominator));
            text.push_str(&format!("Edition: {}\n", feature.edition));
            text.push_str(&format!("Last update: {}\n", feature.last_update));
        }
        text
    }
}
