//! WMS GetMap request parsing and validation.

use wms_common::{AxisOrder, BoundingBox, CrsCode, WmsError, WmsResult};

use crate::convert::to_world_box;
use crate::params::WmsParams;

/// Smallest accepted WIDTH/HEIGHT.
pub const MIN_SIZE: u32 = 100;
/// Largest accepted WIDTH/HEIGHT.
pub const MAX_SIZE: u32 = 2048;

/// Output formats a GetMap may ask for.
pub const SUPPORTED_FORMATS: [&str; 2] = ["image/png", "image/jpeg"];

/// A validated GetMap request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMapRequest {
    pub version: String,
    pub layers: Vec<String>,
    pub crs: CrsCode,
    /// BBOX as sent, already swapped to x/y order.
    pub bbox: BoundingBox,
    /// BBOX in World Mercator meters.
    pub world_box: BoundingBox,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub transparent: bool,
    pub bgcolor: Option<String>,
}

impl GetMapRequest {
    /// Validate the parameters of a GetMap. Size is checked before the box
    /// so an oversized request fails without any projection work.
    pub fn from_params(params: &WmsParams) -> WmsResult<Self> {
        params.require("VERSION")?;
        let version = params.version().to_string();

        let layers = params.list("LAYERS");
        if layers.is_empty() {
            return Err(WmsError::MissingParameter("LAYERS".to_string()));
        }

        let width = checked_size(params, "WIDTH")?;
        let height = checked_size(params, "HEIGHT")?;

        let format = params.require("FORMAT")?.trim().to_ascii_lowercase();
        if !SUPPORTED_FORMATS.contains(&format.as_str()) {
            return Err(WmsError::UnsupportedFormat(format));
        }

        let crs = parse_crs(params, &version)?;
        let bbox = parse_bbox(params, crs, &version)?;
        let world_box = to_world_box(&bbox, crs, "BBOX")?;

        Ok(Self {
            version,
            layers,
            crs,
            bbox,
            world_box,
            width,
            height,
            format,
            transparent: params.flag("TRANSPARENT", true),
            bgcolor: params.get("BGCOLOR").map(String::from),
        })
    }
}

fn checked_size(params: &WmsParams, key: &str) -> WmsResult<u32> {
    let value = params.require_u32(key)?;
    if !(MIN_SIZE..=MAX_SIZE).contains(&value) {
        return Err(WmsError::invalid(
            key,
            format!("{} must be between {} and {}, got {}", key, MIN_SIZE, MAX_SIZE, value),
        ));
    }
    Ok(value)
}

/// CRS (1.3.0) or SRS (1.1.1), whichever the version names.
pub fn parse_crs(params: &WmsParams, version: &str) -> WmsResult<CrsCode> {
    let key = if version == "1.3.0" { "CRS" } else { "SRS" };
    let raw = params.require(key)?;
    CrsCode::from_wms_string(raw).map_err(|e| WmsError::InvalidCrs(e.to_string()))
}

/// BBOX in x/y order for `crs`.
pub fn parse_bbox(params: &WmsParams, crs: CrsCode, version: &str) -> WmsResult<BoundingBox> {
    let raw = params.require("BBOX")?;
    let bbox = BoundingBox::from_wms_string(raw).map_err(|e| WmsError::InvalidBbox(e.to_string()))?;
    Ok(match crs.axis_order(version) {
        AxisOrder::LatLon => BoundingBox::new(bbox.min_y, bbox.min_x, bbox.max_y, bbox.max_x),
        AxisOrder::XY => bbox,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("SERVICE", "WMS"),
            ("REQUEST", "GetMap"),
            ("VERSION", "1.3.0"),
            ("LAYERS", "gt50k"),
            ("STYLES", ""),
            ("CRS", "EPSG:4326"),
            ("BBOX", "48.2,-4.8,48.5,-4.3"),
            ("WIDTH", "512"),
            ("HEIGHT", "256"),
            ("FORMAT", "image/png"),
        ]
    }

    fn with(overrides: &[(&'static str, &'static str)]) -> WmsParams {
        let mut pairs = base();
        for (k, v) in overrides {
            pairs.retain(|(key, _)| key != k);
            pairs.push((k, v));
        }
        WmsParams::from_pairs(pairs)
    }

    #[test]
    fn test_valid_request_swaps_axes() {
        let req = GetMapRequest::from_params(&with(&[])).unwrap();
        assert_eq!(req.layers, vec!["gt50k"]);
        assert_eq!(req.bbox, BoundingBox::new(-4.8, 48.2, -4.3, 48.5));
        assert!(req.world_box.min_x < req.world_box.max_x);
        assert!(req.transparent);
        assert_eq!((req.width, req.height), (512, 256));
    }

    #[test]
    fn test_version_111_uses_srs_and_xy() {
        let params = WmsParams::from_pairs([
            ("VERSION", "1.1.1"),
            ("LAYERS", "gtpyr"),
            ("SRS", "EPSG:4326"),
            ("BBOX", "-4.8,48.2,-4.3,48.5"),
            ("WIDTH", "256"),
            ("HEIGHT", "256"),
            ("FORMAT", "image/jpeg"),
        ]);
        let req = GetMapRequest::from_params(&params).unwrap();
        assert_eq!(req.bbox, BoundingBox::new(-4.8, 48.2, -4.3, 48.5));
        assert_eq!(req.format, "image/jpeg");
    }

    #[test]
    fn test_width_out_of_range() {
        for w in ["5000", "99"] {
            let err = GetMapRequest::from_params(&with(&[("WIDTH", w)])).unwrap_err();
            assert!(matches!(err, WmsError::InvalidParameter { ref param, .. } if param == "WIDTH"));
            assert_eq!(err.http_status_code(), 400);
        }
    }

    #[test]
    fn test_size_checked_before_bbox() {
        let err = GetMapRequest::from_params(&with(&[("WIDTH", "5000"), ("BBOX", "95,0,96,1")]))
            .unwrap_err();
        assert!(matches!(err, WmsError::InvalidParameter { .. }));
    }

    #[test]
    fn test_missing_parameters() {
        for key in ["VERSION", "LAYERS", "BBOX", "WIDTH", "HEIGHT", "FORMAT", "CRS"] {
            let pairs: Vec<_> = base().into_iter().filter(|(k, _)| *k != key).collect();
            let err = GetMapRequest::from_params(&WmsParams::from_pairs(pairs)).unwrap_err();
            assert!(
                matches!(err, WmsError::MissingParameter(ref p) if p == key),
                "{} gave {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_unsupported_crs_and_format() {
        let err = GetMapRequest::from_params(&with(&[("CRS", "EPSG:2154")])).unwrap_err();
        assert!(matches!(err, WmsError::InvalidCrs(_)));
        assert_eq!(err.http_status_code(), 400);

        let err = GetMapRequest::from_params(&with(&[("FORMAT", "image/gif")])).unwrap_err();
        assert!(matches!(err, WmsError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_latitude_beyond_90() {
        let err = GetMapRequest::from_params(&with(&[("BBOX", "47,-5,95,-4")])).unwrap_err();
        assert!(matches!(err, WmsError::ProjectionRange { ref param, .. } if param == "BBOX"));
    }

    #[test]
    fn test_transparent_and_bgcolor() {
        let req = GetMapRequest::from_params(&with(&[
            ("TRANSPARENT", "FALSE"),
            ("BGCOLOR", "0x336699"),
        ]))
        .unwrap();
        assert!(!req.transparent);
        assert_eq!(req.bgcolor.as_deref(), Some("0x336699"));
    }
}
