//! Case-insensitive WMS query parameters.

use std::collections::HashMap;

use wms_common::{WmsError, WmsResult};

/// WMS key/value parameters. Keys are case-insensitive, values are kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct WmsParams {
    values: HashMap<String, String>,
}

impl WmsParams {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating empty values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_uppercase())
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require(&self, key: &str) -> WmsResult<&str> {
        self.get(key)
            .ok_or_else(|| WmsError::MissingParameter(key.to_ascii_uppercase()))
    }

    /// Parse a required unsigned integer.
    pub fn require_u32(&self, key: &str) -> WmsResult<u32> {
        let raw = self.require(key)?;
        raw.trim()
            .parse()
            .map_err(|_| WmsError::invalid(key, format!("'{}' is not a non-negative integer", raw)))
    }

    /// Parse a `TRUE`/`FALSE` flag, `default` when absent.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Comma-separated list, empty items dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Negotiated protocol version, 1.3.0 unless 1.1.x is requested.
    pub fn version(&self) -> &str {
        match self.get("VERSION").or_else(|| self.get("WMTVER")) {
            Some(v) if v.starts_with("1.1") => "1.1.1",
            _ => "1.3.0",
        }
    }

    pub fn operation(&self) -> WmsResult<WmsOperation> {
        WmsOperation::parse(self.require("REQUEST")?)
    }
}

/// The WMS operations served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmsOperation {
    GetCapabilities,
    GetMap,
    GetFeatureInfo,
}

impl WmsOperation {
    pub fn parse(request: &str) -> WmsResult<Self> {
        match request.trim().to_ascii_lowercase().as_str() {
            "getcapabilities" | "capabilities" => Ok(WmsOperation::GetCapabilities),
            "getmap" | "map" => Ok(WmsOperation::GetMap),
            "getfeatureinfo" => Ok(WmsOperation::GetFeatureInfo),
            _ => Err(WmsError::OperationNotSupported(request.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_keys() {
        let params = WmsParams::from_pairs([("request", "GetMap"), ("Layers", "gt50k, gtpyr,")]);
        assert_eq!(params.get("REQUEST"), Some("GetMap"));
        assert_eq!(params.list("LAYERS"), vec!["gt50k", "gtpyr"]);
        assert_eq!(params.operation().unwrap(), WmsOperation::GetMap);
    }

    #[test]
    fn test_missing_and_invalid() {
        let params = WmsParams::from_pairs([("WIDTH", "abc"), ("HEIGHT", "")]);
        assert!(matches!(
            params.require_u32("WIDTH"),
            Err(WmsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            params.require_u32("HEIGHT"),
            Err(WmsError::MissingParameter(p)) if p == "HEIGHT"
        ));
        assert!(matches!(
            params.operation(),
            Err(WmsError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_version_and_flags() {
        let params = WmsParams::from_pairs([("VERSION", "1.1.1"), ("TRANSPARENT", "FALSE")]);
        assert_eq!(params.version(), "1.1.1");
        assert!(!params.flag("TRANSPARENT", true));
        assert!(params.flag("OTHER", true));
        assert_eq!(WmsParams::default().version(), "1.3.0");
    }

    #[test]
    fn test_unknown_operation() {
        assert!(matches!(
            WmsOperation::parse("DescribeLayer"),
            Err(WmsError::OperationNotSupported(_))
        ));
    }
}
