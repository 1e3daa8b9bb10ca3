//! WMS service exception documents.

use wms_common::WmsError;

/// Escape the five XML special characters.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// ServiceExceptionReport for `err`, in the shape expected by `version`.
pub fn service_exception(err: &WmsError, version: &str) -> String {
    let locator = match err {
        WmsError::MissingParameter(p) => Some(p.as_str()),
        WmsError::InvalidParameter { param, .. } | WmsError::ProjectionRange { param, .. } => {
            Some(param.as_str())
        }
        _ => None,
    };
    let locator = locator
        .map(|l| format!(r#" locator="{}""#, xml_escape(l)))
        .unwrap_or_default();
    let namespace = if version == "1.3.0" {
        r#" xmlns="http://www.opengis.net/ogc""#
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ServiceExceptionReport version="{}"{}><ServiceException code="{}"{}>{}</ServiceException></ServiceExceptionReport>"#,
        version,
        namespace,
        err.wms_exception_code(),
        locator,
        xml_escape(&err.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(xml_escape(r#"a<b & "c">'"#), "a&lt;b &amp; &quot;c&quot;&gt;&apos;");
    }

    #[test]
    fn test_exception_document() {
        let xml = service_exception(&WmsError::MissingParameter("BBOX".into()), "1.3.0");
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains(r#"code="MissingParameterValue""#));
        assert!(xml.contains(r#"locator="BBOX""#));
        assert!(xml.contains("http://www.opengis.net/ogc"));
    }

    #[test]
    fn test_projection_range_names_parameter() {
        let err = WmsError::ProjectionRange {
            param: "BBOX".into(),
            message: "latitude 95 > 90".into(),
        };
        let xml = service_exception(&err, "1.1.1");
        assert!(xml.contains("InvalidParameterValue"));
        assert!(xml.contains("BBOX"));
        assert!(xml.contains("latitude 95 &gt; 90"));
    }
}
