//! XYZ tile path parsing: `/{layer}/{z}/{x}/{y}.png`.

use wms_common::{TileCoord, WmsError, WmsResult};

/// A parsed tile path. Whether the layer exists is for the caller to decide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePath {
    pub layer: String,
    pub coord: TileCoord,
}

impl TilePath {
    /// Parse a tile path, with or without leading slash.
    ///
    /// ```
    /// use wms_protocol::TilePath;
    ///
    /// let path = TilePath::parse("/gt50k/12/2048/1365.png").unwrap();
    /// assert_eq!(path.layer, "gt50k");
    /// assert_eq!((path.coord.z, path.coord.x, path.coord.y), (12, 2048, 1365));
    /// ```
    pub fn parse(path: &str) -> WmsResult<Self> {
        let malformed = || WmsError::InvalidRequest(format!("malformed tile path '{}'", path));

        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        let [layer, z, x, file] = parts.as_slice() else {
            return Err(malformed());
        };
        let y = file.strip_suffix(".png").ok_or_else(malformed)?;
        if layer.is_empty() {
            return Err(malformed());
        }

        let number = |s: &str| s.parse::<u32>().map_err(|_| malformed());
        let coord = TileCoord::new(number(z)?, number(x)?, number(y)?);
        if !coord.is_valid() {
            return Err(WmsError::InvalidRequest(format!(
                "tile {}/{}/{} is outside the tile matrix",
                coord.z, coord.x, coord.y
            )));
        }

        Ok(Self {
            layer: layer.to_string(),
            coord,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let path = TilePath::parse("gtpyr/0/0/0.png").unwrap();
        assert_eq!(path.layer, "gtpyr");
        assert_eq!(path.coord, TileCoord::new(0, 0, 0));
    }

    #[test]
    fn test_parse_malformed() {
        for bad in [
            "/bogus/x/y/z.png",
            "/gt50k/12/2048/1365.jpg",
            "/gt50k/12/2048",
            "/gt50k/12/2048/1365/extra.png",
            "//12/0/0.png",
            "/gt50k/-1/0/0.png",
        ] {
            let err = TilePath::parse(bad).unwrap_err();
            assert!(matches!(err, WmsError::InvalidRequest(_)), "{}", bad);
            assert_eq!(err.http_status_code(), 400);
        }
    }

    #[test]
    fn test_parse_out_of_matrix() {
        assert!(matches!(
            TilePath::parse("/gtpyr/2/4/0.png"),
            Err(WmsError::InvalidRequest(_))
        ));
        assert!(matches!(
            TilePath::parse("/gtpyr/40/0/0.png"),
            Err(WmsError::InvalidRequest(_))
        ));
    }
}
