//! Degree/minute position strings as printed on charts and in notices.
//!
//! Accepted form: `"47°30.00'N - 3°10.50'W"`. The degree sign and the minute
//! quote may be replaced by spaces; minutes are optional.

use crate::error::{ProjectionError, Result};

/// Parse a "lat - lon" degree/minute position into (lon, lat) degrees.
pub fn parse_dm_position(s: &str) -> Result<(f64, f64)> {
    let (lat_part, lon_part) = s
        .split_once(" - ")
        .ok_or_else(|| ProjectionError::InvalidCoordinate(s.to_string()))?;

    let lat = parse_dm_component(lat_part, 'N', 'S')?;
    let lon = parse_dm_component(lon_part, 'E', 'W')?;
    if lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(ProjectionError::InvalidCoordinate(s.to_string()));
    }
    Ok((lon, lat))
}

fn parse_dm_component(part: &str, positive: char, negative: char) -> Result<f64> {
    let invalid = || ProjectionError::InvalidCoordinate(part.to_string());
    let trimmed = part.trim();
    let hemisphere = trimmed.chars().last().ok_or_else(invalid)?;
    let sign = if hemisphere == positive {
        1.0
    } else if hemisphere == negative {
        -1.0
    } else {
        return Err(invalid());
    };

    let body: String = trimmed[..trimmed.len() - hemisphere.len_utf8()]
        .chars()
        .map(|c| if c == '°' || c == '\'' || c == '′' { ' ' } else { c })
        .collect();
    let mut fields = body.split_whitespace();

    let degrees: f64 = fields
        .next()
        .ok_or_else(invalid)?
        .parse()
        .map_err(|_| invalid())?;
    let minutes: f64 = match fields.next() {
        Some(m) => m.parse().map_err(|_| invalid())?,
        None => 0.0,
    };
    if fields.next().is_some() || !(0.0..60.0).contains(&minutes) || degrees < 0.0 {
        return Err(invalid());
    }

    Ok(sign * (degrees + minutes / 60.0))
}
