//! Projection errors.

use thiserror::Error;

/// Errors raised by coordinate conversions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProjectionError {
    /// Latitude outside the valid domain of the target projection.
    #[error("latitude {lat:.6} outside the valid range ±{max} of {projection}")]
    OutOfRange {
        lat: f64,
        max: f64,
        projection: &'static str,
    },

    /// Coordinate string or value that cannot be interpreted.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
