//! Error types surfaced at the protocol boundary.

use thiserror::Error;

/// Result type alias using WmsError.
pub type WmsResult<T> = Result<T, WmsError>;

/// Primary error type for WMS and tile requests.
#[derive(Debug, Error)]
pub enum WmsError {
    // === Client errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown request: {0}")]
    OperationNotSupported(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    /// Latitude outside the valid domain of a projection.
    #[error("Coordinates in '{param}' out of range: {message}")]
    ProjectionRange { param: String, message: String },

    // === Not found ===
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // === Server errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl WmsError {
    /// Get the OGC WMS exception code for this error.
    pub fn wms_exception_code(&self) -> &'static str {
        match self {
            WmsError::MissingParameter(_) => "MissingParameterValue",
            WmsError::InvalidParameter { .. }
            | WmsError::InvalidRequest(_)
            | WmsError::ProjectionRange { .. } => "InvalidParameterValue",
            WmsError::OperationNotSupported(_) => "OperationNotSupported",
            WmsError::InvalidCrs(_) => "InvalidCRS",
            WmsError::InvalidBbox(_) => "InvalidBBox",
            WmsError::UnsupportedFormat(_) => "InvalidFormat",
            WmsError::LayerNotFound(_) => "LayerNotDefined",
            _ => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WmsError::MissingParameter(_)
            | WmsError::InvalidParameter { .. }
            | WmsError::InvalidRequest(_)
            | WmsError::OperationNotSupported(_)
            | WmsError::InvalidCrs(_)
            | WmsError::InvalidBbox(_)
            | WmsError::UnsupportedFormat(_)
            | WmsError::ProjectionRange { .. } => 400,

            WmsError::LayerNotFound(_) | WmsError::NotFound(_) => 404,

            _ => 500,
        }
    }

    /// Shorthand for `InvalidParameter`.
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        WmsError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for WmsError {
    fn from(err: std::io::Error) -> Self {
        WmsError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for WmsError {
    fn from(err: serde_json::Error) -> Self {
        WmsError::InternalError(format!("JSON error: {}", err))
    }
}
