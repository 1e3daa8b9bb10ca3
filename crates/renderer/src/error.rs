//! Rendering errors.

use projection::ProjectionError;
use storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Font error: {0}")]
    Font(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}
