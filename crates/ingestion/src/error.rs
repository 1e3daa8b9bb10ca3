//! Error types for the ingestion crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during ingestion. Within the tiling pipeline each
/// one is confined to the chart it happened on.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No source raster for chart {0}")]
    SourceNotFound(String),

    #[error("Failed to decode or encode {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error("Raster {name} is {actual_width}x{actual_height}, catalog says {width}x{height}")]
    SizeMismatch {
        name: String,
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Chart {name} is not georeferenced")]
    NotGeoreferenced { name: String },

    #[error("Invalid erasure zone in {name}: {message}")]
    InvalidZone { name: String, message: String },

    #[error("Invalid chart index: {0}")]
    InvalidIndex(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Projection(#[from] projection::ProjectionError),
}

impl IngestionError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IngestionError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
