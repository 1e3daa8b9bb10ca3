//! Storage error types.

use std::path::PathBuf;

use projection::ProjectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Neither the catalog document nor its binary cache could be read.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog document error: {0}")]
    Document(String),

    #[error("Invalid catalog entry {name}: {message}")]
    InvalidEntry { name: String, message: String },

    #[error("Catalog cache error: {0}")]
    CacheFormat(String),

    #[error("Image error on {path}: {message}")]
    Image { path: PathBuf, message: String },

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_entry(name: &str, message: impl Into<String>) -> Self {
        StorageError::InvalidEntry {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
