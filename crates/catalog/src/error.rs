//! Error types for the local catalog.

use thiserror::Error;

/// Errors produced while reading a catalog or loading its assets.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("item {item}: invalid datetime '{value}'")]
    InvalidDatetime { item: String, value: String },

    #[error("item {item} has no GeoTIFF assets")]
    NoBands { item: String },

    #[error("item {item} is not on the grid of item {reference}")]
    GridMismatch { item: String, reference: String },

    #[error("core error: {0}")]
    Core(#[from] urbanheat_core::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for urbanheat_core::Error {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Core(inner) => inner,
            CatalogError::Io(inner) => urbanheat_core::Error::Io(inner),
            other => urbanheat_core::Error::Other(format!("catalog: {}", other)),
        }
    }
}
