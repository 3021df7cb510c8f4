//! Error types for urbanheat

use thiserror::Error;

/// Main error type for urbanheat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Band not found: {0}")]
    MissingBand(String),

    #[error("Image collection '{collection}' is empty after filtering")]
    EmptyCollection { collection: String },

    #[error("Region covers ~{pixels} pixels, more than the configured maximum of {max_pixels}")]
    PixelLimitExceeded { pixels: u64, max_pixels: u64 },

    #[error("No valid pixels of '{band}' inside the area of interest")]
    NoValidPixels { band: String },

    #[error("Invalid geometry: {0}")]
    Geometry(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Export of '{name}' failed: {reason}")]
    Export { name: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for urbanheat operations
pub type Result<T> = std::result::Result<T, Error>;
