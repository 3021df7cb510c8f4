//! # urbanheat Core
//!
//! Core types and I/O for the urbanheat thermal-index pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `Image`: Ordered set of named bands sharing one grid
//! - `AreaOfInterest`: The polygon used for filtering, clipping and reductions
//! - `GeoTransform` / `CRS`: Georeferencing
//! - Native GeoTIFF I/O and the imagery source / raster sink seams

pub mod crs;
pub mod error;
pub mod geometry;
pub mod image;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use geometry::{AreaOfInterest, PixelWindow};
pub use image::{Band, Image};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::geometry::AreaOfInterest;
    pub use crate::image::{Band, Image};
    pub use crate::io::{CollectionQuery, ExportReport, ExportRequest, ImagerySource, RasterSink};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
