//! I/O operations for reading and writing geospatial data
//!
//! Besides the native GeoTIFF codec this module defines the two seams the
//! pipeline talks to: an [`ImagerySource`] that answers collection queries
//! and a [`RasterSink`] that persists finished products.

mod native;
mod sink;
mod source;

pub use native::{
    read_geotiff, read_geotiff_image, read_geotiff_image_from_buffer, write_geotiff,
    write_geotiff_image, write_geotiff_image_to_buffer, write_rgba_tiff, GeoTiffOptions,
    SamplePrecision,
};

// Buffer-based I/O (always available, no filesystem dependency)
pub use native::{read_geotiff_from_buffer, write_geotiff_to_buffer};

pub use sink::{
    ExportFormat, ExportReport, ExportRequest, GeoTiffDirectorySink, MemorySink, RasterSink,
};
pub use source::{CollectionQuery, ImagerySource};
