//! # urbanheat Pipeline
//!
//! Land surface temperature and urban heat indices over an area of
//! interest, from an [`ImagerySource`](urbanheat_core::io::ImagerySource)
//! to a [`RasterSink`](urbanheat_core::io::RasterSink):
//!
//! 1. filter the collection by date and region
//! 2. scale to reflectance and kelvin, median composite, clip
//! 3. NDVI, vegetation fraction, emissivity, LST
//! 4. regional LST statistics, UHI and UTFVI
//! 5. display layers and GeoTIFF exports

pub mod config;
pub mod export;
pub mod layers;
pub mod stages;

pub use config::{BandNames, ExportNames, PipelineConfig};
pub use export::{export_jobs, export_outputs, ExportJob};
pub use layers::map_layers;
pub use stages::{build_composite, run_pipeline, PipelineOutput, RunSummary};
