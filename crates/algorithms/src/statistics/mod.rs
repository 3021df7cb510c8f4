//! Statistical analysis of raster data
//!
//! - **region**: Reductions of one raster over an area of interest

pub mod region;

pub use region::{reduce_region, Reducer, RegionParams, RegionStats};
