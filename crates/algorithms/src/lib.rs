//! # urbanheat Algorithms
//!
//! Pixel kernels and reductions for the land-surface-temperature chain.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: Scale factors, median composite, band math, NDVI,
//!   vegetation fraction, emissivity, LST, UHI and UTFVI
//! - **statistics**: Region reductions (count, min, max, mean, stddev)

pub mod imagery;
pub mod statistics;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        apply_scale_factors, band_math, band_math_binary, band_math_zip, emissivity,
        land_surface_temperature, median_composite, ndvi, normalized_difference,
        urban_heat_island, utfvi, vegetation_fraction, BandMathOp, LinearScale, ScaleFactors,
    };
    pub use crate::statistics::{reduce_region, Reducer, RegionParams, RegionStats};
    pub use urbanheat_core::prelude::*;
}
