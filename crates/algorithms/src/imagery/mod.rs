//! Imagery algorithms
//!
//! - Scale factors: digital numbers to reflectance and brightness temperature
//! - Composite: per-pixel temporal median
//! - Band math: element-wise raster algebra
//! - Indices: normalized difference, NDVI
//! - Thermal: vegetation fraction, emissivity, LST, UHI, UTFVI

mod band_math;
mod composite;
mod indices;
mod scaling;
mod thermal;

pub use band_math::{band_math, band_math_binary, band_math_zip, BandMathOp};
pub use composite::median_composite;
pub use indices::{ndvi, normalized_difference};
pub use scaling::{
    apply_scale_factors, scale_band, LinearScale, ScaleFactors, REFLECTANCE_SCALE, THERMAL_SCALE,
};
pub use thermal::{
    emissivity, land_surface_temperature, urban_heat_island, utfvi, vegetation_fraction,
    EMISSIVITY_INTERCEPT, EMISSIVITY_SLOPE, KELVIN_OFFSET, LST_RHO_FACTOR, LST_WAVELENGTH_FACTOR,
};
