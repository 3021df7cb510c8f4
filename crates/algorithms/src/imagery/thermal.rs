//! Thermal indices
//!
//! Vegetation fraction and emissivity from NDVI, single-channel land
//! surface temperature from brightness temperature, and the two
//! normalizations of LST against its regional statistics:
//!
//! ```text
//! FV    = ((NDVI - NDVI_min) / (NDVI_max - NDVI_min))^2
//! EM    = FV * 0.004 + 0.986
//! LST   = TB / (1 + (0.00115 * TB / 0.48359547432) * ln(EM)) - 273.15
//! UHI   = (LST - LST_mean) / LST_std
//! UTFVI = (LST - LST_mean) / LST
//! ```

use super::band_math::{band_math, band_math_zip, undefined_like};
use urbanheat_core::raster::Raster;
use urbanheat_core::{Error, Result};

/// Emissivity per unit of vegetation fraction
pub const EMISSIVITY_SLOPE: f64 = 0.004;
/// Emissivity of a surface with no vegetation
pub const EMISSIVITY_INTERCEPT: f64 = 0.986;
/// Wavelength term of the LST correction
pub const LST_WAVELENGTH_FACTOR: f64 = 0.00115;
/// Divisor of the brightness temperature in the LST correction
pub const LST_RHO_FACTOR: f64 = 0.48359547432;
/// Kelvin to degrees Celsius
pub const KELVIN_OFFSET: f64 = 273.15;

/// Fractional vegetation cover from NDVI and its regional extremes.
///
/// When `ndvi_max == ndvi_min` the fraction is not defined anywhere and
/// every output cell is undefined.
pub fn vegetation_fraction(ndvi: &Raster<f64>, ndvi_min: f64, ndvi_max: f64) -> Result<Raster<f64>> {
    require_finite("ndvi_min", ndvi_min)?;
    require_finite("ndvi_max", ndvi_max)?;
    if ndvi_max < ndvi_min {
        return Err(Error::InvalidParameter {
            name: "ndvi_max",
            value: ndvi_max.to_string(),
            reason: format!("smaller than ndvi_min {}", ndvi_min),
        });
    }
    if ndvi_max == ndvi_min {
        return undefined_like(ndvi);
    }

    let range = ndvi_max - ndvi_min;
    band_math(ndvi, |v| ((v - ndvi_min) / range).powi(2))
}

/// Land surface emissivity from vegetation fraction
pub fn emissivity(fv: &Raster<f64>) -> Result<Raster<f64>> {
    band_math(fv, |f| f * EMISSIVITY_SLOPE + EMISSIVITY_INTERCEPT)
}

/// Land surface temperature in degrees Celsius.
///
/// `tb` is brightness temperature in kelvin, `em` the emissivity. Cells
/// with `EM <= 0`, a zero denominator or a non-finite result are undefined.
pub fn land_surface_temperature(tb: &Raster<f64>, em: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_zip(tb, em, |t, e| {
        if e <= 0.0 {
            return f64::NAN;
        }
        let denominator = 1.0 + (LST_WAVELENGTH_FACTOR * (t / LST_RHO_FACTOR)) * e.ln();
        if denominator == 0.0 {
            return f64::NAN;
        }
        (t / denominator) - KELVIN_OFFSET
    })
}

/// Urban heat island index: LST standardized by its regional mean and
/// standard deviation. A zero deviation leaves every cell undefined.
pub fn urban_heat_island(lst: &Raster<f64>, lst_mean: f64, lst_std: f64) -> Result<Raster<f64>> {
    require_finite("lst_mean", lst_mean)?;
    require_finite("lst_std", lst_std)?;
    if lst_std == 0.0 {
        return undefined_like(lst);
    }
    band_math(lst, |t| (t - lst_mean) / lst_std)
}

/// Urban thermal field variance index.
///
/// The denominator is the cell's own LST; cells where it is zero are
/// undefined.
pub fn utfvi(lst: &Raster<f64>, lst_mean: f64) -> Result<Raster<f64>> {
    require_finite("lst_mean", lst_mean)?;
    band_math(lst, |t| if t == 0.0 { f64::NAN } else { (t - lst_mean) / t })
}

fn require_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "must be finite".into(),
        })
    }
}
