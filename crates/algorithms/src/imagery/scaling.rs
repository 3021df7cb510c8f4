//! Radiometric scale factors
//!
//! Landsat Collection 2 Level-2 products store surface reflectance and
//! surface temperature as integers. A linear transform per band family
//! turns them into physical units.

use super::band_math::band_math;
use serde::{Deserialize, Serialize};
use urbanheat_core::image::{Band, Image};
use urbanheat_core::raster::Raster;
use urbanheat_core::Result;

/// `value * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub scale: f64,
    pub offset: f64,
}

impl LinearScale {
    pub const fn new(scale: f64, offset: f64) -> Self {
        Self { scale, offset }
    }

    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }
}

/// Collection 2 Level-2 surface reflectance (`SR_B*`)
pub const REFLECTANCE_SCALE: LinearScale = LinearScale::new(0.0000275, -0.2);

/// Collection 2 Level-2 surface temperature (`ST_B10`), to kelvin
pub const THERMAL_SCALE: LinearScale = LinearScale::new(0.00341802, 149.0);

/// Which bands get which linear scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub reflectance: LinearScale,
    pub thermal: LinearScale,
    pub reflectance_bands: Vec<String>,
    pub thermal_bands: Vec<String>,
}

impl ScaleFactors {
    /// Landsat 8/9 Collection 2 Level-2: `SR_B1..SR_B7` and `ST_B10`
    pub fn landsat_c2_l2() -> Self {
        Self {
            reflectance: REFLECTANCE_SCALE,
            thermal: THERMAL_SCALE,
            reflectance_bands: (1..=7).map(|i| format!("SR_B{}", i)).collect(),
            thermal_bands: vec!["ST_B10".to_string()],
        }
    }

    /// (band name, scale) for every band this table touches
    pub fn entries(&self) -> impl Iterator<Item = (&str, LinearScale)> + '_ {
        let reflectance = self
            .reflectance_bands
            .iter()
            .map(move |b| (b.as_str(), self.reflectance));
        let thermal = self
            .thermal_bands
            .iter()
            .map(move |b| (b.as_str(), self.thermal));
        reflectance.chain(thermal)
    }
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self::landsat_c2_l2()
    }
}

/// Apply one linear scale to a band. Undefined cells stay undefined.
pub fn scale_band(raster: &Raster<f64>, scale: LinearScale) -> Result<Raster<f64>> {
    band_math(raster, move |v| scale.apply(v))
}

/// Scale the listed bands of `image`.
///
/// The scaled bands replace their originals in place; bands the table does
/// not list (QA bands, for instance) pass through unchanged. A listed band
/// that the image lacks is a `MissingBand` error.
pub fn apply_scale_factors(image: &Image, factors: &ScaleFactors) -> Result<Image> {
    let scaled = factors
        .entries()
        .map(|(name, scale)| Ok(Band::new(name, scale_band(image.band(name)?, scale)?)))
        .collect::<Result<Vec<_>>>()?;

    image.add_bands(&Image::new(scaled)?, true)
}
