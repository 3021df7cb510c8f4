//! Spectral indices
//!
//! Landsat 8/9 OLI band mapping: NIR = `SR_B5`, Red = `SR_B4`.

use super::band_math::band_math_zip;
use urbanheat_core::raster::Raster;
use urbanheat_core::Result;

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// No clamping is applied. Cells where the sum is exactly zero, or where
/// either band is undefined, are undefined.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_zip(band_a, band_b, |a, b| {
        let sum = a + b;
        if sum == 0.0 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    })
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1 for non-negative reflectances:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil and built-up surfaces: 0.0 to 0.2
/// - Water: below 0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use urbanheat_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 30.0, 30.0, -30.0));
        r
    }

    #[test]
    fn test_ndvi_uniform() {
        let nir = make_band(2, 2, 0.3);
        let red = make_band(2, 2, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        for row in 0..2 {
            for col in 0..2 {
                assert_relative_eq!(result.get(row, col).unwrap(), 0.5, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_zero_sum_is_undefined() {
        let nir = make_band(3, 3, 0.0);
        let red = make_band(3, 3, 0.0);
        let result = ndvi(&nir, &red).unwrap();
        assert_eq!(result.value(1, 1).unwrap(), None);
    }

    #[test]
    fn test_undefined_input_propagates() {
        let mut nir = make_band(3, 3, 0.4);
        nir.set(0, 1, f64::NAN).unwrap();
        let red = make_band(3, 3, 0.2);

        let result = ndvi(&nir, &red).unwrap();
        assert_eq!(result.value(0, 1).unwrap(), None);
        assert!(result.value(0, 0).unwrap().is_some());
    }

    #[test]
    fn test_ndvi_in_unit_range_for_reflectances() {
        let mut nir = Raster::new(4, 4);
        let mut red = Raster::new(4, 4);
        for i in 0..16 {
            let (row, col) = (i / 4, i % 4);
            nir.set(row, col, i as f64 * 0.05).unwrap();
            red.set(row, col, (15 - i) as f64 * 0.03).unwrap();
        }
        let result = ndvi(&nir, &red).unwrap();
        for v in result.valid_values() {
            assert!((-1.0..=1.0).contains(&v), "NDVI {} out of range", v);
        }
    }
}
