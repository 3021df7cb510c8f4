//! Band math operations
//!
//! Raster algebra: apply a function to one or two rasters element-wise.
//! Undefined input pixels give undefined output pixels, and so does any
//! non-finite result.

use crate::maybe_rayon::*;
use urbanheat_core::raster::Raster;
use urbanheat_core::{Error, Result};

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
}

/// Apply a unary function to every defined cell of a raster.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&dn, |v| v * 0.0000275 - 0.2)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let val = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(val) {
                    continue;
                }
                row_data[col] = defined(f(val));
            }
            row_data
        })
        .collect();

    raster.derive(data, Some(f64::NAN))
}

/// Combine two rasters cell by cell with `f`.
///
/// Both rasters must have the same shape. The output takes the grid of `a`.
pub fn band_math_zip<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    check_dimensions(a, b)?;
    let (rows, cols) = a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };
                if a.is_nodata(va) || b.is_nodata(vb) {
                    continue;
                }
                row_data[col] = defined(f(va, vb));
            }
            row_data
        })
        .collect();

    a.derive(data, Some(f64::NAN))
}

/// Apply a binary operation between two rasters element-wise.
///
/// Division by zero yields an undefined cell.
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    band_math_zip(a, b, |va, vb| match op {
        BandMathOp::Add => va + vb,
        BandMathOp::Subtract => va - vb,
        BandMathOp::Multiply => va * vb,
        BandMathOp::Divide => {
            if vb == 0.0 {
                f64::NAN
            } else {
                va / vb
            }
        }
        BandMathOp::Min => va.min(vb),
        BandMathOp::Max => va.max(vb),
    })
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Raster of the same grid with every cell undefined
pub(crate) fn undefined_like(template: &Raster<f64>) -> Result<Raster<f64>> {
    template.derive(vec![f64::NAN; template.len()], Some(f64::NAN))
}

#[inline]
fn defined(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use urbanheat_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, value);
        r.set_transform(GeoTransform::new(0.0, 150.0, 30.0, -30.0));
        r
    }

    #[test]
    fn test_band_math_scale() {
        let input = make_band(10000.0);
        let result = band_math(&input, |v| v * 0.0000275 - 0.2).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.075, epsilon = 1e-12);
        assert!(result.nodata().unwrap().is_nan());
        assert_eq!(result.transform(), input.transform());
    }

    #[test]
    fn test_band_math_preserves_nan_and_nodata() {
        let mut input = make_band(100.0);
        input.set(2, 2, f64::NAN).unwrap();
        input.set(0, 0, 0.0).unwrap();
        input.set_nodata(Some(0.0));

        let result = band_math(&input, |v| v * 2.0).unwrap();
        assert_eq!(result.value(2, 2).unwrap(), None);
        assert_eq!(result.value(0, 0).unwrap(), None);
        assert_eq!(result.value(1, 1).unwrap(), Some(200.0));
    }

    #[test]
    fn test_non_finite_result_is_undefined() {
        let input = make_band(-1.0);
        let result = band_math(&input, f64::ln).unwrap();
        assert_eq!(result.value(0, 0).unwrap(), None);
    }

    #[test]
    fn test_band_math_binary_ops() {
        let a = make_band(3.0);
        let b = make_band(7.0);

        let add = band_math_binary(&a, &b, BandMathOp::Add).unwrap();
        assert_relative_eq!(add.get(2, 2).unwrap(), 10.0);

        let min = band_math_binary(&a, &b, BandMathOp::Min).unwrap();
        assert_relative_eq!(min.get(2, 2).unwrap(), 3.0);

        let max = band_math_binary(&a, &b, BandMathOp::Max).unwrap();
        assert_relative_eq!(max.get(2, 2).unwrap(), 7.0);
    }

    #[test]
    fn test_band_math_binary_divide_by_zero() {
        let a = make_band(10.0);
        let b = make_band(0.0);

        let result = band_math_binary(&a, &b, BandMathOp::Divide).unwrap();
        assert_eq!(result.value(2, 2).unwrap(), None);
    }

    #[test]
    fn test_zip_rejects_shape_mismatch() {
        let a = make_band(1.0);
        let b = Raster::filled(4, 5, 1.0);
        assert!(matches!(
            band_math_zip(&a, &b, |x, y| x + y),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
