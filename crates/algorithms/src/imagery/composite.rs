//! Temporal median composite

use crate::maybe_rayon::*;
use urbanheat_core::image::{Band, Image};
use urbanheat_core::raster::Raster;
use urbanheat_core::{Error, Result};

/// Per-band, per-pixel median over a stack of images.
///
/// Undefined samples are skipped. With an even number of defined samples
/// the result is the mean of the two middle values; with none it is
/// undefined. Samples are sorted before selection, so the result does not
/// depend on image order.
///
/// The output has the band order, transform and CRS of the first image.
/// Every image must carry every band of the first image, at the same shape.
pub fn median_composite(images: &[Image]) -> Result<Image> {
    let first = images.first().ok_or_else(|| Error::EmptyCollection {
        collection: "median composite input".to_string(),
    })?;
    let (er, ec) = first.shape();

    let bands = first
        .band_names()
        .into_iter()
        .map(|name| {
            let stack = images
                .iter()
                .map(|img| {
                    let raster = img.band(name)?;
                    let (ar, ac) = raster.shape();
                    if (ar, ac) != (er, ec) {
                        return Err(Error::SizeMismatch { er, ec, ar, ac });
                    }
                    Ok(raster)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Band::new(name, median_of_stack(&stack)?))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Image::new(bands)?.with_id(format!("median of {} images", images.len())))
}

fn median_of_stack(stack: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let template = stack[0];
    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut samples = Vec::with_capacity(stack.len());
            for col in 0..cols {
                samples.clear();
                samples.extend(stack.iter().filter_map(|r| {
                    let v = unsafe { r.get_unchecked(row, col) };
                    (!r.is_nodata(v)).then_some(v)
                }));
                if let Some(m) = median(&mut samples) {
                    row_data[col] = m;
                }
            }
            row_data
        })
        .collect();

    template.derive(data, Some(f64::NAN))
}

fn median(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    })
}
