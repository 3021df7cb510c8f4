//! Region reductions
//!
//! Summarizes the defined pixels of a raster whose centers fall inside an
//! [`AreaOfInterest`]. One pass produces every statistic: rows are reduced
//! in parallel with Welford's update and the per-row partials are merged
//! in row order with Chan's pairwise formula, so results do not depend on
//! thread scheduling.

use crate::maybe_rayon::*;
use serde::{Deserialize, Serialize};
use urbanheat_core::geometry::AreaOfInterest;
use urbanheat_core::raster::Raster;
use urbanheat_core::{Error, Result};

/// Statistic selectable from a [`RegionStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    Count,
    Min,
    Max,
    Mean,
    /// Sample standard deviation (n - 1 denominator)
    StdDev,
}

impl Reducer {
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Count => "count",
            Reducer::Min => "min",
            Reducer::Max => "max",
            Reducer::Mean => "mean",
            Reducer::StdDev => "stdDev",
        }
    }
}

/// Parameters for [`reduce_region`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionParams {
    /// Pixel size the reduction runs at; must equal the raster cell size
    pub scale: f64,
    /// Refuse regions whose estimated pixel count exceeds this
    pub max_pixels: u64,
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            scale: 30.0,
            max_pixels: 1_000_000_000,
        }
    }
}

/// Result of a region reduction. Statistics are `None` when no pixel (or,
/// for the standard deviation, fewer than two pixels) contributed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RegionStats {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

impl RegionStats {
    pub fn get(&self, reducer: Reducer) -> Option<f64> {
        match reducer {
            Reducer::Count => Some(self.count as f64),
            Reducer::Min => self.min,
            Reducer::Max => self.max,
            Reducer::Mean => self.mean,
            Reducer::StdDev => self.std_dev,
        }
    }

    /// Statistic that downstream band math depends on.
    ///
    /// A missing value means the band had no usable pixels in the region,
    /// reported as `NoValidPixels { band }`.
    pub fn require(&self, reducer: Reducer, band: &str) -> Result<f64> {
        self.get(reducer).ok_or_else(|| Error::NoValidPixels {
            band: format!("{} ({})", band, reducer.name()),
        })
    }
}

/// Reduce the defined pixels of `raster` inside `aoi`.
///
/// Fails with `PixelLimitExceeded` when the region would need more than
/// `params.max_pixels` pixels at `params.scale`, checked before any pixel
/// is read, and with `InvalidParameter` when `params.scale` differs from
/// the raster's cell size.
pub fn reduce_region(
    raster: &Raster<f64>,
    aoi: &AreaOfInterest,
    params: RegionParams,
) -> Result<RegionStats> {
    aoi.check_pixel_budget(params.scale, params.max_pixels)?;
    raster.transform().check_scale(params.scale)?;

    let (rows, cols) = raster.shape();
    let transform = raster.transform();

    let partials: Vec<Accumulator> = (0..rows)
        .into_par_iter()
        .map(|row| {
            let mut acc = Accumulator::default();
            for col in 0..cols {
                let v = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(v) || !v.is_finite() {
                    continue;
                }
                if aoi.contains_pixel(transform, row, col) {
                    acc.push(v);
                }
            }
            acc
        })
        .collect();

    Ok(partials
        .into_iter()
        .fold(Accumulator::default(), Accumulator::merge)
        .finish())
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        self.n += 1;
        let delta = v - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (v - self.mean);
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn merge(self, other: Self) -> Self {
        if other.n == 0 {
            return self;
        }
        if self.n == 0 {
            return other;
        }
        let n = self.n + other.n;
        let (na, nb, nf) = (self.n as f64, other.n as f64, n as f64);
        let delta = other.mean - self.mean;
        Self {
            n,
            mean: self.mean + delta * nb / nf,
            m2: self.m2 + other.m2 + delta * delta * na * nb / nf,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn finish(self) -> RegionStats {
        if self.n == 0 {
            return RegionStats::default();
        }
        RegionStats {
            count: self.n,
            min: Some(self.min),
            max: Some(self.max),
            mean: Some(self.mean),
            std_dev: (self.n >= 2).then(|| (self.m2 / (self.n - 1) as f64).sqrt()),
        }
    }
}
