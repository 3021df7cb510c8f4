//! The stage graph: acquisition, scaling and compositing, indices,
//! normalization.
//!
//! Every stage runs once and in dependency order. The composite and the
//! LST raster are shared by all of their consumers through
//! [`PipelineOutput`].

use crate::config::PipelineConfig;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};
use urbanheat_algorithms::imagery::{
    apply_scale_factors, emissivity, land_surface_temperature, median_composite, ndvi,
    urban_heat_island, utfvi, vegetation_fraction,
};
use urbanheat_algorithms::statistics::{reduce_region, Reducer, RegionStats};
use urbanheat_core::io::ImagerySource;
use urbanheat_core::{AreaOfInterest, Error, Image, Raster, Result};

/// Everything a run produces.
///
/// Rasters share the composite's grid and are undefined (NaN) outside the
/// area of interest.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Scaled median composite, clipped
    pub composite: Image,
    pub ndvi: Raster<f64>,
    /// Fractional vegetation cover
    pub fv: Raster<f64>,
    /// Surface emissivity
    pub em: Raster<f64>,
    /// Land surface temperature, degrees Celsius
    pub lst: Raster<f64>,
    pub uhi: Raster<f64>,
    pub utfvi: Raster<f64>,
    pub ndvi_stats: RegionStats,
    pub lst_stats: RegionStats,
    /// Number of images that went into the composite
    pub image_count: usize,
}

/// Scalar results of a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub image_count: usize,
    pub ndvi_min: f64,
    pub ndvi_max: f64,
    pub lst_mean: f64,
    pub lst_std_dev: f64,
    pub lst_min: Option<f64>,
    pub lst_max: Option<f64>,
    pub pixel_count: u64,
}

impl PipelineOutput {
    pub fn summary(&self) -> Result<RunSummary> {
        Ok(RunSummary {
            image_count: self.image_count,
            ndvi_min: self.ndvi_stats.require(Reducer::Min, "NDVI")?,
            ndvi_max: self.ndvi_stats.require(Reducer::Max, "NDVI")?,
            lst_mean: self.lst_stats.require(Reducer::Mean, "LST")?,
            lst_std_dev: self.lst_stats.require(Reducer::StdDev, "LST")?,
            lst_min: self.lst_stats.min,
            lst_max: self.lst_stats.max,
            pixel_count: self.lst_stats.count,
        })
    }
}

/// Query, scale and composite the collection, clipped to `aoi`
pub fn build_composite(
    source: &dyn ImagerySource,
    aoi: &AreaOfInterest,
    config: &PipelineConfig,
) -> Result<(Image, usize)> {
    let images = source.query_collection(&config.query(aoi))?;
    if images.is_empty() {
        return Err(Error::EmptyCollection {
            collection: config.collection_id.clone(),
        });
    }
    info!(
        "{} images of {} between {} and {}",
        images.len(),
        config.collection_id,
        config.start,
        config.end
    );

    let scaled = images
        .iter()
        .map(|img| apply_scale_factors(img, &config.scale_factors))
        .collect::<Result<Vec<_>>>()?;
    debug!("Scaled {} bands per image", config.scale_factors.entries().count());

    let composite = median_composite(&scaled)?.clip(aoi)?;
    let (rows, cols) = composite.shape();
    info!("Median composite: {} x {}, bands {:?}", cols, rows, composite.band_names());
    Ok((composite, images.len()))
}

/// Run every stage up to UHI and UTFVI.
///
/// Errors are terminal: an empty collection, a region over the pixel
/// ceiling, a scale that does not match the imagery, or a band with no
/// valid pixel inside the region.
pub fn run_pipeline(
    source: &dyn ImagerySource,
    aoi: &AreaOfInterest,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let start = Instant::now();

    let (composite, image_count) = build_composite(source, aoi, config)?;
    let params = config.region_params();

    let ndvi_raster = ndvi(
        composite.band(&config.bands.nir)?,
        composite.band(&config.bands.red)?,
    )?;
    let ndvi_stats = reduce_region(&ndvi_raster, aoi, params)?;
    let ndvi_min = ndvi_stats.require(Reducer::Min, "NDVI")?;
    let ndvi_max = ndvi_stats.require(Reducer::Max, "NDVI")?;
    info!("NDVI range {:.4} .. {:.4} over {} pixels", ndvi_min, ndvi_max, ndvi_stats.count);

    let fv = vegetation_fraction(&ndvi_raster, ndvi_min, ndvi_max)?;
    let em = emissivity(&fv)?;
    let lst = land_surface_temperature(composite.band(&config.bands.thermal)?, &em)?;

    let lst_stats = reduce_region(&lst, aoi, params)?;
    let lst_mean = lst_stats.require(Reducer::Mean, "LST")?;
    let lst_std = lst_stats.require(Reducer::StdDev, "LST")?;
    info!("LST mean {:.2} °C, std dev {:.2}", lst_mean, lst_std);

    let uhi = urban_heat_island(&lst, lst_mean, lst_std)?;
    let utfvi_raster = utfvi(&lst, lst_mean)?;
    debug!("Stages finished in {:.2?}", start.elapsed());

    Ok(PipelineOutput {
        composite,
        ndvi: ndvi_raster,
        fv,
        em,
        lst,
        uhi,
        utfvi: utfvi_raster,
        ndvi_stats,
        lst_stats,
        image_count,
    })
}
