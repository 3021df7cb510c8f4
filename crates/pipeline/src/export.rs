//! Export jobs

use crate::config::PipelineConfig;
use crate::layers::{LST_LABEL, NDVI_LABEL, UHI_LABEL, UTFVI_LABEL};
use crate::stages::PipelineOutput;
use tracing::info;
use urbanheat_core::io::{ExportReport, ExportRequest, RasterSink};
use urbanheat_core::{AreaOfInterest, Image, Result};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One image to be written under one name
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub image: Image,
    pub request: ExportRequest,
}

impl ExportJob {
    pub fn run(&self, sink: &dyn RasterSink) -> Result<ExportReport> {
        let report = sink.write(&self.image, &self.request)?;
        info!(
            "Exported {} ({} x {}, {} bands) to {}",
            report.name,
            report.cols,
            report.rows,
            report.bands.len(),
            report.location
        );
        Ok(report)
    }
}

/// NDVI, LST, UHI, UTFVI and the true-color composite, each clipped to
/// `aoi` at the configured scale and pixel ceiling
pub fn export_jobs(
    output: &PipelineOutput,
    config: &PipelineConfig,
    aoi: &AreaOfInterest,
) -> Result<Vec<ExportJob>> {
    let names = &config.exports;
    let rgb = &config.bands.true_color;
    let true_color = output
        .composite
        .select(&[rgb[0].as_str(), rgb[1].as_str(), rgb[2].as_str()])?;

    let products = [
        (names.ndvi.as_str(), Image::from_band(NDVI_LABEL, output.ndvi.clone())),
        (names.lst.as_str(), Image::from_band(LST_LABEL, output.lst.clone())),
        (names.uhi.as_str(), Image::from_band(UHI_LABEL, output.uhi.clone())),
        (names.utfvi.as_str(), Image::from_band(UTFVI_LABEL, output.utfvi.clone())),
        (names.true_color.as_str(), true_color),
    ];

    Ok(products
        .into_iter()
        .map(|(name, image)| ExportJob {
            image,
            request: ExportRequest::new(name, aoi.clone(), config.scale, config.max_pixels),
        })
        .collect())
}

/// Run the export jobs. Jobs are independent and run concurrently; reports
/// come back in job order and the first failure is returned.
pub fn export_outputs(
    output: &PipelineOutput,
    sink: &dyn RasterSink,
    config: &PipelineConfig,
    aoi: &AreaOfInterest,
) -> Result<Vec<ExportReport>> {
    let jobs = export_jobs(output, config, aoi)?;

    #[cfg(feature = "parallel")]
    let reports = jobs.par_iter().map(|job| job.run(sink)).collect();

    #[cfg(not(feature = "parallel"))]
    let reports = jobs.iter().map(|job| job.run(sink)).collect();

    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbanheat_algorithms::statistics::RegionStats;
    use urbanheat_core::io::MemorySink;
    use urbanheat_core::{Band, Error, GeoTransform, Raster};

    fn grid(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(3, 3, value);
        r.set_transform(GeoTransform::new(0.0, 90.0, 30.0, -30.0));
        r
    }

    fn output() -> PipelineOutput {
        let composite = Image::new(vec![
            Band::new("SR_B2", grid(0.02)),
            Band::new("SR_B3", grid(0.03)),
            Band::new("SR_B4", grid(0.04)),
            Band::new("SR_B5", grid(0.3)),
            Band::new("ST_B10", grid(300.0)),
        ])
        .unwrap();
        PipelineOutput {
            composite,
            ndvi: grid(0.5),
            fv: grid(0.25),
            em: grid(0.987),
            lst: grid(31.0),
            uhi: grid(0.5),
            utfvi: grid(0.03),
            ndvi_stats: RegionStats::default(),
            lst_stats: RegionStats::default(),
            image_count: 1,
        }
    }

    #[test]
    fn five_products_in_order() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 90.0, 90.0).unwrap();
        let sink = MemorySink::new();
        let reports = export_outputs(&output(), &sink, &PipelineConfig::default(), &aoi).unwrap();

        let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["NDVI_export", "LST_export", "UHI_export", "UTFVI_export", "TrueColor_export"]
        );
        assert_eq!(reports[4].bands, vec!["SR_B4", "SR_B3", "SR_B2"]);
        assert_eq!(reports[1].bands, vec!["LST"]);
        assert_eq!(sink.names().unwrap().len(), 5);
    }

    #[test]
    fn pixel_ceiling_stops_every_export() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 90.0, 90.0).unwrap();
        let cfg = PipelineConfig {
            max_pixels: 8,
            ..PipelineConfig::default()
        };
        let sink = MemorySink::new();
        let err = export_outputs(&output(), &sink, &cfg, &aoi).unwrap_err();
        assert!(matches!(err, Error::PixelLimitExceeded { pixels: 9, max_pixels: 8 }));
        assert!(sink.names().unwrap().is_empty());
    }
}
