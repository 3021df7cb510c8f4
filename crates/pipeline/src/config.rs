//! Pipeline parameters

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use urbanheat_algorithms::imagery::ScaleFactors;
use urbanheat_algorithms::statistics::RegionParams;
use urbanheat_core::io::CollectionQuery;
use urbanheat_core::{AreaOfInterest, Error, Result};

/// Landsat 9 Collection 2 Level-2, Tier 1
pub const DEFAULT_COLLECTION: &str = "LANDSAT/LC09/C02/T1_L2";
/// Pixel size of every reduction and export, in meters
pub const DEFAULT_SCALE: f64 = 30.0;
/// Ceiling on the estimated pixel count of the region
pub const DEFAULT_MAX_PIXELS: u64 = 1_000_000_000;

/// Band roles in the scaled composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandNames {
    pub nir: String,
    pub red: String,
    /// Surface temperature in kelvin after scaling
    pub thermal: String,
    /// Red, green, blue of the true-color layer
    pub true_color: [String; 3],
}

impl Default for BandNames {
    fn default() -> Self {
        Self {
            nir: "SR_B5".into(),
            red: "SR_B4".into(),
            thermal: "ST_B10".into(),
            true_color: ["SR_B4".into(), "SR_B3".into(), "SR_B2".into()],
        }
    }
}

/// Names the products are exported under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportNames {
    pub ndvi: String,
    pub lst: String,
    pub uhi: String,
    pub utfvi: String,
    pub true_color: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            ndvi: "NDVI_export".into(),
            lst: "LST_export".into(),
            uhi: "UHI_export".into(),
            utfvi: "UTFVI_export".into(),
            true_color: "TrueColor_export".into(),
        }
    }
}

/// Everything a run needs besides the imagery and the area of interest.
///
/// Missing JSON fields take their defaults, so a config file only has to
/// name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub collection_id: String,
    /// First acquisition date, inclusive
    pub start: NaiveDate,
    /// Last acquisition date, exclusive
    pub end: NaiveDate,
    pub scale: f64,
    pub max_pixels: u64,
    pub scale_factors: ScaleFactors,
    pub bands: BandNames,
    pub exports: ExportNames,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection_id: DEFAULT_COLLECTION.into(),
            start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default(),
            scale: DEFAULT_SCALE,
            max_pixels: DEFAULT_MAX_PIXELS,
            scale_factors: ScaleFactors::default(),
            bands: BandNames::default(),
            exports: ExportNames::default(),
        }
    }
}

impl PipelineConfig {
    /// Reject configurations no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.collection_id.trim().is_empty() {
            return Err(Error::InvalidParameter {
                name: "collection_id",
                value: format!("{:?}", self.collection_id),
                reason: "collection id is empty".into(),
            });
        }
        if self.start >= self.end {
            return Err(Error::InvalidParameter {
                name: "end",
                value: self.end.to_string(),
                reason: format!("date range must end after its start {}", self.start),
            });
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(Error::InvalidParameter {
                name: "scale",
                value: self.scale.to_string(),
                reason: "scale must be a positive number of CRS units".into(),
            });
        }
        if self.max_pixels == 0 {
            return Err(Error::InvalidParameter {
                name: "max_pixels",
                value: "0".into(),
                reason: "pixel ceiling must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn query(&self, region: &AreaOfInterest) -> CollectionQuery {
        CollectionQuery::new(self.collection_id.clone(), self.start, self.end, region.clone())
    }

    pub fn region_params(&self) -> RegionParams {
        RegionParams {
            scale: self.scale,
            max_pixels: self.max_pixels,
        }
    }
}
