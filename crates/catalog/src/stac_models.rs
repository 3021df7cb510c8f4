//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Serde models for a STAC ItemCollection, the same document shape a STAC
//! API returns from item search. Only the fields the local catalog filters
//! on are modeled; everything else is kept in `extra`.

use crate::error::{CatalogError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl StacItemCollection {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    #[serde(rename = "type")]
    pub type_: String,

    /// Unique item identifier.
    pub id: String,

    /// Geometry as raw JSON; footprint tests use `proj:bbox`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,

    /// Bounding box `[west, south, east, north]` in WGS84.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    /// Assets keyed by band name; sorted so band order is stable.
    pub assets: BTreeMap<String, StacAsset>,

    /// Collection this item belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl StacItem {
    /// Get an asset by key.
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// EPSG code from the `proj:epsg` property, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.properties
            .extra
            .get("proj:epsg")
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Footprint as `(min_x, min_y, max_x, max_y)` in the imagery CRS, from
    /// `proj:bbox`. Both the 2-D and the 3-D bbox layouts are accepted.
    ///
    /// `bbox` is WGS84 and is never used here; items without `proj:bbox`
    /// are tested against their raster bounds once loaded.
    pub fn footprint(&self) -> Option<(f64, f64, f64, f64)> {
        let b = self
            .properties
            .extra
            .get("proj:bbox")
            .and_then(|v| serde_json::from_value::<Vec<f64>>(v.clone()).ok())?;
        match b.as_slice() {
            [w, s, e, n] => Some((*w, *s, *e, *n)),
            [w, s, _, e, n, _] => Some((*w, *s, *e, *n)),
            _ => None,
        }
    }

    /// UTC acquisition date from `datetime`, or `start_datetime` when
    /// `datetime` is null. `Ok(None)` when the item has neither.
    pub fn acquisition_date(&self) -> Result<Option<NaiveDate>> {
        let raw = self.properties.datetime.clone().or_else(|| {
            self.properties
                .extra
                .get("start_datetime")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
        let Some(raw) = raw else {
            return Ok(None);
        };

        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc).date_naive())
            .or_else(|_| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
            .map(Some)
            .map_err(|_| CatalogError::InvalidDatetime {
                item: self.id.clone(),
                value: raw,
            })
    }

    /// Assets that hold raster bands
    pub fn band_assets(&self) -> impl Iterator<Item = (&String, &StacAsset)> {
        self.assets.iter().filter(|(_, a)| a.is_geotiff())
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "landsat-9").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    /// Path or URL of the asset file; relative paths resolve against the
    /// catalog file's directory.
    pub href: String,

    /// Media type (e.g., `"image/tiff; application=geotiff"`).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Roles: `["data"]`, `["thumbnail"]`, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// All other asset fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl StacAsset {
    /// GeoTIFF media type, or a `.tif`/`.tiff` href when the type is absent
    pub fn is_geotiff(&self) -> bool {
        match &self.type_ {
            Some(t) => t.contains("geotiff") || t.contains("geo+tiff"),
            None => {
                let href = self.href.to_ascii_lowercase();
                href.ends_with(".tif") || href.ends_with(".tiff")
            }
        }
    }

    /// Nodata value of the first entry of the raster extension's
    /// `raster:bands`, if declared.
    pub fn nodata(&self) -> Option<f64> {
        let first = self.extra.get("raster:bands")?.as_array()?.first()?;
        match first.get("nodata")? {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("nan") => Some(f64::NAN),
            v => v.as_f64(),
        }
    }
}

/// A STAC Link.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    /// Relationship: `"self"`, `"root"`, `"parent"`, etc.
    pub rel: String,

    /// Target URL.
    pub href: String,

    /// Media type of the linked resource.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
