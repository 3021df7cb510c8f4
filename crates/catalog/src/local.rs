//! Local STAC catalog as an [`ImagerySource`].

use crate::error::{CatalogError, Result};
use crate::stac_models::{StacItem, StacItemCollection};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use urbanheat_core::io::{read_geotiff, CollectionQuery, ImagerySource};
use urbanheat_core::{Band, Image, Raster, CRS};

/// STAC ItemCollection on disk whose assets are local GeoTIFFs.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    base_dir: PathBuf,
    items: StacItemCollection,
}

impl LocalCatalog {
    /// Read an ItemCollection JSON file. Relative asset hrefs resolve
    /// against the file's directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let items: StacItemCollection = serde_json::from_str(&text)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!("Loaded {} catalog items from {}", items.len(), path.display());
        Ok(Self::from_collection(items, base_dir))
    }

    pub fn from_collection(items: StacItemCollection, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            items,
        }
    }

    pub fn items(&self) -> &[StacItem] {
        &self.items.features
    }

    /// Items passing the collection, date and footprint filters, in
    /// ascending date order (ties broken by id).
    pub fn matching_items(&self, query: &CollectionQuery) -> Result<Vec<(NaiveDate, &StacItem)>> {
        let mut matched = Vec::new();
        for item in self.items() {
            if item.collection.as_deref() != Some(query.collection_id.as_str()) {
                debug!("Skipping {}: collection {:?}", item.id, item.collection);
                continue;
            }
            let Some(date) = item.acquisition_date()? else {
                debug!("Skipping {}: no acquisition date", item.id);
                continue;
            };
            if !query.contains_date(date) {
                debug!(
                    "Skipping {}: acquired {} outside [{}, {})",
                    item.id, date, query.start, query.end
                );
                continue;
            }
            if let Some(footprint) = item.footprint() {
                if !query.region.intersects_bounds(footprint) {
                    debug!("Skipping {}: footprint outside the area of interest", item.id);
                    continue;
                }
            }
            matched.push((date, item));
        }
        matched.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        Ok(matched)
    }

    /// Load every band asset of an item as one image
    pub fn load_item(&self, item: &StacItem, date: Option<NaiveDate>) -> Result<Image> {
        let crs = item.epsg().map(CRS::from_epsg);
        let bands = item
            .band_assets()
            .map(|(name, asset)| {
                let path = self.resolve(&asset.href);
                debug!("Reading {} band {} from {}", item.id, name, path.display());
                let mut raster: Raster<f64> = read_geotiff(&path, None)?;
                if let Some(nd) = asset.nodata() {
                    raster.set_nodata(Some(nd));
                }
                if raster.crs().is_none() {
                    raster.set_crs(crs.clone());
                }
                Ok(Band::new(name.clone(), raster))
            })
            .collect::<Result<Vec<_>>>()?;

        if bands.is_empty() {
            return Err(CatalogError::NoBands {
                item: item.id.clone(),
            });
        }

        let image = Image::new(bands)?.with_id(item.id.clone());
        Ok(match date {
            Some(d) => image.with_acquired(d),
            None => image,
        })
    }

    /// Run a query: filter, load, and check that all images share a grid.
    pub fn query(&self, query: &CollectionQuery) -> Result<Vec<Image>> {
        let matched = self.matching_items(query)?;
        info!(
            "{} of {} items of {} match {} .. {}",
            matched.len(),
            self.items.len(),
            query.collection_id,
            query.start,
            query.end
        );

        let mut images: Vec<Image> = Vec::with_capacity(matched.len());
        for (date, item) in matched {
            let image = self.load_item(item, Some(date))?;

            if item.footprint().is_none() {
                if let Some(bounds) = image.bounds() {
                    if !query.region.intersects_bounds(bounds) {
                        debug!("Skipping {}: raster outside the area of interest", item.id);
                        continue;
                    }
                }
            }

            if let Some(first) = images.first() {
                check_same_grid(first, &image)?;
            }
            images.push(image);
        }
        Ok(images)
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let href = href.strip_prefix("file://").unwrap_or(href);
        let path = Path::new(href);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

fn check_same_grid(reference: &Image, image: &Image) -> Result<()> {
    let same_shape = reference.shape() == image.shape();
    let same_transform = match (reference.transform(), image.transform()) {
        (Some(a), Some(b)) => a.same_grid(b),
        _ => false,
    };
    let same_crs = match (reference.crs(), image.crs()) {
        (Some(a), Some(b)) => a.is_equivalent(b),
        (None, None) => true,
        _ => false,
    };
    if same_shape && same_transform && same_crs {
        return Ok(());
    }
    warn!(
        "{} ({:?}, {:?}) differs from {} ({:?}, {:?})",
        image.id().unwrap_or_default(),
        image.shape(),
        image.crs(),
        reference.id().unwrap_or_default(),
        reference.shape(),
        reference.crs()
    );
    Err(CatalogError::GridMismatch {
        item: image.id().unwrap_or_default().to_string(),
        reference: reference.id().unwrap_or_default().to_string(),
    })
}

impl ImagerySource for LocalCatalog {
    fn query_collection(&self, query: &CollectionQuery) -> urbanheat_core::Result<Vec<Image>> {
        Ok(self.query(query)?)
    }
}
