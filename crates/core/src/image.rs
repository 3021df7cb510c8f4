//! Multi-band images
//!
//! An [`Image`] is an ordered list of named single-band rasters that share
//! one grid. Operations never mutate in place; they return new images.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::geometry::{AreaOfInterest, PixelWindow};
use crate::raster::{GeoTransform, Raster};
use chrono::NaiveDate;

/// A named band
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub raster: Raster<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, raster: Raster<f64>) -> Self {
        Self {
            name: name.into(),
            raster,
        }
    }
}

/// A multi-band image whose bands share shape, transform and CRS
#[derive(Debug, Clone)]
pub struct Image {
    id: Option<String>,
    acquired: Option<NaiveDate>,
    bands: Vec<Band>,
}

impl Image {
    /// Build an image from bands. All bands must have the same shape and
    /// band names must be unique.
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        if let Some(first) = bands.first() {
            let (er, ec) = first.raster.shape();
            for band in &bands[1..] {
                let (ar, ac) = band.raster.shape();
                if (ar, ac) != (er, ec) {
                    return Err(Error::SizeMismatch { er, ec, ar, ac });
                }
            }
        }
        for (i, band) in bands.iter().enumerate() {
            if bands[..i].iter().any(|b| b.name == band.name) {
                return Err(Error::InvalidParameter {
                    name: "bands",
                    value: band.name.clone(),
                    reason: "duplicate band name".into(),
                });
            }
        }

        Ok(Self {
            id: None,
            acquired: None,
            bands,
        })
    }

    /// Single-band image
    pub fn from_band(name: impl Into<String>, raster: Raster<f64>) -> Self {
        Self {
            id: None,
            acquired: None,
            bands: vec![Band::new(name, raster)],
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_acquired(mut self, date: NaiveDate) -> Self {
        self.acquired = Some(date);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn acquired(&self) -> Option<NaiveDate> {
        self.acquired
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn has_band(&self, name: &str) -> bool {
        self.bands.iter().any(|b| b.name == name)
    }

    /// Raster of the named band
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.raster)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    /// (rows, cols) shared by all bands; (0, 0) for an image with no bands
    pub fn shape(&self) -> (usize, usize) {
        self.bands.first().map_or((0, 0), |b| b.raster.shape())
    }

    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.first().map(|b| b.raster.transform())
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.bands.first().and_then(|b| b.raster.crs())
    }

    /// Map bounds of the shared grid
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        self.bands.first().map(|b| b.raster.bounds())
    }

    /// New image holding the named bands, in the requested order
    pub fn select(&self, names: &[&str]) -> Result<Image> {
        let bands = names
            .iter()
            .map(|name| Ok(Band::new(*name, self.band(name)?.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_bands(bands))
    }

    /// Rename a single-band image, or the band `from` of a multi-band one
    pub fn rename(&self, from: &str, to: &str) -> Result<Image> {
        if !self.has_band(from) {
            return Err(Error::MissingBand(from.to_string()));
        }
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let name = if b.name == from { to } else { b.name.as_str() };
                Band::new(name, b.raster.clone())
            })
            .collect();
        Image::new(bands).map(|img| img.with_meta_of(self))
    }

    /// Merge the bands of `other` into this image.
    ///
    /// With `overwrite`, a band of `other` replaces the same-named band in
    /// place; bands it does not name are left untouched. Without
    /// `overwrite`, a name collision is an error. New names are appended.
    pub fn add_bands(&self, other: &Image, overwrite: bool) -> Result<Image> {
        let mut bands = self.bands.clone();
        for incoming in &other.bands {
            match bands.iter_mut().find(|b| b.name == incoming.name) {
                Some(existing) if overwrite => existing.raster = incoming.raster.clone(),
                Some(_) => {
                    return Err(Error::InvalidParameter {
                        name: "bands",
                        value: incoming.name.clone(),
                        reason: "band already present and overwrite is off".into(),
                    })
                }
                None => bands.push(incoming.clone()),
            }
        }
        Image::new(bands).map(|img| img.with_meta_of(self))
    }

    /// Copy with every band clipped to the area of interest
    pub fn clip(&self, aoi: &AreaOfInterest) -> Result<Image> {
        let bands = self
            .bands
            .iter()
            .map(|b| Ok(Band::new(b.name.clone(), aoi.clip(&b.raster)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_bands(bands))
    }

    /// Copy with every band cut down to `window`
    pub fn window(&self, window: PixelWindow) -> Result<Image> {
        let bands = self
            .bands
            .iter()
            .map(|b| {
                let raster = b.raster.window(window.row, window.col, window.rows, window.cols)?;
                Ok(Band::new(b.name.clone(), raster))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_bands(bands))
    }

    fn with_bands(&self, bands: Vec<Band>) -> Image {
        Image {
            id: self.id.clone(),
            acquired: self.acquired,
            bands,
        }
    }

    fn with_meta_of(mut self, other: &Image) -> Image {
        self.id = other.id.clone();
        self.acquired = other.acquired;
        self
    }
}
