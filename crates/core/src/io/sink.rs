//! Raster sinks: where finished products are persisted

use super::native::{read_geotiff_image, read_geotiff_image_from_buffer, write_geotiff_image, write_geotiff_image_to_buffer, GeoTiffOptions};
use crate::error::{Error, Result};
use crate::geometry::AreaOfInterest;
use crate::image::Image;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk container format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    GeoTiff,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::GeoTiff => "tif",
        }
    }
}

/// One product to persist
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Product name; also the file stem for file-based sinks
    pub name: String,
    /// Region the output is clipped to
    pub region: AreaOfInterest,
    /// Requested pixel size in CRS units
    pub scale: f64,
    /// Upper bound on the pixel count of `region`, estimated and actual
    pub max_pixels: u64,
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn new(name: impl Into<String>, region: AreaOfInterest, scale: f64, max_pixels: u64) -> Self {
        Self {
            name: name.into(),
            region,
            scale,
            max_pixels,
            format: ExportFormat::GeoTiff,
        }
    }

    /// Validate the request against `image`, crop it to the pixel window
    /// covering the region and mask pixels outside the polygon.
    ///
    /// Fails with `PixelLimitExceeded` before any pixel is touched, either on
    /// the area estimate or on the window's `rows * cols`, and with
    /// `InvalidParameter` when `scale` differs from the image's cell size.
    pub fn prepare(&self, image: &Image) -> Result<Image> {
        self.region.check_pixel_budget(self.scale, self.max_pixels)?;
        let transform = image.transform().ok_or_else(|| Error::Export {
            name: self.name.clone(),
            reason: "image has no bands".into(),
        })?;
        transform.check_scale(self.scale)?;

        let (rows, cols) = image.shape();
        let window = self
            .region
            .pixel_window(transform, rows, cols)
            .ok_or_else(|| Error::Export {
                name: self.name.clone(),
                reason: "region does not overlap the image".into(),
            })?;
        let pixels = window.pixel_count();
        if pixels > self.max_pixels {
            return Err(Error::PixelLimitExceeded {
                pixels,
                max_pixels: self.max_pixels,
            });
        }

        image.window(window)?.clip(&self.region)
    }

    fn report(&self, image: &Image, location: String) -> ExportReport {
        let (rows, cols) = image.shape();
        ExportReport {
            name: self.name.clone(),
            location,
            rows,
            cols,
            bands: image.band_names().iter().map(|b| b.to_string()).collect(),
        }
    }
}

/// What a sink wrote
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub name: String,
    /// Path or URI of the written product
    pub location: String,
    pub rows: usize,
    pub cols: usize,
    pub bands: Vec<String>,
}

/// Destination for exported images.
///
/// `write` crops and clips the image to the request region, persists it under the
/// request name and reports where it went. `read` returns what a previous
/// `write` stored under `name`.
pub trait RasterSink: Send + Sync {
    fn write(&self, image: &Image, request: &ExportRequest) -> Result<ExportReport>;

    fn read(&self, name: &str) -> Result<Image>;
}

// ─── GeoTIFF directory ──────────────────────────────────────────────────

/// Writes each export to `<dir>/<name>.tif`
#[derive(Debug, Clone)]
pub struct GeoTiffDirectorySink {
    dir: PathBuf,
    options: GeoTiffOptions,
}

impl GeoTiffDirectorySink {
    /// Sink rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            options: GeoTiffOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GeoTiffOptions) -> Self {
        self.options = options;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path an export named `name` is written to
    pub fn path_for(&self, name: &str, format: ExportFormat) -> PathBuf {
        self.dir.join(format!("{}.{}", name, format.extension()))
    }
}

impl RasterSink for GeoTiffDirectorySink {
    fn write(&self, image: &Image, request: &ExportRequest) -> Result<ExportReport> {
        let clipped = request.prepare(image)?;
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&request.name, request.format);
        write_geotiff_image(&clipped, &path, Some(self.options.clone()))?;
        Ok(request.report(&clipped, path.display().to_string()))
    }

    fn read(&self, name: &str) -> Result<Image> {
        let path = self.path_for(name, ExportFormat::GeoTiff);
        if !path.exists() {
            return Err(Error::Export {
                name: name.to_string(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        read_geotiff_image(&path)
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────

/// Keeps encoded GeoTIFF bytes in memory, keyed by export name
#[derive(Debug, Default)]
pub struct MemorySink {
    options: GeoTiffOptions,
    files: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeoTiffOptions) -> Self {
        Self {
            options,
            files: Mutex::default(),
        }
    }

    /// Names written so far, sorted
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Encoded bytes of an export
    pub fn bytes(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(name).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| Error::Other("memory sink lock poisoned".into()))
    }
}

impl RasterSink for MemorySink {
    fn write(&self, image: &Image, request: &ExportRequest) -> Result<ExportReport> {
        let clipped = request.prepare(image)?;
        let bytes = write_geotiff_image_to_buffer(&clipped, Some(self.options.clone()))?;
        self.lock()?.insert(request.name.clone(), bytes);
        Ok(request.report(&clipped, format!("memory://{}", request.name)))
    }

    fn read(&self, name: &str) -> Result<Image> {
        let bytes = self.bytes(name)?.ok_or_else(|| Error::Export {
            name: name.to_string(),
            reason: "nothing written under this name".into(),
        })?;
        read_geotiff_image_from_buffer(&bytes)
    }
}
