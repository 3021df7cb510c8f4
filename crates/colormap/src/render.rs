//! Layer-to-RGBA rendering.

use crate::scheme::{Palette, Rgb};
use serde::{Deserialize, Serialize};
use urbanheat_core::image::Image;
use urbanheat_core::raster::{Raster, RasterElement};
use urbanheat_core::{Error, Result};

/// How a layer is displayed.
///
/// One band with a palette renders through the palette; one band without
/// one renders as grayscale; three bands render as an RGB composite, each
/// stretched linearly from `min` to `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub palette: Option<Vec<String>>,
}

impl VisParams {
    /// One band, no palette
    pub fn single(band: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            bands: vec![band.into()],
            min,
            max,
            palette: None,
        }
    }

    /// Three bands as red, green, blue
    pub fn rgb(bands: [&str; 3], min: f64, max: f64) -> Self {
        Self {
            bands: bands.iter().map(|b| b.to_string()).collect(),
            min,
            max,
            palette: None,
        }
    }

    pub fn with_palette<S: AsRef<str>>(mut self, palette: &[S]) -> Self {
        self.palette = Some(palette.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }
}

/// A named image plus its display parameters
#[derive(Debug, Clone)]
pub struct MapLayer {
    pub label: String,
    pub image: Image,
    pub vis: VisParams,
}

impl MapLayer {
    pub fn new(label: impl Into<String>, image: Image, vis: VisParams) -> Self {
        Self {
            label: label.into(),
            image,
            vis,
        }
    }
}

/// Render a layer into a row-major RGBA buffer of `rows * cols * 4` bytes.
///
/// Undefined pixels are transparent.
pub fn render_layer(layer: &MapLayer) -> Result<Vec<u8>> {
    let vis = &layer.vis;
    match vis.bands.as_slice() {
        [band] => {
            let palette = match &vis.palette {
                Some(entries) => Palette::parse(entries)?,
                None => Palette::grayscale(),
            };
            Ok(raster_to_rgba(layer.image.band(band)?, &palette, vis.min, vis.max))
        }
        [r, g, b] => {
            let channels = [
                layer.image.band(r)?,
                layer.image.band(g)?,
                layer.image.band(b)?,
            ];
            Ok(rgb_to_rgba(channels, vis.min, vis.max))
        }
        other => Err(Error::InvalidParameter {
            name: "bands",
            value: format!("{:?}", other),
            reason: "a layer shows one band through a palette or three bands as RGB".into(),
        }),
    }
}

/// Convert a raster to an RGBA pixel buffer through `palette`.
///
/// Values are normalized to `[min, max]` and clamped.
pub fn raster_to_rgba<T: RasterElement>(
    raster: &Raster<T>,
    palette: &Palette,
    min: f64,
    max: f64,
) -> Vec<u8> {
    let inv_range = inverse_range(min, max);
    let nodata = raster.nodata();
    let mut rgba = vec![0u8; raster.len() * 4];

    for (px, val) in rgba.chunks_exact_mut(4).zip(raster.data().iter()) {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64().filter(|v| v.is_finite()) {
            let Rgb { r, g, b } = palette.evaluate((v - min) * inv_range);
            px.copy_from_slice(&[r, g, b, 255]);
        }
    }

    rgba
}

fn rgb_to_rgba(channels: [&Raster<f64>; 3], min: f64, max: f64) -> Vec<u8> {
    let inv_range = inverse_range(min, max);
    let stretch = |v: f64| ((v - min) * inv_range).clamp(0.0, 1.0) * 255.0;
    let [red, green, blue] = channels;
    let mut rgba = vec![0u8; red.len() * 4];

    let pixels = red
        .data()
        .iter()
        .zip(green.data().iter())
        .zip(blue.data().iter());
    for (px, ((&r, &g), &b)) in rgba.chunks_exact_mut(4).zip(pixels) {
        if red.is_nodata(r) || green.is_nodata(g) || blue.is_nodata(b) {
            continue;
        }
        px.copy_from_slice(&[
            stretch(r).round() as u8,
            stretch(g).round() as u8,
            stretch(b).round() as u8,
            255,
        ]);
    }

    rgba
}

fn inverse_range(min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    }
}
