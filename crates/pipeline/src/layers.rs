//! Display layers of a finished run

use crate::config::PipelineConfig;
use crate::stages::PipelineOutput;
use urbanheat_colormap::{MapLayer, VisParams, LST_PALETTE, NDVI_PALETTE, UHI_PALETTE, UTFVI_PALETTE};
use urbanheat_core::{Image, Result};

pub const TRUE_COLOR_LABEL: &str = "True Color (432)";
pub const NDVI_LABEL: &str = "NDVI";
pub const LST_LABEL: &str = "LST";
pub const UHI_LABEL: &str = "UHI";
pub const UTFVI_LABEL: &str = "UTFVI";

/// Reflectance stretch of the true-color layer
pub fn true_color_vis(bands: &[String; 3]) -> VisParams {
    VisParams::rgb([bands[0].as_str(), bands[1].as_str(), bands[2].as_str()], 0.0, 0.3)
}

pub fn ndvi_vis() -> VisParams {
    VisParams::single(NDVI_LABEL, -1.0, 1.0).with_palette(NDVI_PALETTE)
}

/// Degrees Celsius
pub fn lst_vis() -> VisParams {
    VisParams::single(LST_LABEL, 25.0, 50.0).with_palette(LST_PALETTE)
}

/// Standard deviations from the regional mean
pub fn uhi_vis() -> VisParams {
    VisParams::single(UHI_LABEL, -4.0, 4.0).with_palette(UHI_PALETTE)
}

pub fn utfvi_vis() -> VisParams {
    VisParams::single(UTFVI_LABEL, -1.0, 0.3).with_palette(UTFVI_PALETTE)
}

/// Layers in display order: true color, NDVI, LST, UHI, UTFVI
pub fn map_layers(output: &PipelineOutput, config: &PipelineConfig) -> Result<Vec<MapLayer>> {
    let rgb = &config.bands.true_color;
    let true_color = output
        .composite
        .select(&[rgb[0].as_str(), rgb[1].as_str(), rgb[2].as_str()])?;

    Ok(vec![
        MapLayer::new(TRUE_COLOR_LABEL, true_color, true_color_vis(rgb)),
        MapLayer::new(NDVI_LABEL, Image::from_band(NDVI_LABEL, output.ndvi.clone()), ndvi_vis()),
        MapLayer::new(LST_LABEL, Image::from_band(LST_LABEL, output.lst.clone()), lst_vis()),
        MapLayer::new(UHI_LABEL, Image::from_band(UHI_LABEL, output.uhi.clone()), uhi_vis()),
        MapLayer::new(UTFVI_LABEL, Image::from_band(UTFVI_LABEL, output.utfvi.clone()), utfvi_vis()),
    ])
}
