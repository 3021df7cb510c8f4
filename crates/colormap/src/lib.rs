//! # urbanheat Colormap
//!
//! Display layers for the thermal-index pipeline.
//!
//! A [`MapLayer`] pairs an image with [`VisParams`] (bands, stretch range
//! and an optional palette). [`render_layer`] turns it into an RGBA pixel
//! buffer: single bands go through a multi-stop palette, three bands are
//! stretched into an RGB composite.
//!
//! ## Usage
//!
//! ```ignore
//! use urbanheat_colormap::{render_layer, MapLayer, VisParams, LST_PALETTE};
//!
//! let vis = VisParams::single("LST", 25.0, 50.0).with_palette(LST_PALETTE);
//! let layer = MapLayer::new("LST", lst_image, vis);
//! let rgba = render_layer(&layer)?;
//! ```

mod render;
mod scheme;

pub use render::{raster_to_rgba, render_layer, MapLayer, VisParams};
pub use scheme::{ColorStop, Palette, Rgb, LST_PALETTE, NDVI_PALETTE, UHI_PALETTE, UTFVI_PALETTE};
