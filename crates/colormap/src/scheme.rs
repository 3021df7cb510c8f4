//! Palettes and the multi-stop interpolation engine.
//!
//! A palette is a list of colors spread evenly over [0, 1]. Entries are
//! hex codes (`"ff0000"`, `"#ff0000"`) or CSS color names (`"blue"`).

use urbanheat_core::{Error, Result};

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `rrggbb`, with or without a leading `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// CSS basic color keyword
    pub fn from_name(name: &str) -> Option<Self> {
        let rgb = match name.to_ascii_lowercase().as_str() {
            "black" => Self::new(0, 0, 0),
            "white" => Self::new(255, 255, 255),
            "red" => Self::new(255, 0, 0),
            "green" => Self::new(0, 128, 0),
            "lime" => Self::new(0, 255, 0),
            "blue" => Self::new(0, 0, 255),
            "navy" => Self::new(0, 0, 128),
            "yellow" => Self::new(255, 255, 0),
            "cyan" | "aqua" => Self::new(0, 255, 255),
            "magenta" | "fuchsia" => Self::new(255, 0, 255),
            "orange" => Self::new(255, 165, 0),
            "purple" => Self::new(128, 0, 128),
            "brown" => Self::new(165, 42, 42),
            "gray" | "grey" => Self::new(128, 128, 128),
            "silver" => Self::new(192, 192, 192),
            "maroon" => Self::new(128, 0, 0),
            "olive" => Self::new(128, 128, 0),
            "teal" => Self::new(0, 128, 128),
            _ => return None,
        };
        Some(rgb)
    }

    /// Hex code or CSS name
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        Self::from_hex(entry)
            .or_else(|| Self::from_name(entry))
            .ok_or_else(|| Error::InvalidParameter {
                name: "palette",
                value: entry.to_string(),
                reason: "expected a hex code or a CSS color name".into(),
            })
    }
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

// ─── Palettes of the thermal products ──────────────────────────────────

/// NDVI: water to bare ground to vegetation
pub const NDVI_PALETTE: &[&str] = &["blue", "white", "green"];

/// LST: 29 steps from deep blue (cool) to dark red (hot)
pub const LST_PALETTE: &[&str] = &[
    "040274", "040281", "0502a3", "0502b8", "0502ce", "0502e6", "0602ff", "235cb1", "307ef3",
    "269db1", "30c8e2", "32d3ef", "3be285", "3ff38f", "86e26f", "3ae237", "b5e22e", "d6e21f",
    "fff705", "ffd611", "ffb613", "ff8b13", "ff6e08", "ff500d", "ff0000", "de0101", "c21301",
    "a71001", "911003",
];

/// UHI: diverging blue to red
pub const UHI_PALETTE: &[&str] = &[
    "313695", "74add1", "fed976", "feb24c", "fd8d3c", "fc4e2a", "e31a1c", "b10026",
];

/// UTFVI shares the UHI ramp
pub const UTFVI_PALETTE: &[&str] = UHI_PALETTE;

/// Ordered color stops
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<ColorStop>,
}

impl Palette {
    /// Colors spread evenly over [0, 1]. A single color is a flat palette.
    pub fn from_colors(colors: &[Rgb]) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::InvalidParameter {
                name: "palette",
                value: "[]".into(),
                reason: "palette needs at least one color".into(),
            });
        }
        let last = (colors.len() - 1).max(1) as f64;
        let stops = colors
            .iter()
            .enumerate()
            .map(|(i, &color)| ColorStop {
                t: i as f64 / last,
                color,
            })
            .collect();
        Ok(Self { stops })
    }

    /// Parse hex / named entries
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let colors = entries
            .iter()
            .map(|e| Rgb::parse(e.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_colors(&colors)
    }

    /// Black to white
    pub fn grayscale() -> Self {
        Self {
            stops: vec![ColorStop::new(0.0, 0, 0, 0), ColorStop::new(1.0, 255, 255, 255)],
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalized position `t`, clamped to [0, 1]
    pub fn evaluate(&self, t: f64) -> Rgb {
        multi_stop(&self.stops, t)
    }
}

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 || stops.len() == 1 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_names() {
        assert_eq!(Rgb::parse("040274").unwrap(), Rgb::new(4, 2, 116));
        assert_eq!(Rgb::parse("#FF0000").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::parse("green").unwrap(), Rgb::new(0, 128, 0));
        assert!(Rgb::parse("not-a-color").is_err());
        assert!(Rgb::parse("12345").is_err());
    }

    #[test]
    fn builtin_palettes_parse() {
        assert_eq!(Palette::parse(LST_PALETTE).unwrap().stops().len(), 29);
        assert_eq!(Palette::parse(UHI_PALETTE).unwrap().stops().len(), 8);
        assert_eq!(Palette::parse(NDVI_PALETTE).unwrap().stops().len(), 3);
    }

    #[test]
    fn ndvi_palette_endpoints_and_middle() {
        let p = Palette::parse(NDVI_PALETTE).unwrap();
        assert_eq!(p.evaluate(0.0), Rgb::new(0, 0, 255));
        assert_eq!(p.evaluate(0.5), Rgb::new(255, 255, 255));
        assert_eq!(p.evaluate(1.0), Rgb::new(0, 128, 0));
    }

    #[test]
    fn interpolates_between_stops() {
        let p = Palette::grayscale();
        assert_eq!(p.evaluate(0.5), Rgb::new(128, 128, 128));
    }

    #[test]
    fn clamps_outside_unit_range() {
        let p = Palette::parse(UHI_PALETTE).unwrap();
        assert_eq!(p.evaluate(-0.5), Rgb::new(0x31, 0x36, 0x95));
        assert_eq!(p.evaluate(1.5), Rgb::new(0xb1, 0x00, 0x26));
    }

    #[test]
    fn single_color_is_flat() {
        let p = Palette::parse(&["ff0000"]).unwrap();
        assert_eq!(p.evaluate(0.3), Rgb::new(255, 0, 0));
        assert!(Palette::parse::<&str>(&[]).is_err());
    }
}
