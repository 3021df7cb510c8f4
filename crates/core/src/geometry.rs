//! Area of interest polygon
//!
//! One `AreaOfInterest` value drives spatial filtering of the input
//! collection, clipping of every output, and every region reduction.
//! Clipping and reductions share [`AreaOfInterest::contains_pixel`], so the
//! pixels that enter a statistic are exactly the pixels an export keeps.
//! Exports are also cropped to [`AreaOfInterest::pixel_window`].

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use geo::{Area, BoundingRect, Coord, Intersects, LineString, Polygon, Rect};
use serde_json::Value;

/// Block of whole pixels of a grid: upper-left `(row, col)` and its size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl PixelWindow {
    pub fn pixel_count(&self) -> u64 {
        (self.rows as u64).saturating_mul(self.cols as u64)
    }
}

/// Polygon in the CRS of the imagery it is applied to.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    polygon: Polygon<f64>,
    bbox: Rect<f64>,
}

impl AreaOfInterest {
    /// Wrap a polygon. Fails on polygons with fewer than three distinct vertices.
    pub fn new(polygon: Polygon<f64>) -> Result<Self> {
        if polygon.exterior().0.len() < 4 {
            return Err(Error::Geometry(
                "polygon exterior needs at least three vertices".into(),
            ));
        }
        let bbox = polygon
            .bounding_rect()
            .ok_or_else(|| Error::Geometry("polygon has no extent".into()))?;
        Ok(Self { polygon, bbox })
    }

    /// Axis-aligned rectangle `[min_x, min_y, max_x, max_y]`
    pub fn from_bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        if !(min_x < max_x && min_y < max_y) {
            return Err(Error::Geometry(format!(
                "degenerate bbox [{}, {}, {}, {}]",
                min_x, min_y, max_x, max_y
            )));
        }
        Self::new(Rect::new((min_x, min_y), (max_x, max_y)).to_polygon())
    }

    /// Parse a GeoJSON Polygon, a Feature holding one, or the first feature
    /// of a FeatureCollection.
    pub fn from_geojson(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::Geometry(format!("invalid GeoJSON: {}", e)))?;
        Self::new(polygon_from_geojson(&value)?)
    }

    /// Read a GeoJSON file
    pub fn from_geojson_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_geojson(&text)
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// Bounds as `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.bbox.min().x, self.bbox.min().y, self.bbox.max().x, self.bbox.max().y)
    }

    /// Planar area in squared CRS units
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    /// Number of `scale`-sized pixels needed to cover the polygon, rounded up
    pub fn estimate_pixel_count(&self, scale: f64) -> u64 {
        if scale <= 0.0 || !scale.is_finite() {
            return u64::MAX;
        }
        (self.area() / (scale * scale)).ceil() as u64
    }

    /// Refuse regions that would need more than `max_pixels` pixels at `scale`.
    ///
    /// Returns the estimated pixel count when it fits.
    pub fn check_pixel_budget(&self, scale: f64, max_pixels: u64) -> Result<u64> {
        let pixels = self.estimate_pixel_count(scale);
        if pixels > max_pixels {
            return Err(Error::PixelLimitExceeded { pixels, max_pixels });
        }
        Ok(pixels)
    }

    /// Point-in-polygon test, boundary inclusive
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let c = Coord { x, y };
        self.bbox.intersects(&c) && self.polygon.intersects(&c)
    }

    /// Whether the center of pixel (row, col) lies inside the polygon
    pub fn contains_pixel(&self, transform: &GeoTransform, row: usize, col: usize) -> bool {
        let (x, y) = transform.pixel_to_geo(col, row);
        self.contains(x, y)
    }

    /// Whether a `(min_x, min_y, max_x, max_y)` box touches the polygon
    pub fn intersects_bounds(&self, bounds: (f64, f64, f64, f64)) -> bool {
        let (min_x, min_y, max_x, max_y) = bounds;
        let rect = Rect::new((min_x, min_y), (max_x, max_y));
        self.bbox.intersects(&rect) && self.polygon.intersects(&rect)
    }

    /// Smallest block of a `rows` x `cols` grid holding every pixel whose
    /// center lies in the polygon's bounding box. `None` when no center does.
    pub fn pixel_window(&self, transform: &GeoTransform, rows: usize, cols: usize) -> Option<PixelWindow> {
        let (min_x, min_y, max_x, max_y) = self.bounds();

        if transform.is_north_up() {
            let (col0, col1) = axis_range(transform.origin_x, transform.pixel_width, min_x, max_x, cols)?;
            let (row0, row1) = axis_range(transform.origin_y, transform.pixel_height, min_y, max_y, rows)?;
            return Some(PixelWindow {
                row: row0,
                col: col0,
                rows: row1 - row0 + 1,
                cols: col1 - col0 + 1,
            });
        }

        // Rotated grid: test every pixel center
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = transform.pixel_to_geo(col, row);
                if x < min_x || x > max_x || y < min_y || y > max_y {
                    continue;
                }
                extent = Some(match extent {
                    None => (row, col, row, col),
                    Some((r0, c0, r1, c1)) => (r0.min(row), c0.min(col), r1.max(row), c1.max(col)),
                });
            }
        }
        extent.map(|(r0, c0, r1, c1)| PixelWindow {
            row: r0,
            col: c0,
            rows: r1 - r0 + 1,
            cols: c1 - c0 + 1,
        })
    }

    /// Copy of `raster` with every pixel outside the polygon set undefined
    pub fn clip<T: RasterElement>(&self, raster: &Raster<T>) -> Result<Raster<T>> {
        let (rows, cols) = raster.shape();
        let fill = raster.nodata().unwrap_or_else(T::undefined);
        let transform = raster.transform();

        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let v = unsafe { raster.get_unchecked(row, col) };
                data.push(if self.contains_pixel(transform, row, col) { v } else { fill });
            }
        }

        raster.derive(data, Some(fill))
    }
}

/// Inclusive index range of the `n` cells along one axis whose centers
/// `origin + (i + 0.5) * step` fall within `[lo, hi]`
fn axis_range(origin: f64, step: f64, lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
    if n == 0 || step == 0.0 || !step.is_finite() {
        return None;
    }
    let a = (lo - origin) / step - 0.5;
    let b = (hi - origin) / step - 0.5;
    let (a, b) = if a <= b { (a, b) } else { (b, a) };

    // Centers sit on half-integers, so the slack never admits a neighbour
    let first = (a - 1e-9).ceil().max(0.0);
    let last = (b + 1e-9).floor().min((n - 1) as f64);
    if first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

fn polygon_from_geojson(value: &Value) -> Result<Polygon<f64>> {
    match value.get("type").and_then(Value::as_str) {
        Some("Polygon") => {
            let rings = value
                .get("coordinates")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::Geometry("Polygon without coordinates".into()))?;
            let mut rings = rings.iter().map(ring_from_geojson);
            let exterior = rings
                .next()
                .ok_or_else(|| Error::Geometry("Polygon without exterior ring".into()))??;
            let interiors = rings.collect::<Result<Vec<_>>>()?;
            Ok(Polygon::new(exterior, interiors))
        }
        Some("Feature") => value
            .get("geometry")
            .ok_or_else(|| Error::Geometry("Feature without geometry".into()))
            .and_then(polygon_from_geojson),
        Some("FeatureCollection") => value
            .get("features")
            .and_then(Value::as_array)
            .and_then(|f| f.first())
            .ok_or_else(|| Error::Geometry("FeatureCollection has no features".into()))
            .and_then(polygon_from_geojson),
        other => Err(Error::Geometry(format!(
            "expected a Polygon geometry, got {:?}",
            other
        ))),
    }
}

fn ring_from_geojson(ring: &Value) -> Result<LineString<f64>> {
    let positions = ring
        .as_array()
        .ok_or_else(|| Error::Geometry("ring is not an array".into()))?;

    positions
        .iter()
        .map(|p| match (p.get(0).and_then(Value::as_f64), p.get(1).and_then(Value::as_f64)) {
            (Some(x), Some(y)) => Ok(Coord { x, y }),
            _ => Err(Error::Geometry(format!("invalid position {}", p))),
        })
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TRIANGLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"name": "aoi"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [300.0, 0.0], [0.0, 300.0], [0.0, 0.0]]]
            }
        }]
    }"#;

    #[test]
    fn parses_feature_collection() {
        let aoi = AreaOfInterest::from_geojson(TRIANGLE).unwrap();
        assert_relative_eq!(aoi.area(), 45_000.0);
        assert_eq!(aoi.bounds(), (0.0, 0.0, 300.0, 300.0));
        assert!(aoi.contains(10.0, 10.0));
        assert!(!aoi.contains(250.0, 250.0));
    }

    #[test]
    fn rejects_non_polygon() {
        let err = AreaOfInterest::from_geojson(r#"{"type": "Point", "coordinates": [1, 2]}"#);
        assert!(matches!(err, Err(Error::Geometry(_))));
    }

    #[test]
    fn pixel_estimate_rounds_up() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 100.0, 100.0).unwrap();
        // 10_000 m² / 900 m² = 11.1
        assert_eq!(aoi.estimate_pixel_count(30.0), 12);
    }

    #[test]
    fn pixel_budget_is_enforced() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 3000.0, 3000.0).unwrap();
        assert_eq!(aoi.check_pixel_budget(30.0, 10_000).unwrap(), 10_000);
        assert!(matches!(
            aoi.check_pixel_budget(30.0, 9_999),
            Err(Error::PixelLimitExceeded { pixels: 10_000, max_pixels: 9_999 })
        ));
    }

    #[test]
    fn intersects_bounds() {
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 100.0, 100.0).unwrap();
        assert!(aoi.intersects_bounds((50.0, 50.0, 500.0, 500.0)));
        assert!(!aoi.intersects_bounds((200.0, 200.0, 500.0, 500.0)));
    }

    #[test]
    fn window_of_single_pixel_region() {
        let gt = GeoTransform::new(0.0, 3000.0, 30.0, -30.0);
        let aoi = AreaOfInterest::from_bbox(0.0, 2970.0, 30.0, 3000.0).unwrap();

        let window = aoi.pixel_window(&gt, 100, 100).unwrap();
        assert_eq!(window, PixelWindow { row: 0, col: 0, rows: 1, cols: 1 });
        assert_eq!(window.pixel_count(), 1);
    }

    #[test]
    fn window_inside_grid() {
        let gt = GeoTransform::new(0.0, 3000.0, 30.0, -30.0);
        // Centers x = 75..=165 (cols 2..=5), y = 2805..=2895 (rows 3..=6)
        let aoi = AreaOfInterest::from_bbox(70.0, 2800.0, 170.0, 2900.0).unwrap();

        let window = aoi.pixel_window(&gt, 100, 100).unwrap();
        assert_eq!(window, PixelWindow { row: 3, col: 2, rows: 4, cols: 4 });
    }

    #[test]
    fn window_is_clamped_to_grid() {
        let gt = GeoTransform::new(0.0, 90.0, 30.0, -30.0);
        let aoi = AreaOfInterest::from_bbox(-500.0, -500.0, 40.0, 500.0).unwrap();
        assert_eq!(
            aoi.pixel_window(&gt, 3, 3),
            Some(PixelWindow { row: 0, col: 0, rows: 3, cols: 1 })
        );

        let outside = AreaOfInterest::from_bbox(1000.0, 1000.0, 2000.0, 2000.0).unwrap();
        assert_eq!(outside.pixel_window(&gt, 3, 3), None);
    }

    #[test]
    fn clip_masks_outside_pixels() {
        let mut raster: Raster<f64> = Raster::filled(2, 2, 1.0);
        raster.set_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0));
        // Covers only the left column (pixel centers at x = 15)
        let aoi = AreaOfInterest::from_bbox(0.0, 0.0, 30.0, 60.0).unwrap();

        let clipped = aoi.clip(&raster).unwrap();
        assert_eq!(clipped.value(0, 0).unwrap(), Some(1.0));
        assert_eq!(clipped.value(1, 0).unwrap(), Some(1.0));
        assert_eq!(clipped.value(0, 1).unwrap(), None);
        assert_eq!(clipped.value(1, 1).unwrap(), None);
    }
}
