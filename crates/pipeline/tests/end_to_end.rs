//! Full runs over synthetic Landsat scenes.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use urbanheat_catalog::LocalCatalog;
use urbanheat_core::io::{
    write_geotiff, CollectionQuery, GeoTiffDirectorySink, ImagerySource, MemorySink, RasterSink,
};
use urbanheat_core::{AreaOfInterest, Band, Error, GeoTransform, Image, Raster, Result, CRS};
use urbanheat_pipeline::{export_outputs, map_layers, run_pipeline, PipelineConfig};

const ROWS: usize = 4;
const COLS: usize = 4;
const X0: f64 = 600_000.0;
const Y0: f64 = 4_000_120.0;

fn band(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
    let data = (0..ROWS * COLS).map(|i| f(i / COLS, i % COLS)).collect();
    let mut r = Raster::from_vec(data, ROWS, COLS).unwrap();
    r.set_transform(GeoTransform::new(X0, Y0, 30.0, -30.0));
    r.set_crs(Some(CRS::utm(11, true)));
    r.set_nodata(Some(f64::NAN));
    r
}

fn nir_dn(row: usize, col: usize, k: usize) -> f64 {
    20_000.0 + 1_000.0 * (row * COLS + col) as f64 + 50.0 * k as f64
}

fn red_dn(k: usize) -> f64 {
    12_000.0 + 10.0 * k as f64
}

fn thermal_dn(row: usize, col: usize, k: usize) -> f64 {
    44_000.0 + 100.0 * (row + col) as f64 + 10.0 * k as f64
}

/// Raw Collection 2 Level-2 scene; `k` shifts every value slightly so the
/// median picks the middle scene.
fn scene(k: usize, date: NaiveDate) -> Image {
    let mut bands = Vec::new();
    for i in 1..=7 {
        let name = format!("SR_B{}", i);
        let raster = match i {
            4 => band(|_, _| red_dn(k)),
            5 => band(|r, c| nir_dn(r, c, k)),
            _ => band(|_, _| 9_000.0 + 100.0 * i as f64),
        };
        bands.push(Band::new(name, raster));
    }
    bands.push(Band::new("ST_B10", band(|r, c| thermal_dn(r, c, k))));
    bands.push(Band::new("QA_PIXEL", band(|_, _| 21_824.0)));
    Image::new(bands)
        .unwrap()
        .with_id(format!("scene-{}", k))
        .with_acquired(date)
}

struct Scenes(Vec<Image>);

impl ImagerySource for Scenes {
    fn query_collection(&self, query: &CollectionQuery) -> Result<Vec<Image>> {
        Ok(self
            .0
            .iter()
            .filter(|img| img.acquired().map_or(false, |d| query.contains_date(d)))
            .cloned()
            .collect())
    }
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

/// Three summer scenes plus one outside the date range, given in
/// non-chronological order.
fn summer() -> Scenes {
    Scenes(vec![
        scene(2, date(8, 20)),
        scene(0, date(6, 10)),
        scene(9, date(9, 1)),
        scene(1, date(7, 15)),
    ])
}

/// Upper-left 3 x 3 pixels
fn aoi() -> AreaOfInterest {
    AreaOfInterest::from_bbox(X0, Y0 - 90.0, X0 + 90.0, Y0).unwrap()
}

fn reflectance(dn: f64) -> f64 {
    dn * 0.0000275 - 0.2
}

fn kelvin(dn: f64) -> f64 {
    dn * 0.00341802 + 149.0
}

fn expected_ndvi(row: usize, col: usize) -> f64 {
    let nir = reflectance(nir_dn(row, col, 1));
    let red = reflectance(red_dn(1));
    (nir - red) / (nir + red)
}

#[test]
fn chain_matches_closed_forms() {
    let cfg = PipelineConfig::default();
    let out = run_pipeline(&summer(), &aoi(), &cfg).unwrap();
    assert_eq!(out.image_count, 3);

    // median of scenes 0, 1, 2 is scene 1
    let red = out.composite.band("SR_B4").unwrap();
    assert_relative_eq!(red.get(1, 1).unwrap(), reflectance(red_dn(1)), epsilon = 1e-9);
    assert_eq!(out.composite.band("QA_PIXEL").unwrap().get(0, 0).unwrap(), 21_824.0);

    // clipped outside the region
    assert_eq!(out.ndvi.value(3, 3).unwrap(), None);
    assert_eq!(out.lst.value(0, 3).unwrap(), None);

    let ndvi_min = expected_ndvi(0, 0);
    let ndvi_max = expected_ndvi(2, 2);
    assert_relative_eq!(out.ndvi_stats.min.unwrap(), ndvi_min, epsilon = 1e-12);
    assert_relative_eq!(out.ndvi_stats.max.unwrap(), ndvi_max, epsilon = 1e-12);
    assert_eq!(out.ndvi_stats.count, 9);

    assert_relative_eq!(out.fv.get(0, 0).unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(out.fv.get(2, 2).unwrap(), 1.0, epsilon = 1e-12);

    let fv = ((expected_ndvi(1, 2) - ndvi_min) / (ndvi_max - ndvi_min)).powi(2);
    let em = fv * 0.004 + 0.986;
    assert_relative_eq!(out.em.get(1, 2).unwrap(), em, epsilon = 1e-12);

    let tb = kelvin(thermal_dn(1, 2, 1));
    let lst = tb / (1.0 + (0.00115 * (tb / 0.48359547432)) * em.ln()) - 273.15;
    assert_relative_eq!(out.lst.get(1, 2).unwrap(), lst, epsilon = 1e-6);

    let summary = out.summary().unwrap();
    assert_eq!(summary.pixel_count, 9);
    let uhi = (lst - summary.lst_mean) / summary.lst_std_dev;
    assert_relative_eq!(out.uhi.get(1, 2).unwrap(), uhi, epsilon = 1e-9);
    let utfvi = (lst - summary.lst_mean) / lst;
    assert_relative_eq!(out.utfvi.get(1, 2).unwrap(), utfvi, epsilon = 1e-12);
}

#[test]
fn uhi_is_standardized_over_the_region() {
    let out = run_pipeline(&summer(), &aoi(), &PipelineConfig::default()).unwrap();
    let values: Vec<f64> = out.uhi.valid_values().filter(|v| v.is_finite()).collect();
    assert_eq!(values.len(), 9);

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
    assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-9);
}

#[test]
fn layers_in_display_order() {
    let cfg = PipelineConfig::default();
    let out = run_pipeline(&summer(), &aoi(), &cfg).unwrap();
    let layers = map_layers(&out, &cfg).unwrap();

    let labels: Vec<&str> = layers.iter().map(|l| l.label.as_str()).collect();
    assert_eq!(labels, vec!["True Color (432)", "NDVI", "LST", "UHI", "UTFVI"]);
    assert_eq!(layers[0].image.band_names(), vec!["SR_B4", "SR_B3", "SR_B2"]);

    for layer in &layers {
        let rgba = urbanheat_colormap::render_layer(layer).unwrap();
        assert_eq!(rgba.len(), ROWS * COLS * 4);
        // outside the region is transparent
        assert_eq!(rgba[(3 * COLS + 3) * 4 + 3], 0);
    }
}

#[test]
fn exports_read_back_within_f32_precision() {
    let cfg = PipelineConfig::default();
    let out = run_pipeline(&summer(), &aoi(), &cfg).unwrap();
    let sink = MemorySink::new();
    let reports = export_outputs(&out, &sink, &cfg, &aoi()).unwrap();
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.location.starts_with("memory://")));
    // Cropped to the 3x3 block under the region
    assert!(reports.iter().all(|r| (r.rows, r.cols) == (3, 3)));

    let lst = sink.read("LST_export").unwrap();
    let back = lst.band("LST").unwrap();
    assert_eq!(back.shape(), (3, 3));
    for (row, col) in [(0, 0), (1, 2), (2, 2)] {
        let expected = out.lst.get(row, col).unwrap();
        assert_relative_eq!(back.get(row, col).unwrap(), expected, max_relative = 1e-6);
    }
    assert_eq!(lst.transform().map(|t| (t.origin_x, t.origin_y)), Some((X0, Y0)));

    let rgb = sink.read("TrueColor_export").unwrap();
    assert_eq!(rgb.band_names(), vec!["SR_B4", "SR_B3", "SR_B2"]);
    assert_eq!(rgb.shape(), (3, 3));
    assert_eq!(rgb.crs().and_then(CRS::epsg), Some(32611));
}

#[test]
fn undefined_ndvi_is_reported() {
    let scenes = Scenes(
        summer()
            .0
            .into_iter()
            .map(|img| {
                let gaps = Image::new(vec![
                    Band::new("SR_B4", band(|_, _| f64::NAN)),
                    Band::new("SR_B5", band(|_, _| f64::NAN)),
                ])
                .unwrap();
                img.add_bands(&gaps, true).unwrap()
            })
            .collect(),
    );
    let err = run_pipeline(&scenes, &aoi(), &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, Error::NoValidPixels { band } if band.starts_with("NDVI")));
}

#[test]
fn region_over_pixel_ceiling_is_refused() {
    let cfg = PipelineConfig {
        max_pixels: 8,
        ..PipelineConfig::default()
    };
    let err = run_pipeline(&summer(), &aoi(), &cfg).unwrap_err();
    assert!(matches!(err, Error::PixelLimitExceeded { pixels: 9, max_pixels: 8 }));
}

#[test]
fn scale_must_match_the_imagery() {
    let cfg = PipelineConfig {
        scale: 60.0,
        ..PipelineConfig::default()
    };
    let err = run_pipeline(&summer(), &aoi(), &cfg).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "scale", .. }));
}

#[test]
fn local_catalog_to_geotiff_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut features = Vec::new();
    for (k, day) in [(0, date(6, 10)), (1, date(7, 15)), (2, date(8, 20))] {
        let img = scene(k, day);
        let scene_dir = dir.path().join(format!("scene{}", k));
        std::fs::create_dir_all(&scene_dir).unwrap();

        let mut assets = serde_json::Map::new();
        for b in img.bands() {
            let file = format!("scene{}/{}.tif", k, b.name);
            write_geotiff(&b.raster, dir.path().join(&file), None).unwrap();
            assets.insert(
                b.name.clone(),
                serde_json::json!({"href": file, "type": "image/tiff; application=geotiff"}),
            );
        }
        features.push(serde_json::json!({
            "type": "Feature",
            "id": format!("LC09_{}", day.format("%Y%m%d")),
            "properties": {
                "datetime": format!("{}T18:00:00Z", day),
                "proj:epsg": 32611,
                "proj:bbox": [X0, Y0 - 120.0, X0 + 120.0, Y0]
            },
            "assets": assets,
            "collection": "LANDSAT/LC09/C02/T1_L2"
        }));
    }
    let catalog_path = dir.path().join("items.json");
    let collection = serde_json::json!({"type": "FeatureCollection", "features": features});
    std::fs::write(&catalog_path, collection.to_string()).unwrap();

    let catalog = LocalCatalog::open(&catalog_path).unwrap();
    let cfg = PipelineConfig::default();
    let out = run_pipeline(&catalog, &aoi(), &cfg).unwrap();
    assert_eq!(out.image_count, 3);

    let in_memory = run_pipeline(&summer(), &aoi(), &cfg).unwrap();
    assert_relative_eq!(
        out.lst_stats.mean.unwrap(),
        in_memory.lst_stats.mean.unwrap(),
        max_relative = 1e-5
    );

    let sink = GeoTiffDirectorySink::new(dir.path().join("exports"));
    export_outputs(&out, &sink, &cfg, &aoi()).unwrap();
    for name in ["NDVI_export", "LST_export", "UHI_export", "UTFVI_export", "TrueColor_export"] {
        assert!(dir.path().join("exports").join(format!("{}.tif", name)).exists());
    }
    let ndvi = sink.read("NDVI_export").unwrap();
    assert_relative_eq!(
        ndvi.band("NDVI").unwrap().get(1, 1).unwrap(),
        expected_ndvi(1, 1),
        max_relative = 1e-5
    );
}
