//! End-to-end checks of the index chain on a synthetic scene.
//!
//! The scene is a 6x6 grid at 30 m: a vegetated western half, a paved
//! eastern half and one water pixel. Digital numbers are chosen so the
//! scaled reflectances are round values.

use approx::assert_relative_eq;
use urbanheat_algorithms::imagery::{
    apply_scale_factors, emissivity, land_surface_temperature, median_composite, ndvi,
    urban_heat_island, utfvi, vegetation_fraction, ScaleFactors,
};
use urbanheat_algorithms::statistics::{reduce_region, Reducer, RegionParams};
use urbanheat_core::{AreaOfInterest, Band, GeoTransform, Image, Raster, CRS};

const SIZE: usize = 6;

/// Inverse of the reflectance scale: DN that scales to `r`
fn sr_dn(r: f64) -> f64 {
    (r + 0.2) / 0.0000275
}

/// Inverse of the thermal scale: DN that scales to `kelvin`
fn st_dn(kelvin: f64) -> f64 {
    (kelvin - 149.0) / 0.00341802
}

fn band(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
    let mut r = Raster::new(SIZE, SIZE);
    r.set_transform(GeoTransform::new(600_000.0, 4_000_180.0, 30.0, -30.0));
    r.set_crs(Some(CRS::utm(11, true)));
    for row in 0..SIZE {
        for col in 0..SIZE {
            r.set(row, col, f(row, col)).unwrap();
        }
    }
    r
}

fn scene(kelvin_shift: f64) -> Image {
    let red = band(|row, col| match (row, col) {
        (0, 0) => sr_dn(0.06),
        (_, c) if c < SIZE / 2 => sr_dn(0.05),
        _ => sr_dn(0.20),
    });
    let nir = band(|row, col| match (row, col) {
        (0, 0) => sr_dn(0.02),
        (_, c) if c < SIZE / 2 => sr_dn(0.45),
        _ => sr_dn(0.25),
    });
    let st = band(|_, col| st_dn(300.0 + col as f64 * 2.0 + kelvin_shift));
    let qa = band(|_, _| 21824.0);

    Image::new(vec![
        Band::new("SR_B4", red),
        Band::new("SR_B5", nir),
        Band::new("ST_B10", st),
        Band::new("QA_PIXEL", qa),
    ])
    .unwrap()
}

#[test]
fn full_chain_on_synthetic_scene() {
    let factors = ScaleFactors {
        reflectance_bands: vec!["SR_B4".into(), "SR_B5".into()],
        ..ScaleFactors::landsat_c2_l2()
    };
    let scenes: Vec<Image> = [-1.0, 0.0, 1.0]
        .iter()
        .map(|&shift| apply_scale_factors(&scene(shift), &factors).unwrap())
        .collect();
    let composite = median_composite(&scenes).unwrap();
    assert_eq!(
        composite.band_names(),
        vec!["SR_B4", "SR_B5", "ST_B10", "QA_PIXEL"]
    );

    let extent = SIZE as f64 * 30.0;
    let aoi = AreaOfInterest::from_bbox(600_000.0, 4_000_000.0, 600_000.0 + extent, 4_000_000.0 + extent)
        .unwrap();
    let params = RegionParams::default();

    let ndvi = ndvi(composite.band("SR_B5").unwrap(), composite.band("SR_B4").unwrap()).unwrap();
    assert_relative_eq!(ndvi.get(1, 0).unwrap(), 0.8, epsilon = 1e-9);
    assert_relative_eq!(ndvi.get(1, 5).unwrap(), 1.0 / 9.0, epsilon = 1e-9);
    assert_relative_eq!(ndvi.get(0, 0).unwrap(), -0.5, epsilon = 1e-9);

    let ndvi_stats = reduce_region(&ndvi, &aoi, params).unwrap();
    let ndvi_min = ndvi_stats.require(Reducer::Min, "NDVI").unwrap();
    let ndvi_max = ndvi_stats.require(Reducer::Max, "NDVI").unwrap();
    assert_relative_eq!(ndvi_min, -0.5, epsilon = 1e-9);
    assert_relative_eq!(ndvi_max, 0.8, epsilon = 1e-9);

    let fv = vegetation_fraction(&ndvi, ndvi_min, ndvi_max).unwrap();
    assert_relative_eq!(fv.get(0, 0).unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(fv.get(2, 1).unwrap(), 1.0, epsilon = 1e-12);

    let em = emissivity(&fv).unwrap();
    let lst = land_surface_temperature(composite.band("ST_B10").unwrap(), &em).unwrap();

    // Median of the three shifted scenes is the unshifted temperature
    let tb = 300.0 + 5.0 * 2.0;
    let e = em.get(3, 5).unwrap();
    let expected = tb / (1.0 + (0.00115 * (tb / 0.48359547432)) * e.ln()) - 273.15;
    assert_relative_eq!(lst.get(3, 5).unwrap(), expected, epsilon = 1e-6);

    let lst_stats = reduce_region(&lst, &aoi, params).unwrap();
    assert_eq!(lst_stats.count, (SIZE * SIZE) as u64);
    let mean = lst_stats.require(Reducer::Mean, "LST").unwrap();
    let std = lst_stats.require(Reducer::StdDev, "LST").unwrap();

    let uhi = urban_heat_island(&lst, mean, std).unwrap();
    let uhi_stats = reduce_region(&uhi, &aoi, params).unwrap();
    assert_relative_eq!(uhi_stats.mean.unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(uhi_stats.std_dev.unwrap(), 1.0, epsilon = 1e-9);

    let u = utfvi(&lst, mean).unwrap();
    let hot = lst.get(3, 5).unwrap();
    assert_relative_eq!(u.get(3, 5).unwrap(), (hot - mean) / hot, epsilon = 1e-12);
    // Paved, hotter east side sits above the regional mean
    assert!(uhi.get(3, 5).unwrap() > 0.0 && uhi.get(3, 0).unwrap() < 0.0);
}
