//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is stored the way GDAL expects it:
//! ModelPixelScale + ModelTiepoint for the transform, a GeoKeyDirectory with
//! the EPSG code, GDAL_NODATA for the undefined-pixel marker, and the band
//! names as JSON in ImageDescription.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::image::{Band, Image};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    self, ColorType as EncodeColorType, Gray32Float, Gray64Float, RGB32Float, RGB64Float,
    RGBA32Float, RGBA64Float,
};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Sample type used when writing floating rasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplePrecision {
    #[default]
    Float32,
    Float64,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub precision: SamplePrecision,
}

// ─── Reading ────────────────────────────────────────────────────────────

/// Read one band (0-based, default 0) of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_band(file, band.unwrap_or(0))
}

/// Read one band of an in-memory GeoTIFF
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8], band: Option<usize>) -> Result<Raster<T>> {
    decode_band(Cursor::new(data), band.unwrap_or(0))
}

/// Read every band of a GeoTIFF file as an [`Image`]
pub fn read_geotiff_image<P: AsRef<Path>>(path: P) -> Result<Image> {
    let file = File::open(path.as_ref())?;
    decode_image(file)
}

/// Read every band of an in-memory GeoTIFF as an [`Image`]
pub fn read_geotiff_image_from_buffer(data: &[u8]) -> Result<Image> {
    decode_image(Cursor::new(data))
}

struct Decoded {
    rows: usize,
    cols: usize,
    samples: usize,
    data: Vec<f64>,
    transform: Option<GeoTransform>,
    crs: Option<CRS>,
    nodata: Option<f64>,
    band_names: Option<Vec<String>>,
}

impl Decoded {
    fn band<T: RasterElement>(&self, band: usize) -> Result<Raster<T>> {
        if band >= self.samples {
            return Err(Error::InvalidParameter {
                name: "band",
                value: band.to_string(),
                reason: format!("file has {} band(s)", self.samples),
            });
        }
        let values: Vec<T> = self
            .data
            .iter()
            .skip(band)
            .step_by(self.samples)
            .map(|&v| num_traits::cast(v).unwrap_or_else(T::undefined))
            .collect();

        let mut raster = Raster::from_vec(values, self.rows, self.cols)?;
        if let Some(gt) = self.transform {
            raster.set_transform(gt);
        }
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata.and_then(num_traits::cast));
        Ok(raster)
    }
}

fn decode_band<T: RasterElement, R: Read + Seek>(reader: R, band: usize) -> Result<Raster<T>> {
    decode(reader)?.band(band)
}

fn decode_image<R: Read + Seek>(reader: R) -> Result<Image> {
    let decoded = decode(reader)?;
    let names = match &decoded.band_names {
        Some(names) if names.len() == decoded.samples => names.clone(),
        _ => (1..=decoded.samples).map(|i| format!("B{}", i)).collect(),
    };

    let bands = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| Ok(Band::new(name, decoded.band::<f64>(i)?)))
        .collect::<Result<Vec<_>>>()?;
    Image::new(bands)
}

macro_rules! to_f64_vec {
    ($buf:expr) => {
        $buf.into_iter().map(|v| v as f64).collect::<Vec<f64>>()
    };
}

fn decode<R: Read + Seek>(reader: R) -> Result<Decoded> {
    let mut decoder = Decoder::new(reader)?;

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let samples = match decoder.colortype()? {
        ColorType::Gray(_) => 1,
        ColorType::RGB(_) => 3,
        ColorType::RGBA(_) => 4,
        ColorType::Multiband { num_samples, .. } => num_samples as usize,
        other => {
            return Err(Error::UnsupportedDataType(format!(
                "unsupported TIFF color type {:?}",
                other
            )))
        }
    };

    let data = match decoder.read_image()? {
        DecodingResult::U8(buf) => to_f64_vec!(buf),
        DecodingResult::U16(buf) => to_f64_vec!(buf),
        DecodingResult::U32(buf) => to_f64_vec!(buf),
        DecodingResult::U64(buf) => to_f64_vec!(buf),
        DecodingResult::I8(buf) => to_f64_vec!(buf),
        DecodingResult::I16(buf) => to_f64_vec!(buf),
        DecodingResult::I32(buf) => to_f64_vec!(buf),
        DecodingResult::I64(buf) => to_f64_vec!(buf),
        DecodingResult::F32(buf) => to_f64_vec!(buf),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols * samples {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let transform = read_geotransform(&mut decoder);
    let crs = read_epsg(&mut decoder).map(CRS::from_epsg);
    let nodata = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());
    let band_names = decoder
        .get_tag_ascii_string(Tag::ImageDescription)
        .ok()
        .and_then(|s| parse_band_names(&s));

    Ok(Decoded {
        rows,
        cols,
        samples,
        data,
        transform,
        crs,
        nodata,
        band_names,
    })
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// EPSG code from the GeoKeyDirectory (projected or geographic type key)
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).ok()?;
    keys.get(4..)?
        .chunks_exact(4)
        .filter(|entry| entry[1] == 0)
        .find(|entry| entry[0] == PROJECTED_CS_TYPE || entry[0] == GEOGRAPHIC_TYPE)
        .map(|entry| entry[3])
        .filter(|&code| code != USER_DEFINED)
        .map(u32::from)
}

fn parse_band_names(description: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(description.trim_matches(char::from(0))).ok()?;
    value
        .get("bands")?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ─── Writing ────────────────────────────────────────────────────────────

/// Write a Raster to a single-band GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    let plane = to_f64_plane(raster);
    let meta = GeoMeta::of(raster, vec!["B1".to_string()]);
    encode(file, &meta, &[plane], options.unwrap_or_default())
}

/// Write a Raster to an in-memory single-band GeoTIFF
pub fn write_geotiff_to_buffer<T: RasterElement>(
    raster: &Raster<T>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let plane = to_f64_plane(raster);
    let meta = GeoMeta::of(raster, vec!["B1".to_string()]);
    encode(Cursor::new(&mut buf), &meta, &[plane], options.unwrap_or_default())?;
    Ok(buf)
}

/// Write every band of an [`Image`] into one GeoTIFF file.
///
/// Supported band counts are 1, 3 and 4 (gray, RGB, RGBA layouts).
pub fn write_geotiff_image<P: AsRef<Path>>(image: &Image, path: P, options: Option<GeoTiffOptions>) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_image(file, image, options.unwrap_or_default())
}

/// Write every band of an [`Image`] into an in-memory GeoTIFF
pub fn write_geotiff_image_to_buffer(image: &Image, options: Option<GeoTiffOptions>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_image(Cursor::new(&mut buf), image, options.unwrap_or_default())?;
    Ok(buf)
}

/// Write an RGBA8 pixel buffer (e.g. a rendered map layer) as a georeferenced TIFF
pub fn write_rgba_tiff<P: AsRef<Path>>(
    path: P,
    rgba: &[u8],
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()> {
    if rgba.len() != rows * cols * 4 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let meta = GeoMeta {
        rows,
        cols,
        transform: *transform,
        crs: crs.cloned(),
        nodata: None,
        band_names: vec!["R", "G", "B", "A"].into_iter().map(String::from).collect(),
    };
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file)?;
    write_planes::<colortype::RGBA8, _>(&mut encoder, &meta, rgba)
}

struct GeoMeta {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<f64>,
    band_names: Vec<String>,
}

impl GeoMeta {
    fn of<T: RasterElement>(raster: &Raster<T>, band_names: Vec<String>) -> Self {
        Self {
            rows: raster.rows(),
            cols: raster.cols(),
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
            nodata: raster.nodata().and_then(RasterElement::to_f64),
            band_names,
        }
    }
}

fn to_f64_plane<T: RasterElement>(raster: &Raster<T>) -> Vec<f64> {
    raster
        .data()
        .iter()
        .map(|&v| v.to_f64().unwrap_or(f64::NAN))
        .collect()
}

fn encode_image<W: Write + Seek>(writer: W, image: &Image, options: GeoTiffOptions) -> Result<()> {
    let first = image
        .bands()
        .first()
        .ok_or_else(|| Error::Other("cannot write an image without bands".into()))?;
    let names = image.band_names().into_iter().map(String::from).collect();
    let meta = GeoMeta::of(&first.raster, names);
    let planes: Vec<Vec<f64>> = image.bands().iter().map(|b| to_f64_plane(&b.raster)).collect();
    encode(writer, &meta, &planes, options)
}

fn encode<W: Write + Seek>(writer: W, meta: &GeoMeta, planes: &[Vec<f64>], options: GeoTiffOptions) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let pixels = meta.rows * meta.cols;

    // Chunky (pixel-interleaved) layout
    let interleaved: Vec<f64> = (0..pixels)
        .flat_map(|i| planes.iter().map(move |p| p[i]))
        .collect();

    match (planes.len(), options.precision) {
        (1, SamplePrecision::Float32) => {
            write_planes::<Gray32Float, _>(&mut encoder, meta, &narrow(&interleaved))
        }
        (1, SamplePrecision::Float64) => write_planes::<Gray64Float, _>(&mut encoder, meta, &interleaved),
        (3, SamplePrecision::Float32) => {
            write_planes::<RGB32Float, _>(&mut encoder, meta, &narrow(&interleaved))
        }
        (3, SamplePrecision::Float64) => write_planes::<RGB64Float, _>(&mut encoder, meta, &interleaved),
        (4, SamplePrecision::Float32) => {
            write_planes::<RGBA32Float, _>(&mut encoder, meta, &narrow(&interleaved))
        }
        (4, SamplePrecision::Float64) => write_planes::<RGBA64Float, _>(&mut encoder, meta, &interleaved),
        (n, _) => Err(Error::UnsupportedDataType(format!(
            "cannot write {} bands; supported band counts are 1, 3 and 4",
            n
        ))),
    }
}

fn narrow(data: &[f64]) -> Vec<f32> {
    data.iter().map(|&v| v as f32).collect()
}

fn write_planes<C, W>(encoder: &mut TiffEncoder<W>, meta: &GeoMeta, data: &[C::Inner]) -> Result<()>
where
    C: EncodeColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image::<C>(meta.cols as u32, meta.rows as u32)?;
    let gt = &meta.transform;

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])?;

    let geokeys = geo_key_directory(meta.crs.as_ref());
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), geokeys.as_slice())?;

    if let Some(nd) = meta.nodata {
        let text = if nd.is_nan() { "nan".to_string() } else { nd.to_string() };
        image.encoder().write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())?;
    }

    let description = serde_json::json!({ "bands": meta.band_names }).to_string();
    image
        .encoder()
        .write_tag(Tag::ImageDescription, description.as_str())?;

    image.write_data(data)?;
    Ok(())
}

/// GeoKeyDirectory entries, sorted by key id as GeoTIFF requires
fn geo_key_directory(crs: Option<&CRS>) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();
    let geographic = crs.map_or(false, CRS::is_geographic);

    keys.push([GT_MODEL_TYPE, 0, 1, if geographic { 2 } else { 1 }]);
    keys.push([GT_RASTER_TYPE, 0, 1, 1]); // RasterPixelIsArea

    if let Some(code) = crs.and_then(CRS::epsg).and_then(|c| u16::try_from(c).ok()) {
        let key = if geographic { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        keys.push([key, 0, 1, code]);
    }

    let mut out = vec![1, 1, 0, keys.len() as u16];
    out.extend(keys.into_iter().flatten());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raster() -> Raster<f64> {
        let mut r = Raster::from_vec(vec![0.1, 0.2, f64::NAN, 0.4, 0.5, 0.6], 2, 3).unwrap();
        r.set_transform(GeoTransform::new(660_000.0, 4_010_000.0, 30.0, -30.0));
        r.set_crs(Some(CRS::utm(11, true)));
        r.set_nodata(Some(f64::NAN));
        r
    }

    #[test]
    fn single_band_roundtrip_keeps_georeferencing() {
        let raster = sample_raster();
        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf, None).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32611));
        assert!(back.nodata().unwrap().is_nan());
        assert_eq!(back.value(0, 2).unwrap(), None);
        assert!((back.get(1, 1).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn geokeys_and_nodata_tags_are_read_back() {
        let mut raster = Raster::from_vec(vec![-9999.0, 1.0, 2.0, 3.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(600_030.0, 4_000_090.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::utm(11, true)));
        raster.set_nodata(Some(-9999.0));

        let buf = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf, None).unwrap();

        let gt = back.transform();
        assert_eq!(gt.origin_x, 600_030.0);
        assert_eq!(gt.origin_y, 4_000_090.0);
        assert_eq!(gt.pixel_height, -30.0);
        assert_eq!(back.crs().and_then(|c| c.epsg()), Some(32611));
        assert_eq!(back.nodata(), Some(-9999.0));
        assert_eq!(back.value(0, 0).unwrap(), None);
    }

    #[test]
    fn float64_precision_is_exact() {
        let raster = sample_raster();
        let options = GeoTiffOptions {
            precision: SamplePrecision::Float64,
        };
        let buf = write_geotiff_to_buffer(&raster, Some(options)).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&buf, None).unwrap();
        assert_eq!(back.get(0, 1).unwrap(), 0.2);
    }

    #[test]
    fn three_band_image_roundtrip() {
        let base = sample_raster();
        let bands = ["SR_B4", "SR_B3", "SR_B2"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let data = base.data().iter().map(|v| v + i as f64).collect();
                Band::new(*name, base.derive(data, Some(f64::NAN)).unwrap())
            })
            .collect();
        let image = Image::new(bands).unwrap();

        let buf = write_geotiff_image_to_buffer(&image, None).unwrap();
        let back = read_geotiff_image_from_buffer(&buf).unwrap();

        assert_eq!(back.band_names(), vec!["SR_B4", "SR_B3", "SR_B2"]);
        let b2 = back.band("SR_B2").unwrap();
        assert!((b2.get(0, 0).unwrap() - 2.1).abs() < 1e-6);
        assert!(b2.get(0, 2).unwrap().is_nan());
    }

    #[test]
    fn two_band_image_is_rejected() {
        let base = sample_raster();
        let image = Image::new(vec![
            Band::new("a", base.clone()),
            Band::new("b", base),
        ])
        .unwrap();
        assert!(matches!(
            write_geotiff_image_to_buffer(&image, None),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn geographic_crs_uses_geographic_key() {
        let keys = geo_key_directory(Some(&CRS::wgs84()));
        assert_eq!(keys[3], 3);
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE, 0, 1, 2]);
        assert_eq!(&keys[12..16], &[GEOGRAPHIC_TYPE, 0, 1, 4326]);
    }

    #[test]
    fn file_roundtrip() {
        let raster = sample_raster();
        let tmp = tempfile::NamedTempFile::with_suffix(".tif").unwrap();
        write_geotiff(&raster, tmp.path(), None).unwrap();
        let back: Raster<f32> = read_geotiff(tmp.path(), None).unwrap();
        assert_eq!(back.shape(), raster.shape());
        assert!((back.get(0, 0).unwrap() - 0.1).abs() < 1e-6);
    }
}
