//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for single-band TIFF I/O. Georeferencing comes from
//! ModelPixelScale + ModelTiepoint, the no-data sentinel from GDAL_NODATA.

use crate::error::{Error, Result};
use crate::io::RasterBand;
use crate::raster::{GeoTransform, MaskedGrid};
use ndarray::Array2;
use num_traits::ToPrimitive;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

/// Read the first band of a GeoTIFF file
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<RasterBand> {
    let file = File::open(path.as_ref())?;
    debug!("Decoding {}", path.as_ref().display());
    decode_geotiff(BufReader::new(file))
}

/// Read the first band of an in-memory GeoTIFF
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<RasterBand> {
    decode_geotiff(Cursor::new(data))
}

fn to_f64_vec<S: ToPrimitive>(buf: Vec<S>) -> Vec<f64> {
    buf.into_iter().map(|v| v.to_f64().unwrap_or(f64::NAN)).collect()
}

/// Decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<R>(reader: R) -> Result<RasterBand>
where
    R: std::io::Read + std::io::Seek,
{
    // Global night-light composites exceed the default decoder limits.
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let single_precision = matches!(result, DecodingResult::F32(_));
    let data: Vec<f64> = match result {
        DecodingResult::F32(buf) => to_f64_vec(buf),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => to_f64_vec(buf),
        DecodingResult::U16(buf) => to_f64_vec(buf),
        DecodingResult::U32(buf) => to_f64_vec(buf),
        DecodingResult::U64(buf) => to_f64_vec(buf),
        DecodingResult::I8(buf) => to_f64_vec(buf),
        DecodingResult::I16(buf) => to_f64_vec(buf),
        DecodingResult::I32(buf) => to_f64_vec(buf),
        DecodingResult::I64(buf) => to_f64_vec(buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    // Multi-sample images interleave bands; keep band 1.
    let samples = rows * cols;
    let data = if samples > 0 && data.len() > samples && data.len() % samples == 0 {
        let stride = data.len() / samples;
        debug!("Interleaved image with {} samples per pixel, keeping band 1", stride);
        data.into_iter().step_by(stride).collect()
    } else {
        data
    };

    if data.len() != samples {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
            len: data.len(),
        });
    }

    let values = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| Error::Other(e.to_string()))?;

    let transform = read_geotransform(&mut decoder).unwrap_or_else(|_| {
        debug!("No georeferencing tags, using identity transform");
        GeoTransform::default()
    });
    // Float32 samples only match a sentinel narrowed to the same precision.
    let nodata = read_nodata(&mut decoder).map(|nd| {
        if single_precision {
            nd as f32 as f64
        } else {
            nd
        }
    });

    Ok(RasterBand {
        values,
        nodata,
        transform,
    })
}

/// GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// No-data sentinel from the GDAL_NODATA ASCII tag
fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()?;
    let text = text.trim_matches(char::from(0)).trim();
    match text.to_ascii_lowercase().as_str() {
        "nan" | "-nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

/// Write a grid to a GeoTIFF file as 32-bit float.
///
/// Masked cells are written as the grid's sentinel (NaN when it has none).
pub fn write_geotiff<P: AsRef<Path>>(grid: &MaskedGrid, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    encode_geotiff(grid, file)
}

/// Write a grid to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(grid: &MaskedGrid) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(grid, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_geotiff<W>(grid: &MaskedGrid, writer: W) -> Result<()>
where
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = grid.shape();
    let fill = grid.nodata().map_or(f32::NAN, |nd| nd as f32);

    let data: Vec<f32> = grid
        .values()
        .iter()
        .zip(grid.valid().iter())
        .map(|(&v, &ok)| if ok { v as f32 } else { fill })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = grid.transform();

    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GTModelTypeGeoKey = Geographic, GTRasterTypeGeoKey = RasterPixelIsArea
    let geokeys: Vec<u16> = vec![
        1, 1, 0, 2, //
        1024, 0, 1, 2, //
        1025, 0, 1, 1,
    ];
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    let nodata_text = if fill.is_nan() { "nan".to_string() } else { fill.to_string() };
    image
        .encoder()
        .write_tag(Tag::GdalNodata, nodata_text.as_str())
        .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_roundtrip_keeps_mask_and_transform() {
        let grid = MaskedGrid::from_vec(
            vec![0.5, 12.0, -999.0, 3.25, 60.0, 0.0],
            2,
            3,
            Some(-999.0),
            GeoTransform::new(-70.0, -30.0, 0.5, -0.5),
        )
        .unwrap();

        let bytes = write_geotiff_to_buffer(&grid).unwrap();
        let band = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(band.nodata, Some(-999.0));
        assert_eq!(band.transform, *grid.transform());

        let back = band.into_grid().unwrap();
        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.valid_count(), 5);
        assert_eq!(back.value_at(1, 0), Some(3.25));
        assert_eq!(back.value_at(0, 2), None);
    }

    #[test]
    fn test_roundtrip_with_sentinel_not_representable_in_f32() {
        let grid = MaskedGrid::from_vec(
            vec![1.0, -999.9, 3.0, -999.9],
            2,
            2,
            Some(-999.9),
            GeoTransform::default(),
        )
        .unwrap();

        let bytes = write_geotiff_to_buffer(&grid).unwrap();
        let band = read_geotiff_from_buffer(&bytes).unwrap();
        assert_eq!(band.nodata, Some(-999.9_f32 as f64));

        let back = band.into_grid().unwrap();
        assert_eq!(back.valid_count(), 2);
        assert_eq!(back.value_at(0, 1), None);
        assert_eq!(back.valid_values().sum::<f64>(), 4.0);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(read_geotiff_from_buffer(b"definitely not a tiff").is_err());
    }
}
