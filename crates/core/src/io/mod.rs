//! Raster sources: the collaborators that turn files into masked grids

mod native;

pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};

use crate::error::Result;
use crate::raster::{GeoTransform, MaskedGrid};
use ndarray::Array2;
use std::path::{Path, PathBuf};

/// One decoded raster band: samples, sentinel and georeferencing
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub values: Array2<f64>,
    pub nodata: Option<f64>,
    pub transform: GeoTransform,
}

impl RasterBand {
    /// Build the masked grid for this band
    pub fn into_grid(self) -> Result<MaskedGrid> {
        MaskedGrid::new(self.values, self.nodata, self.transform)
    }
}

/// Supplier of a single raster band
pub trait RasterSource {
    /// Decode the band
    fn read(&self) -> Result<RasterBand>;

    /// Decode the band and build its masked grid
    fn load(&self) -> Result<MaskedGrid> {
        self.read()?.into_grid()
    }
}

/// GeoTIFF file on disk
#[derive(Debug, Clone)]
pub struct GeoTiffSource {
    path: PathBuf,
}

impl GeoTiffSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RasterSource for GeoTiffSource {
    fn read(&self) -> Result<RasterBand> {
        read_geotiff(&self.path)
    }
}

/// Band already held in memory
#[derive(Debug, Clone)]
pub struct InMemorySource {
    band: RasterBand,
}

impl InMemorySource {
    pub fn new(values: Array2<f64>, nodata: Option<f64>, transform: GeoTransform) -> Self {
        Self {
            band: RasterBand {
                values,
                nodata,
                transform,
            },
        }
    }
}

impl RasterSource for InMemorySource {
    fn read(&self) -> Result<RasterBand> {
        Ok(self.band.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_in_memory_source_load() {
        let values = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 3.0, 0.0]).unwrap();
        let source = InMemorySource::new(values, Some(0.0), GeoTransform::default());
        let grid = source.load().unwrap();
        assert_eq!(grid.valid_count(), 2);
    }

    #[test]
    fn test_empty_band_fails_on_load() {
        let source = InMemorySource::new(Array2::zeros((0, 0)), None, GeoTransform::default());
        assert!(matches!(source.load(), Err(Error::EmptyGrid { .. })));
    }

    #[test]
    fn test_missing_file() {
        let source = GeoTiffSource::new("/nonexistent/VIIRS_2023_global.tif");
        assert!(matches!(source.read(), Err(Error::Io(_))));
    }
}
