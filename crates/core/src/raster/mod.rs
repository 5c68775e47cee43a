//! Raster data structures

mod geotransform;
mod grid;

pub use geotransform::GeoTransform;
pub use grid::{is_nodata, MaskedGrid};
