//! # Nightlight Core
//!
//! Core types and I/O collaborators for night-light economic analysis.
//!
//! This crate provides:
//! - `MaskedGrid`: immutable radiance grid with a no-data validity mask
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Boundary`: named polygon footprints with attributes (GDP estimate)
//! - `RasterSource` / `BoundarySource`: interfaces to the file readers

pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use error::{Error, Result};
pub use io::{RasterBand, RasterSource};
pub use raster::{GeoTransform, MaskedGrid};
pub use vector::{Boundary, BoundarySource, Envelope};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{GeoTiffSource, InMemorySource, RasterBand, RasterSource};
    pub use crate::raster::{GeoTransform, MaskedGrid};
    pub use crate::vector::{
        find_boundary, AttributeValue, Boundary, BoundarySource, Envelope, GeoJsonBoundaries,
        InMemoryBoundaries,
    };
}
