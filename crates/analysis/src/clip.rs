//! Clip a masked grid to a boundary
//!
//! The grid is cropped to the pixel window covering the boundary's bounding
//! envelope. What happens to pixels inside that window but outside the actual
//! footprint depends on [`ClipMode`]:
//!
//! - [`ClipMode::Envelope`] keeps them. This is a bounding-box
//!   approximation of a polygon clip: statistics include every pixel of the
//!   envelope, including sea and neighbouring countries.
//! - [`ClipMode::Exact`] masks every pixel whose center is not inside the
//!   footprint (holes count as outside).
//!
//! Either way the returned [`ClippedGrid::outside`] mask records which window
//! pixels fall outside the footprint.

use ndarray::Array2;
use nightlight_core::{Boundary, Envelope, Error, GeoTransform, MaskedGrid, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Snap tolerance for pixel edges computed through the inverse transform
const EDGE_EPS: f64 = 1e-9;

/// How pixels outside the footprint but inside the envelope are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMode {
    /// Bounding-box crop; footprint is not applied to the mask
    #[default]
    Envelope,
    /// Bounding-box crop plus point-in-polygon masking of pixel centers
    Exact,
}

/// Pixel window into a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub rows: usize,
    pub cols: usize,
}

/// Result of clipping a grid to a boundary
#[derive(Debug, Clone)]
pub struct ClippedGrid {
    /// Cropped grid with its own transform
    pub grid: MaskedGrid,
    /// `true` where the pixel center lies outside the footprint
    pub outside: Array2<bool>,
    /// Window in the source grid
    pub window: PixelWindow,
}

impl ClippedGrid {
    /// Number of window pixels outside the footprint
    pub fn outside_count(&self) -> usize {
        self.outside.iter().filter(|&&o| o).count()
    }
}

fn snap_floor(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < EDGE_EPS {
        r
    } else {
        v.floor()
    }
}

fn snap_ceil(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < EDGE_EPS {
        r
    } else {
        v.ceil()
    }
}

/// Pixel window covering `envelope`, clamped to a `rows` x `cols` grid.
///
/// All four envelope corners go through the inverse transform, so rotated
/// grids get the enclosing window. Fails with [`Error::OutOfBounds`] when the
/// clamped window has zero area.
pub fn pixel_window(
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    envelope: &Envelope,
) -> Result<PixelWindow> {
    if !transform.is_invertible() {
        return Err(Error::InvalidParameter {
            name: "transform",
            value: format!("{:?}", transform.to_gdal()),
            reason: "affine transform is not invertible".into(),
        });
    }

    let (mut col_min, mut col_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut row_min, mut row_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in envelope.corners() {
        let (c, r) = transform.geo_to_pixel(x, y);
        col_min = col_min.min(c);
        col_max = col_max.max(c);
        row_min = row_min.min(r);
        row_max = row_max.max(r);
    }

    let out_of_bounds = || Error::OutOfBounds {
        min_x: envelope.min_x,
        min_y: envelope.min_y,
        max_x: envelope.max_x,
        max_y: envelope.max_y,
    };

    if !(col_min.is_finite() && col_max.is_finite() && row_min.is_finite() && row_max.is_finite()) {
        return Err(out_of_bounds());
    }

    let c0 = snap_floor(col_min).clamp(0.0, cols as f64) as usize;
    let c1 = snap_ceil(col_max).clamp(0.0, cols as f64) as usize;
    let r0 = snap_floor(row_min).clamp(0.0, rows as f64) as usize;
    let r1 = snap_ceil(row_max).clamp(0.0, rows as f64) as usize;

    if c1 <= c0 || r1 <= r0 {
        return Err(out_of_bounds());
    }

    Ok(PixelWindow {
        row_off: r0,
        col_off: c0,
        rows: r1 - r0,
        cols: c1 - c0,
    })
}

/// Clip a grid to a boundary.
///
/// Returns a new grid restricted to the envelope window; the input is not
/// modified. With [`ClipMode::Envelope`] (the default) this is a bounding-box
/// approximation: window pixels outside the polygon stay valid. Use
/// [`ClipMode::Exact`] to mask them.
pub fn clip(grid: &MaskedGrid, boundary: &Boundary, mode: ClipMode) -> Result<ClippedGrid> {
    let envelope = boundary.envelope().ok_or_else(|| Error::InvalidParameter {
        name: "boundary",
        value: boundary.name.clone(),
        reason: "footprint is empty".into(),
    })?;

    let (rows, cols) = grid.shape();
    let window = pixel_window(grid.transform(), rows, cols, &envelope)?;
    let cropped = grid.window(window.row_off, window.col_off, window.rows, window.cols)?;

    let gt = *cropped.transform();
    let outside = Array2::from_shape_fn((window.rows, window.cols), |(r, c)| {
        let (x, y) = gt.pixel_to_geo(c, r);
        !boundary.contains_point(x, y)
    });

    let grid = match mode {
        ClipMode::Envelope => cropped,
        ClipMode::Exact => cropped.with_mask(outside.mapv(|o| !o).view())?,
    };

    debug!(
        "Clipped {} to {}x{} window at ({}, {}), {} valid cells ({:?})",
        boundary.name,
        window.rows,
        window.cols,
        window.row_off,
        window.col_off,
        grid.valid_count(),
        mode
    );

    Ok(ClippedGrid {
        grid,
        outside,
        window,
    })
}
