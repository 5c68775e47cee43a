//! Masked raster grid

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::{s, Array2, ArrayView2, Zip};

/// A georeferenced 2D grid of radiance samples with a validity mask.
///
/// The mask is derived once at construction: a cell is invalid when its
/// sample equals the no-data sentinel or is NaN. Nothing mutates a grid
/// after it is built; clipping and windowing produce new grids.
///
/// Grids derived with [`MaskedGrid::with_mask`] may carry additional masked
/// cells whose samples differ from the sentinel (for example, pixels outside
/// a polygon footprint).
///
/// # Example
///
/// ```ignore
/// use nightlight_core::{GeoTransform, MaskedGrid};
///
/// let grid = MaskedGrid::from_vec(
///     vec![1.0, -999.0, 3.0, 4.0],
///     2,
///     2,
///     Some(-999.0),
///     GeoTransform::default(),
/// )?;
/// assert_eq!(grid.valid_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MaskedGrid {
    /// Samples stored in row-major order (row, col)
    values: Array2<f64>,
    /// `true` where the sample contributes to reductions
    valid: Array2<bool>,
    transform: GeoTransform,
    nodata: Option<f64>,
    valid_count: usize,
}

/// Whether a sample is masked by the given sentinel
pub fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => value == nd,
        None => false,
    }
}

impl MaskedGrid {
    /// Build a grid from samples, computing the validity mask.
    ///
    /// Fails with [`Error::EmptyGrid`] when the array has zero rows or columns.
    pub fn new(values: Array2<f64>, nodata: Option<f64>, transform: GeoTransform) -> Result<Self> {
        let (rows, cols) = values.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::EmptyGrid { rows, cols });
        }

        let valid = values.mapv(|v| !is_nodata(v, nodata));
        let valid_count = valid.iter().filter(|&&v| v).count();

        Ok(Self {
            values,
            valid,
            transform,
            nodata,
            valid_count,
        })
    }

    /// Build a grid from a row-major sample vector
    pub fn from_vec(
        data: Vec<f64>,
        rows: usize,
        cols: usize,
        nodata: Option<f64>,
        transform: GeoTransform,
    ) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
                len: data.len(),
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Self::new(array, nodata, transform)
    }

    /// Grid filled with a single value and the default transform
    pub fn filled(rows: usize, cols: usize, value: f64, nodata: Option<f64>) -> Result<Self> {
        Self::new(
            Array2::from_elem((rows, cols), value),
            nodata,
            GeoTransform::default(),
        )
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// Total number of cells, valid or not
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: empty grids cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    // Data access

    /// Read-only view of the samples
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Read-only view of the validity mask
    pub fn valid(&self) -> ArrayView2<'_, bool> {
        self.valid.view()
    }

    /// Sample at (row, col), or `None` if masked or out of range
    pub fn value_at(&self, row: usize, col: usize) -> Option<f64> {
        match self.valid.get((row, col)) {
            Some(true) => self.values.get((row, col)).copied(),
            _ => None,
        }
    }

    /// Number of cells that contribute to reductions
    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    /// Number of masked cells
    pub fn masked_count(&self) -> usize {
        self.len() - self.valid_count
    }

    /// Valid samples in row-major order
    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .zip(self.valid.iter())
            .filter_map(|(&v, &ok)| ok.then_some(v))
    }

    /// Minimum and maximum valid sample
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.valid_values().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    // Metadata

    /// The geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// The no-data sentinel
    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Derivation

    /// Sub-grid covering `rows` x `cols` cells starting at (row_off, col_off).
    ///
    /// The window keeps the mask of the parent and gets a transform shifted
    /// to its own origin. The window is clamped to the grid extent.
    pub fn window(&self, row_off: usize, col_off: usize, rows: usize, cols: usize) -> Result<Self> {
        let row_end = row_off.saturating_add(rows).min(self.rows());
        let col_end = col_off.saturating_add(cols).min(self.cols());
        if row_off >= row_end || col_off >= col_end {
            return Err(Error::EmptyGrid {
                rows: row_end.saturating_sub(row_off),
                cols: col_end.saturating_sub(col_off),
            });
        }

        let values = self.values.slice(s![row_off..row_end, col_off..col_end]).to_owned();
        let valid = self.valid.slice(s![row_off..row_end, col_off..col_end]).to_owned();
        let valid_count = valid.iter().filter(|&&v| v).count();

        Ok(Self {
            values,
            valid,
            transform: self.transform.window_transform(col_off, row_off),
            nodata: self.nodata,
            valid_count,
        })
    }

    /// New grid whose mask is this mask AND `keep`.
    ///
    /// Samples are untouched; cells where `keep` is false become invalid.
    pub fn with_mask(&self, keep: ArrayView2<'_, bool>) -> Result<Self> {
        if keep.dim() != self.shape() {
            let (rows, cols) = keep.dim();
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
                len: self.len(),
            });
        }

        let mut valid = self.valid.clone();
        Zip::from(&mut valid).and(&keep).for_each(|v, &k| *v = *v && k);
        let valid_count = valid.iter().filter(|&&v| v).count();

        Ok(Self {
            values: self.values.clone(),
            valid,
            transform: self.transform,
            nodata: self.nodata,
            valid_count,
        })
    }
}
