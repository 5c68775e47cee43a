//! Sum / mean reduction over the valid cells of a grid
//!
//! Two strategies share one contract:
//! - [`EagerReducer`]: a single pass over the whole grid
//! - [`ChunkedReducer`]: fixed-size tiles reduced independently, then merged
//!
//! Both build [`PartialStatistic`]s and combine them with
//! [`PartialStatistic::merge`] (plain addition of sums and counts), so the
//! chunked result equals the eager one up to floating-point accumulation
//! order, and tiles may be evaluated in any order or in parallel.

use ndarray::{s, ArrayView2, Zip};
use nightlight_core::{Error, MaskedGrid, Result};
use nightlight_parallel::{ParallelStrategy, ProcessingMode, TileIterator};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default tile edge for chunked reduction
pub const DEFAULT_TILE_SIZE: usize = 2048;

/// Sum and mean of the valid cells of a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    /// Total light intensity
    pub sum: f64,
    /// Average light intensity over valid cells
    pub mean: f64,
    /// Number of cells that contributed
    pub valid_count: usize,
}

/// Combinable partial result: running sum and valid-cell count
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PartialStatistic {
    pub sum: f64,
    pub count: usize,
}

impl PartialStatistic {
    pub const ZERO: Self = Self { sum: 0.0, count: 0 };

    /// Partial over the cells where `valid` is true
    pub fn from_views(values: ArrayView2<'_, f64>, valid: ArrayView2<'_, bool>) -> Self {
        Zip::from(values)
            .and(valid)
            .fold(Self::ZERO, |acc, &v, &ok| {
                if ok {
                    Self {
                        sum: acc.sum + v,
                        count: acc.count + 1,
                    }
                } else {
                    acc
                }
            })
    }

    /// Partial over a whole grid
    pub fn from_grid(grid: &MaskedGrid) -> Self {
        Self::from_views(grid.values(), grid.valid())
    }

    /// Combine two partials
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }

    /// Final statistic; `cells` is only used to report an all-masked input
    pub fn finish(self, cells: usize) -> Result<Statistic> {
        if self.count == 0 {
            return Err(Error::NoValidData { cells });
        }
        Ok(Statistic {
            sum: self.sum,
            mean: self.sum / self.count as f64,
            valid_count: self.count,
        })
    }
}

impl std::iter::Sum for PartialStatistic {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::merge)
    }
}

/// Reduction of a grid to a [`Statistic`]
pub trait StatReducer: Send + Sync {
    /// Short strategy name for logs
    fn name(&self) -> &'static str;

    /// Sum and count of the valid cells
    fn partial(&self, grid: &MaskedGrid) -> PartialStatistic;

    /// Sum and mean; fails with [`Error::NoValidData`] when every cell is masked
    fn reduce(&self, grid: &MaskedGrid) -> Result<Statistic> {
        self.partial(grid).finish(grid.len())
    }
}

/// Single pass over the whole grid
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerReducer;

impl StatReducer for EagerReducer {
    fn name(&self) -> &'static str {
        "eager"
    }

    fn partial(&self, grid: &MaskedGrid) -> PartialStatistic {
        PartialStatistic::from_grid(grid)
    }
}

/// Cooperative cancellation flag checked between tiles
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Tile-by-tile reduction with a merge of partial sums and counts
#[derive(Debug, Clone, Copy)]
pub struct ChunkedReducer {
    tile_size: usize,
    mode: ProcessingMode,
}

impl ChunkedReducer {
    /// Reducer with square tiles of `tile_size`, evaluated sequentially
    pub fn new(tile_size: usize) -> Result<Self> {
        if tile_size == 0 {
            return Err(Error::InvalidParameter {
                name: "tile_size",
                value: tile_size.to_string(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            tile_size,
            mode: ProcessingMode::Sequential,
        })
    }

    /// Evaluate tiles with the given processing mode
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Reduce an externally supplied sequence of tiles.
    ///
    /// Tiles are consumed one at a time so only one needs to be resident.
    /// The token, when given, is checked before each tile.
    pub fn reduce_tiles<I>(&self, tiles: I, cancel: Option<&CancelToken>) -> Result<Statistic>
    where
        I: IntoIterator<Item = Result<MaskedGrid>>,
    {
        let mut total = PartialStatistic::ZERO;
        let mut cells = 0;

        for (completed, tile) in tiles.into_iter().enumerate() {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                debug!("Chunked reduction cancelled after {} tiles", completed);
                return Err(Error::Cancelled { completed });
            }
            let tile = tile?;
            cells += tile.len();
            total = total.merge(PartialStatistic::from_grid(&tile));
        }

        total.finish(cells)
    }
}

impl StatReducer for ChunkedReducer {
    fn name(&self) -> &'static str {
        "chunked"
    }

    fn partial(&self, grid: &MaskedGrid) -> PartialStatistic {
        let (rows, cols) = grid.shape();
        let tiles: Vec<_> = TileIterator::new(rows, cols, self.tile_size).collect();
        debug!(
            "Chunked reduction: {}x{} grid in {} tiles of {}",
            rows,
            cols,
            tiles.len(),
            self.tile_size
        );

        let values = grid.values();
        let valid = grid.valid();

        self.mode
            .par_map(0..tiles.len(), |i| {
                let t = &tiles[i];
                let rows = t.row_offset..t.row_offset + t.rows;
                let cols = t.col_offset..t.col_offset + t.cols;
                PartialStatistic::from_views(
                    values.slice(s![rows.clone(), cols.clone()]),
                    valid.slice(s![rows, cols]),
                )
            })
            .into_iter()
            .sum()
    }
}

/// Reducer selection, as found in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReducerKind {
    #[default]
    Eager,
    Chunked {
        #[serde(default = "default_tile_size")]
        tile_size: usize,
    },
}

fn default_tile_size() -> usize {
    DEFAULT_TILE_SIZE
}

impl ReducerKind {
    /// Instantiate the selected strategy
    pub fn build(self, mode: ProcessingMode) -> Result<Box<dyn StatReducer>> {
        Ok(match self {
            ReducerKind::Eager => Box::new(EagerReducer),
            ReducerKind::Chunked { tile_size } => {
                Box::new(ChunkedReducer::new(tile_size)?.with_mode(mode))
            }
        })
    }
}
