//! Tile partitioning for chunked processing of large rasters

/// A rectangular block of a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the source raster
    pub row_offset: usize,
    /// Column offset in the source raster
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Number of cells covered
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert tile-local coordinates to source raster coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.row_offset + local_row, self.col_offset + local_col)
    }
}

/// Iterator over non-overlapping tiles covering a raster, row-major.
///
/// Edge tiles are truncated to the raster extent, so every cell belongs
/// to exactly one tile whether or not the tile size divides the raster.
#[derive(Debug, Clone)]
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    /// Square tiles of `tile_size` (clamped to at least 1)
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self::with_shape(total_rows, total_cols, tile_size, tile_size)
    }

    /// Rectangular tiles of `tile_rows` x `tile_cols`
    pub fn with_shape(total_rows: usize, total_cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
            current_row: 0,
            current_col: 0,
        }
    }

    /// Total number of tiles the iterator yields
    pub fn tile_count(&self) -> usize {
        if self.total_cols == 0 {
            return 0;
        }
        self.total_rows.div_ceil(self.tile_rows) * self.total_cols.div_ceil(self.tile_cols)
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let row_end = (self.current_row + self.tile_rows).min(self.total_rows);
        let col_end = (self.current_col + self.tile_cols).min(self.total_cols);

        let tile = Tile::new(
            self.current_row,
            self.current_col,
            row_end - self.current_row,
            col_end - self.current_col,
        );

        self.current_col = col_end;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row = row_end;
        }

        Some(tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_iterator() {
        let tiles: Vec<_> = TileIterator::new(100, 100, 32).collect();
        assert_eq!(tiles.len(), 16);
        assert_eq!(tiles[0], Tile::new(0, 0, 32, 32));
        // ragged last tile
        assert_eq!(tiles[15], Tile::new(96, 96, 4, 4));
    }

    #[test]
    fn test_tile_count_matches_iteration() {
        for (rows, cols, size) in [(100, 100, 32), (7, 13, 5), (1, 1, 2048), (2048, 4096, 2048)] {
            let it = TileIterator::new(rows, cols, size);
            assert_eq!(it.tile_count(), it.clone().count(), "{}x{} / {}", rows, cols, size);
        }
    }

    #[test]
    fn test_tiles_partition_exactly() {
        let rows = 37;
        let cols = 53;
        let mut hits = vec![vec![0u8; cols]; rows];

        for tile in TileIterator::with_shape(rows, cols, 8, 11) {
            for r in 0..tile.rows {
                for c in 0..tile.cols {
                    let (sr, sc) = tile.to_source_coords(r, c);
                    hits[sr][sc] += 1;
                }
            }
        }

        for (r, row) in hits.iter().enumerate() {
            for (c, &n) in row.iter().enumerate() {
                assert_eq!(n, 1, "Cell ({}, {}) covered {} times", r, c, n);
            }
        }
    }

    #[test]
    fn test_zero_tile_size_is_clamped() {
        assert_eq!(TileIterator::new(3, 2, 0).count(), 6);
    }

    #[test]
    fn test_empty_raster() {
        assert_eq!(TileIterator::new(0, 10, 4).count(), 0);
        assert_eq!(TileIterator::new(10, 0, 4).count(), 0);
    }
}
