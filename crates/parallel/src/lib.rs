//! # Nightlight Parallel
//!
//! Chunked processing support for rasters too large to reduce in one pass.
//!
//! This crate provides:
//! - Non-overlapping tile partitioning of a raster extent
//! - Sequential or Rayon-backed evaluation of per-tile work
//!
//! With the `parallel` feature disabled (e.g. for WASM builds) every mode
//! runs sequentially.

pub mod strategy;
pub mod tiled;

pub use strategy::{num_threads, ParallelStrategy, ProcessingMode};
pub use tiled::{Tile, TileIterator};
