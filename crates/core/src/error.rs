//! Error types for Nightlight

use thiserror::Error;

/// Main error type for Nightlight operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty grid: {rows}x{cols} has no cells")]
    EmptyGrid { rows: usize, cols: usize },

    #[error("Invalid raster dimensions: {width}x{height} does not match {len} samples")]
    InvalidDimensions { width: usize, height: usize, len: usize },

    #[error(
        "Envelope ({min_x}, {min_y}) - ({max_x}, {max_y}) does not intersect the grid extent"
    )]
    OutOfBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    #[error("No valid data: all {cells} cells are masked")]
    NoValidData { cells: usize },

    #[error("Insufficient samples: need at least {required}, found {found}")]
    InsufficientSamples { required: usize, found: usize },

    #[error("Length mismatch: expected {expected}, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Boundary not found: {0}")]
    BoundaryNotFound(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation cancelled after {completed} tiles")]
    Cancelled { completed: usize },

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

/// Result type alias for Nightlight operations
pub type Result<T> = std::result::Result<T, Error>;
