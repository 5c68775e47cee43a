//! # Nightlight Analysis
//!
//! Night-light economic activity estimation.
//!
//! ## Modules
//!
//! - **reduce**: sum and mean of valid cells, eager or tiled
//! - **clip**: crop a grid to a country boundary
//! - **correlation**: Pearson correlation with an undefined outcome instead of NaN
//! - **time_series**: per-step means over an ordered raster sequence
//! - **country**: per-country activity and GDP correlation

pub mod clip;
pub mod config;
pub mod correlation;
pub mod country;
pub mod reduce;
pub mod time_series;

pub use config::AnalysisConfig;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::clip::{clip, ClipMode, ClippedGrid, PixelWindow};
    pub use crate::config::AnalysisConfig;
    pub use crate::correlation::{correlate, pearson, CorrelationResult, UndefinedReason};
    pub use crate::country::{
        country_activity, correlate_with_gdp, cross_country_correlation, CountryActivity,
        CountryParams,
    };
    pub use crate::reduce::{
        CancelToken, ChunkedReducer, EagerReducer, PartialStatistic, ReducerKind, StatReducer,
        Statistic, DEFAULT_TILE_SIZE,
    };
    pub use crate::time_series::{
        aggregate, aggregate_sources, default_labels, TimeSeries, TimeSeriesEntry,
    };
    pub use nightlight_core::prelude::*;
}
