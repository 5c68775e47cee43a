//! Mean light intensity over an ordered sequence of rasters
//!
//! Each time step is reduced independently. A step whose grid has no valid
//! cells becomes a missing entry instead of aborting the series; any other
//! failure is returned to the caller.

use crate::reduce::{StatReducer, Statistic};
use nightlight_core::{Error, MaskedGrid, RasterSource, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One time step of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesEntry {
    pub label: String,
    /// `None` when the step had no valid data
    pub statistic: Option<Statistic>,
    /// Why the step is missing
    pub missing_reason: Option<String>,
}

impl TimeSeriesEntry {
    pub fn is_missing(&self) -> bool {
        self.statistic.is_none()
    }

    /// Mean intensity of the step
    pub fn mean(&self) -> Option<f64> {
        self.statistic.map(|s| s.mean)
    }
}

/// Ordered sequence of per-step statistics, in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    entries: Vec<TimeSeriesEntry>,
}

impl TimeSeries {
    pub fn entries(&self) -> &[TimeSeriesEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeSeriesEntry> {
        self.entries.iter()
    }

    /// Mean per step, `None` for missing steps
    pub fn means(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(TimeSeriesEntry::mean).collect()
    }

    /// Number of missing steps
    pub fn missing_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_missing()).count()
    }

    fn push(&mut self, label: &str, outcome: Result<Statistic>) -> Result<()> {
        let entry = match outcome {
            Ok(statistic) => TimeSeriesEntry {
                label: label.to_string(),
                statistic: Some(statistic),
                missing_reason: None,
            },
            Err(e @ Error::NoValidData { .. }) => {
                warn!("Time step {} has no valid data, recording as missing", label);
                TimeSeriesEntry {
                    label: label.to_string(),
                    statistic: None,
                    missing_reason: Some(e.to_string()),
                }
            }
            Err(e) => return Err(e),
        };
        self.entries.push(entry);
        Ok(())
    }
}

impl IntoIterator for TimeSeries {
    type Item = TimeSeriesEntry;
    type IntoIter = std::vec::IntoIter<TimeSeriesEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Labels `"Month 1"` .. `"Month n"`
pub fn default_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Month {}", i)).collect()
}

fn check_lengths(grids: usize, labels: usize) -> Result<()> {
    if grids != labels {
        return Err(Error::LengthMismatch {
            expected: grids,
            found: labels,
        });
    }
    Ok(())
}

/// Reduce each grid to its mean, in input order.
///
/// Fails with [`Error::LengthMismatch`] when `grids` and `labels` differ in length.
pub fn aggregate<L: AsRef<str>>(
    grids: &[MaskedGrid],
    labels: &[L],
    reducer: &dyn StatReducer,
) -> Result<TimeSeries> {
    check_lengths(grids.len(), labels.len())?;

    let mut series = TimeSeries::default();
    for (grid, label) in grids.iter().zip(labels) {
        series.push(label.as_ref(), reducer.reduce(grid))?;
    }

    debug!(
        "Aggregated {} steps with {} reducer, {} missing",
        series.len(),
        reducer.name(),
        series.missing_count()
    );
    Ok(series)
}

/// Like [`aggregate`], loading one source at a time so only one grid is resident.
///
/// A source whose band decodes but yields no valid cells is a missing step;
/// read failures propagate.
pub fn aggregate_sources<S: RasterSource, L: AsRef<str>>(
    sources: &[S],
    labels: &[L],
    reducer: &dyn StatReducer,
) -> Result<TimeSeries> {
    check_lengths(sources.len(), labels.len())?;

    let mut series = TimeSeries::default();
    for (source, label) in sources.iter().zip(labels) {
        let grid = source.load()?;
        series.push(label.as_ref(), reducer.reduce(&grid))?;
    }
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::{ChunkedReducer, EagerReducer};
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use nightlight_core::io::InMemorySource;
    use nightlight_core::GeoTransform;

    fn grid(values: Vec<f64>) -> MaskedGrid {
        MaskedGrid::from_vec(values, 2, 2, Some(-1.0), GeoTransform::default()).unwrap()
    }

    fn three_months() -> Vec<MaskedGrid> {
        vec![
            grid(vec![1.0, 2.0, 3.0, -1.0]),
            grid(vec![-1.0, -1.0, -1.0, -1.0]),
            grid(vec![10.0, 20.0, 30.0, 40.0]),
        ]
    }

    #[test]
    fn test_missing_step_does_not_abort() {
        let labels = default_labels(3);
        let series = aggregate(&three_months(), &labels, &EagerReducer).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.missing_count(), 1);

        let entries = series.entries();
        assert_eq!(entries[0].label, "Month 1");
        assert_relative_eq!(entries[0].mean().unwrap(), 2.0);
        assert!(entries[1].is_missing());
        assert!(entries[1].missing_reason.is_some());
        assert_relative_eq!(entries[2].mean().unwrap(), 25.0);
    }

    #[test]
    fn test_order_follows_input() {
        let mut grids = three_months();
        grids.reverse();
        let labels = ["c", "b", "a"];
        let series = aggregate(&grids, &labels, &EagerReducer).unwrap();

        let got: Vec<&str> = series.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(got, vec!["c", "b", "a"]);
        assert_eq!(series.means(), vec![Some(25.0), None, Some(2.0)]);
    }

    #[test]
    fn test_length_mismatch() {
        let labels = ["Jan", "Feb"];
        assert!(matches!(
            aggregate(&three_months(), &labels, &EagerReducer),
            Err(Error::LengthMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_chunked_reducer_gives_same_series() {
        let labels = default_labels(3);
        let eager = aggregate(&three_months(), &labels, &EagerReducer).unwrap();
        let chunked = aggregate(&three_months(), &labels, &ChunkedReducer::new(1).unwrap()).unwrap();
        assert_eq!(eager.means(), chunked.means());
    }

    #[test]
    fn test_empty_sequence() {
        let labels: [&str; 0] = [];
        let series = aggregate(&[], &labels, &EagerReducer).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_aggregate_sources() {
        let sources = vec![
            InMemorySource::new(Array2::from_elem((2, 2), 4.0), None, GeoTransform::default()),
            InMemorySource::new(Array2::from_elem((2, 2), 0.0), Some(0.0), GeoTransform::default()),
        ];
        let series = aggregate_sources(&sources, &default_labels(2), &EagerReducer).unwrap();
        assert_eq!(series.means(), vec![Some(4.0), None]);
    }

    #[test]
    fn test_aggregate_sources_propagates_read_errors() {
        let sources = vec![
            InMemorySource::new(Array2::from_elem((2, 2), 4.0), None, GeoTransform::default()),
            InMemorySource::new(Array2::zeros((0, 2)), None, GeoTransform::default()),
        ];
        assert!(matches!(
            aggregate_sources(&sources, &default_labels(2), &EagerReducer),
            Err(Error::EmptyGrid { .. })
        ));
    }
}
