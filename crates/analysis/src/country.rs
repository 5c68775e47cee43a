//! Per-country light activity and its relation to GDP estimates

use crate::clip::{clip, ClipMode};
use crate::correlation::{correlate, pearson, CorrelationResult};
use crate::reduce::{StatReducer, Statistic};
use nightlight_core::vector::{find_boundary, GDP_ATTRIBUTE};
use nightlight_core::{Boundary, Error, MaskedGrid, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters shared by the country-level operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryParams {
    pub clip_mode: ClipMode,
    /// Attribute holding the GDP estimate
    pub gdp_attribute: String,
}

impl Default for CountryParams {
    fn default() -> Self {
        Self {
            clip_mode: ClipMode::default(),
            gdp_attribute: GDP_ATTRIBUTE.to_string(),
        }
    }
}

/// Light activity of one country
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryActivity {
    pub name: String,
    /// GDP estimate, 0 when the attribute is missing
    pub gdp: f64,
    /// `None` when the clipped window holds no valid cells
    pub statistic: Option<Statistic>,
    /// Cells in the clipped window
    pub clipped_pixels: usize,
}

/// Clip `grid` to `boundary` and correlate its lights with the boundary's GDP.
pub fn boundary_gdp_correlation(
    grid: &MaskedGrid,
    boundary: &Boundary,
    params: &CountryParams,
) -> Result<CorrelationResult> {
    let clipped = clip(grid, boundary, params.clip_mode)?;
    let gdp = boundary.numeric_attribute(&params.gdp_attribute);
    correlate(&clipped.grid, gdp)
}

/// Look up `country` by name, then correlate its clipped lights with its GDP.
///
/// Fails with [`Error::BoundaryNotFound`] when no boundary has that name.
pub fn correlate_with_gdp(
    grid: &MaskedGrid,
    boundaries: &[Boundary],
    country: &str,
    params: &CountryParams,
) -> Result<CorrelationResult> {
    let boundary = find_boundary(boundaries, country)?;
    let result = boundary_gdp_correlation(grid, boundary, params)?;
    info!("{}: lights vs GDP correlation {}", boundary.name, result);
    Ok(result)
}

/// Reduce the lights of every boundary that overlaps the grid.
///
/// Boundaries outside the grid extent are skipped. A boundary whose window
/// holds no valid cells is kept with `statistic: None`.
pub fn country_activity(
    grid: &MaskedGrid,
    boundaries: &[Boundary],
    reducer: &dyn StatReducer,
    params: &CountryParams,
) -> Result<Vec<CountryActivity>> {
    let mut activity = Vec::with_capacity(boundaries.len());

    for boundary in boundaries {
        let clipped = match clip(grid, boundary, params.clip_mode) {
            Ok(c) => c,
            Err(Error::OutOfBounds { .. }) => {
                debug!("{} does not overlap the grid, skipping", boundary.name);
                continue;
            }
            Err(e) => return Err(e),
        };

        let statistic = match reducer.reduce(&clipped.grid) {
            Ok(s) => Some(s),
            Err(Error::NoValidData { .. }) => None,
            Err(e) => return Err(e),
        };

        activity.push(CountryActivity {
            name: boundary.name.clone(),
            gdp: boundary.numeric_attribute(&params.gdp_attribute),
            statistic,
            clipped_pixels: clipped.grid.len(),
        });
    }

    debug!(
        "Computed activity for {} of {} boundaries",
        activity.len(),
        boundaries.len()
    );
    Ok(activity)
}

/// Pearson correlation between total light and GDP across countries.
///
/// Countries without a statistic are left out of the pairing.
pub fn cross_country_correlation(activity: &[CountryActivity]) -> Result<CorrelationResult> {
    let (lights, gdp): (Vec<f64>, Vec<f64>) = activity
        .iter()
        .filter_map(|a| a.statistic.map(|s| (s.sum, a.gdp)))
        .unzip();
    pearson(&lights, &gdp)
}
