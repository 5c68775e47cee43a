//! Pearson correlation between light intensity and an external attribute
//!
//! A correlation that cannot be computed (one side has zero variance, or the
//! inputs are not finite) is reported as [`CorrelationResult::Undefined`]
//! rather than a NaN coefficient, so callers have to decide how to present it.

use nightlight_core::{Error, MaskedGrid, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Why a correlation has no coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// At least one series is constant
    ZeroVariance,
    /// The inputs produced a non-finite coefficient (NaN or infinite samples)
    NonFinite,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UndefinedReason::ZeroVariance => write!(f, "zero variance"),
            UndefinedReason::NonFinite => write!(f, "non-finite input"),
        }
    }
}

/// Outcome of a Pearson correlation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationResult {
    /// Coefficient in [-1, 1] over `count` pairs
    Defined { r: f64, count: usize },
    /// No coefficient could be computed over `count` pairs
    Undefined { reason: UndefinedReason, count: usize },
}

impl CorrelationResult {
    /// The coefficient, if defined
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            CorrelationResult::Defined { r, .. } => Some(*r),
            CorrelationResult::Undefined { .. } => None,
        }
    }

    /// Number of paired samples used
    pub fn count(&self) -> usize {
        match self {
            CorrelationResult::Defined { count, .. } | CorrelationResult::Undefined { count, .. } => {
                *count
            }
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, CorrelationResult::Undefined { .. })
    }
}

impl fmt::Display for CorrelationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationResult::Defined { r, count } => write!(f, "{:.2} (n = {})", r, count),
            CorrelationResult::Undefined { reason, count } => {
                write!(f, "undefined: {} (n = {})", reason, count)
            }
        }
    }
}

/// Divide by the largest magnitude so the squared deviations cannot overflow.
/// Pearson's r is invariant to positive scaling.
fn normalized(xs: &[f64]) -> Vec<f64> {
    let scale = xs.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
    if scale > 0.0 {
        xs.iter().map(|&x| x / scale).collect()
    } else {
        xs.to_vec()
    }
}

fn is_constant(xs: &[f64]) -> bool {
    match xs.first() {
        Some(&first) => xs.iter().all(|&x| x == first),
        None => true,
    }
}

/// Pearson correlation between two paired series.
///
/// Fails with [`Error::LengthMismatch`] for series of different length and
/// [`Error::InsufficientSamples`] for fewer than 2 pairs.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<CorrelationResult> {
    if xs.len() != ys.len() {
        return Err(Error::LengthMismatch {
            expected: xs.len(),
            found: ys.len(),
        });
    }
    let count = xs.len();
    if count < 2 {
        return Err(Error::InsufficientSamples {
            required: 2,
            found: count,
        });
    }

    if is_constant(xs) || is_constant(ys) {
        return Ok(CorrelationResult::Undefined {
            reason: UndefinedReason::ZeroVariance,
            count,
        });
    }

    let xs = normalized(xs);
    let ys = normalized(ys);

    let n = count as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (sxy, sxx, syy) = xs.iter().zip(&ys).fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (&x, &y)| {
        let dx = x - mean_x;
        let dy = y - mean_y;
        (sxy + dx * dy, sxx + dx * dx, syy + dy * dy)
    });

    if !(sxx.is_finite() && syy.is_finite()) {
        return Ok(CorrelationResult::Undefined {
            reason: UndefinedReason::NonFinite,
            count,
        });
    }
    if sxx == 0.0 || syy == 0.0 {
        return Ok(CorrelationResult::Undefined {
            reason: UndefinedReason::ZeroVariance,
            count,
        });
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if !r.is_finite() {
        return Ok(CorrelationResult::Undefined {
            reason: UndefinedReason::NonFinite,
            count,
        });
    }

    Ok(CorrelationResult::Defined {
        r: r.clamp(-1.0, 1.0),
        count,
    })
}

/// Correlate the valid pixels of a grid against a scalar broadcast to every pixel.
///
/// The scalar side is constant by construction, so a successful call reports
/// [`UndefinedReason::ZeroVariance`]; the count tells how many pixels were paired.
/// Fails with [`Error::InsufficientSamples`] when fewer than 2 pixels are valid.
pub fn correlate(grid: &MaskedGrid, scalar: f64) -> Result<CorrelationResult> {
    let found = grid.valid_count();
    if found < 2 {
        return Err(Error::InsufficientSamples { required: 2, found });
    }

    let lights: Vec<f64> = grid.valid_values().collect();
    let broadcast = vec![scalar; lights.len()];

    let result = pearson(&lights, &broadcast)?;
    debug!("Correlation of {} pixels against {}: {}", found, scalar, result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nightlight_core::GeoTransform;

    fn row(values: Vec<f64>, nodata: Option<f64>) -> MaskedGrid {
        let n = values.len();
        MaskedGrid::from_vec(values, 1, n, nodata, GeoTransform::default()).unwrap()
    }

    #[test]
    fn test_constant_grid_is_undefined() {
        let grid = row(vec![10.0, 10.0, 10.0], None);
        for scalar in [0.0, 5.0, -3.5, 1.0e12] {
            let result = correlate(&grid, scalar).unwrap();
            assert_eq!(
                result,
                CorrelationResult::Undefined {
                    reason: UndefinedReason::ZeroVariance,
                    count: 3
                }
            );
        }
    }

    #[test]
    fn test_broadcast_scalar_is_undefined() {
        let grid = row(vec![1.0, 2.0, 3.0], None);
        let result = correlate(&grid, 5.0).unwrap();
        assert!(result.is_undefined());
        assert_eq!(result.count(), 3);
        assert_eq!(result.coefficient(), None);
    }

    #[test]
    fn test_masked_pixels_are_not_paired() {
        let grid = row(vec![1.0, -1.0, 2.0, -1.0, 3.0], Some(-1.0));
        assert_eq!(correlate(&grid, 5.0).unwrap().count(), 3);
    }

    #[test]
    fn test_insufficient_samples() {
        let grid = row(vec![4.0, 0.0, 0.0], Some(0.0));
        assert!(matches!(
            correlate(&grid, 1.0),
            Err(Error::InsufficientSamples { required: 2, found: 1 })
        ));
    }

    #[test]
    fn test_pearson_perfect() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let up = pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert_relative_eq!(up.coefficient().unwrap(), 1.0, epsilon = 1e-12);

        let down = pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap();
        assert_relative_eq!(down.coefficient().unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_known_value() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [2.0, 4.0, 5.0, 4.0, 5.0];
        // sxy = 6, sxx = 10, syy = 6
        let r = pearson(&xs, &ys).unwrap().coefficient().unwrap();
        assert_relative_eq!(r, 6.0 / (10.0_f64.sqrt() * 6.0_f64.sqrt()), epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_length_mismatch() {
        assert!(matches!(
            pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]),
            Err(Error::LengthMismatch { expected: 3, found: 2 })
        ));
    }

    #[test]
    fn test_pearson_large_magnitudes() {
        let r = pearson(&[1e200, 2e200, 3e200], &[1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(r.coefficient().unwrap(), 1.0, epsilon = 1e-12);

        let r = pearson(&[-1e300, 0.0, 1e300], &[3e-300, 2e-300, 1e-300]).unwrap();
        assert_relative_eq!(r.coefficient().unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_non_finite() {
        let result = pearson(&[1.0, f64::INFINITY, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            result,
            CorrelationResult::Undefined {
                reason: UndefinedReason::NonFinite,
                count: 3
            }
        );
    }
}
