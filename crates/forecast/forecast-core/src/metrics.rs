//! Forecast accuracy metrics
//!
//! Scores a forecast against the holdout tail with RMSE, MAE and SMAPE.
//!
//! ## Zero guard
//!
//! Before any metric is computed, every element that is exactly `0.0` in
//! either sequence is replaced by [`ZERO_GUARD`]. This keeps SMAPE finite
//! when both values are zero, at the price of a tiny bias. The resulting
//! SMAPE is a robust approximation, not the textbook definition.

use forecast_spi::{ForecastError, MetricSet, Result};

/// Substitute for exact zeros before scoring
pub const ZERO_GUARD: f64 = 1e-6;

fn guard(value: f64) -> f64 {
    if value == 0.0 {
        ZERO_GUARD
    } else {
        value
    }
}

fn check_dimensions(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.len() != predicted.len() || actual.is_empty() {
        return Err(ForecastError::DimensionMismatch {
            actual: actual.len(),
            predicted: predicted.len(),
        });
    }
    Ok(())
}

/// Mean Absolute Error (MAE)
///
/// Average of absolute differences between predictions and actual values.
/// Same scale as the data.
pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_dimensions(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Mean Squared Error (MSE)
///
/// Average of squared differences. Penalizes large errors more heavily.
pub fn mse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_dimensions(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Root Mean Squared Error (RMSE)
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    mse(actual, predicted).map(f64::sqrt)
}

/// Symmetric Mean Absolute Percentage Error (sMAPE)
///
/// Returns a percentage in [0, 200]. Callers are expected to have applied
/// the zero guard; a pair summing to zero magnitude contributes nothing.
pub fn smape(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_dimensions(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom > 0.0 {
                2.0 * (a - p).abs() / denom
            } else {
                0.0
            }
        })
        .sum();

    Ok(100.0 * sum / actual.len() as f64)
}

/// Score `predicted` against `actual`.
///
/// Fails with [`ForecastError::DimensionMismatch`] when the sequences differ
/// in length or are empty. Pure and deterministic.
///
/// # Example
///
/// ```rust
/// use forecast_core::metrics::evaluate;
///
/// let metrics = evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 4.0]).unwrap();
/// assert!(metrics.mae > 0.0);
/// ```
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<MetricSet> {
    check_dimensions(actual, predicted)?;

    let actual: Vec<f64> = actual.iter().copied().map(guard).collect();
    let predicted: Vec<f64> = predicted.iter().copied().map(guard).collect();

    Ok(MetricSet {
        rmse: rmse(&actual, &predicted)?,
        mae: mae(&actual, &predicted)?,
        smape: smape(&actual, &predicted)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        let actual = vec![1.0, 2.0, 3.0, 4.0];
        let predicted = vec![2.0, 2.0, 3.0, 2.0];
        let metrics = evaluate(&actual, &predicted).unwrap();

        assert_relative_eq!(metrics.mae, 0.75);
        assert_relative_eq!(metrics.rmse, (5.0f64 / 4.0).sqrt());
        // 2*1/3 + 0 + 0 + 2*2/6 = 4/3
        assert_relative_eq!(metrics.smape, 100.0 * (4.0 / 3.0) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_inputs_score_zero() {
        let values = vec![5.0, -3.0, 12.5, 7.25];
        let metrics = evaluate(&values, &values).unwrap();
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.smape, 0.0);
    }

    #[test]
    fn test_all_zero_inputs_are_guarded() {
        let metrics = evaluate(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(metrics.smape, 0.0);
        assert!(!metrics.smape.is_nan());
        assert_eq!(metrics.rmse, 0.0);
    }

    #[test]
    fn test_zero_against_nonzero() {
        // guarded 0 vs 1: 2*(1-1e-6)/(1+1e-6) is just under 2
        let metrics = evaluate(&[0.0], &[1.0]).unwrap();
        assert!(metrics.smape < 200.0);
        assert_relative_eq!(metrics.smape, 200.0, epsilon = 1e-3);
    }

    #[test]
    fn test_opposite_signs_hit_upper_bound() {
        let metrics = evaluate(&[1.0, -2.0], &[-1.0, 2.0]).unwrap();
        assert_relative_eq!(metrics.smape, 200.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = evaluate(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            ForecastError::DimensionMismatch {
                actual: 2,
                predicted: 1
            }
        );
        assert!(evaluate(&[], &[]).is_err());
    }

    #[test]
    fn test_bounds_hold_across_inputs() {
        let actual: Vec<f64> = (0..50).map(|i| ((i * 37) % 19) as f64 - 9.0).collect();
        for shift in [-40.0, -1.5, 0.0, 0.3, 7.0, 1e6] {
            let predicted: Vec<f64> = actual
                .iter()
                .enumerate()
                .map(|(i, a)| a * ((i % 3) as f64 - 1.0) + shift)
                .collect();
            let metrics = evaluate(&actual, &predicted).unwrap();
            assert!(metrics.rmse >= 0.0);
            assert!(metrics.mae >= 0.0);
            assert!((0.0..=200.0).contains(&metrics.smape), "smape {}", metrics.smape);
            assert!(metrics.rmse >= metrics.mae - 1e-9);
        }
    }

    #[test]
    fn test_idempotent() {
        let actual = vec![112.0, 118.0, 132.0, 129.0, 121.0, 135.0];
        let predicted = vec![110.5, 120.1, 128.0, 131.7, 119.9, 140.2];
        let first = evaluate(&actual, &predicted).unwrap();
        let second = evaluate(&actual, &predicted).unwrap();
        assert_eq!(first.rmse.to_bits(), second.rmse.to_bits());
        assert_eq!(first.mae.to_bits(), second.mae.to_bits());
        assert_eq!(first.smape.to_bits(), second.smape.to_bits());
    }
}
