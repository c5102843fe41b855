//! Trait for time series decomposition

use crate::error::Result;
use crate::model::DecompositionResult;

/// Splits a series into trend, seasonal and residual components
pub trait Decomposer: Send + Sync {
    /// Decompose `data` assuming a seasonal cycle of `period` observations
    fn decompose(&self, data: &[f64], period: usize) -> Result<DecompositionResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use crate::model::DecompositionModel;

    /// Mock implementation: everything is trend
    struct TrendOnly;

    impl Decomposer for TrendOnly {
        fn decompose(&self, data: &[f64], period: usize) -> Result<DecompositionResult> {
            if period < 2 {
                return Err(ForecastError::invalid_parameter("period", "must be at least 2"));
            }
            Ok(DecompositionResult {
                model: DecompositionModel::Additive,
                period,
                trend: data.iter().copied().map(Some).collect(),
                seasonal: vec![0.0; data.len()],
                residual: vec![Some(0.0); data.len()],
            })
        }
    }

    #[test]
    fn test_mock_decomposer() {
        let result = TrendOnly.decompose(&[1.0, 2.0, 3.0], 2).unwrap();
        assert_eq!(result.trend.len(), 3);
        assert_eq!(result.trend[2], Some(3.0));
        assert!(TrendOnly.decompose(&[1.0], 1).is_err());
    }
}
