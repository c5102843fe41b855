//! Forecast error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while forecasting or scoring a series
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastError {
    /// Actual and predicted sequences differ in length or are empty
    #[error("Dimension mismatch: {actual} actual values vs {predicted} predicted values")]
    DimensionMismatch { actual: usize, predicted: usize },

    /// Insufficient data points for the method
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Invalid configuration or numerical non-convergence while fitting
    #[error("Model fit failed: {reason}")]
    ModelFit { reason: String },

    /// Recurrent network loss became non-finite
    #[error("Training diverged at epoch {epoch}: loss is {loss}")]
    TrainingDivergence { epoch: usize, loss: f64 },

    /// Adapter exceeded its deadline
    #[error("Timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    /// Adapter panicked while running
    #[error("Adapter panicked: {message}")]
    AdapterPanic { message: String },

    /// Series contains values that cannot be forecast
    #[error("Invalid data: {reason}")]
    InvalidData { reason: String },

    /// Worker threads could not be started
    #[error("Worker pool unavailable: {reason}")]
    WorkerPool { reason: String },
}

impl ForecastError {
    /// Fit failure caused by a bad configuration value
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            reason: format!("invalid parameter '{}': {}", name, reason.into()),
        }
    }

    /// Fit failure with a free-form reason
    pub fn model_fit(reason: impl Into<String>) -> Self {
        Self::ModelFit {
            reason: reason.into(),
        }
    }

    /// Stable short name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::ModelFit { .. } => "model_fit",
            Self::TrainingDivergence { .. } => "training_divergence",
            Self::Timeout { .. } => "timeout",
            Self::AdapterPanic { .. } => "adapter_panic",
            Self::InvalidData { .. } => "invalid_data",
            Self::WorkerPool { .. } => "worker_pool",
        }
    }

    /// Whether the user can fix the failure by changing data or configuration
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::DimensionMismatch { .. } | Self::AdapterPanic { .. } | Self::WorkerPool { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_dimension_mismatch_message() {
        let error = ForecastError::DimensionMismatch {
            actual: 12,
            predicted: 11,
        };
        assert_eq!(
            error.to_string(),
            "Dimension mismatch: 12 actual values vs 11 predicted values"
        );
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_insufficient_data_error_message() {
        let error = ForecastError::InsufficientData {
            required: 18,
            actual: 10,
        };
        assert_eq!(
            error.to_string(),
            "Insufficient data: need at least 18 points, got 10"
        );
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_invalid_parameter_is_model_fit() {
        let error = ForecastError::invalid_parameter("p", "AR order must be <= 10");
        assert_eq!(error.kind(), "model_fit");
        assert_eq!(
            error.to_string(),
            "Model fit failed: invalid parameter 'p': AR order must be <= 10"
        );
    }

    #[test]
    fn test_training_divergence_message() {
        let error = ForecastError::TrainingDivergence {
            epoch: 3,
            loss: f64::NAN,
        };
        assert_eq!(error.to_string(), "Training diverged at epoch 3: loss is NaN");
    }

    #[test]
    fn test_timeout_message() {
        let error = ForecastError::Timeout { limit_ms: 250 };
        assert_eq!(error.to_string(), "Timed out after 250 ms");
        assert_eq!(error.kind(), "timeout");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = vec![
            ForecastError::DimensionMismatch {
                actual: 1,
                predicted: 2,
            },
            ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            },
            ForecastError::model_fit("x"),
            ForecastError::TrainingDivergence { epoch: 0, loss: 0.0 },
            ForecastError::Timeout { limit_ms: 1 },
            ForecastError::AdapterPanic {
                message: "x".to_string(),
            },
            ForecastError::InvalidData {
                reason: "x".to_string(),
            },
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let error = ForecastError::InsufficientData {
            required: 18,
            actual: 10,
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "insufficient_data");
        assert_eq!(json["required"], 18);
    }

    #[test]
    fn test_error_implements_std_error() {
        let error: Box<dyn Error> = Box::new(ForecastError::Timeout { limit_ms: 5 });
        assert!(error.source().is_none());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForecastError>();
    }
}
