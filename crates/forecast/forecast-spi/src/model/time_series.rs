//! Shared, read-only univariate series

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Ordered univariate observations indexed by position.
///
/// Cloning is cheap: all clones share one immutable buffer, so the
/// orchestrator can hand the same series to every adapter task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct TimeSeries {
    values: Arc<[f64]>,
}

impl TimeSeries {
    /// Build a series, rejecting NaN and infinite observations
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidData {
                reason: format!("observation {} is not finite", idx),
            });
        }
        Ok(Self {
            values: values.into(),
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Shared handle to the underlying buffer
    pub fn shared(&self) -> Arc<[f64]> {
        Arc::clone(&self.values)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Split into (history, holdout tail) with a tail of `horizon` points.
    ///
    /// Returns `None` when the series is not longer than the horizon, since
    /// no history would remain to fit on.
    pub fn split_holdout(&self, horizon: usize) -> Option<(&[f64], &[f64])> {
        if horizon == 0 || self.values.len() <= horizon {
            return None;
        }
        Some(self.values.split_at(self.values.len() - horizon))
    }

    /// Bit-exact little-endian encoding, used for content addressing
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values
            .iter()
            .flat_map(|v| v.to_bits().to_le_bytes())
            .collect()
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = ForecastError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<TimeSeries> for Vec<f64> {
    fn from(series: TimeSeries) -> Self {
        series.values.to_vec()
    }
}
