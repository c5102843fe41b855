//! Decomposition result model

use serde::{Deserialize, Serialize};

/// How trend, seasonal and residual combine into the observed series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionModel {
    /// Y = T + S + R
    #[default]
    Additive,
    /// Y = T * S * R
    Multiplicative,
}

/// Result of time series decomposition.
///
/// The centred moving average leaves `period / 2` points at each end without
/// a trend estimate; those positions are `None` in `trend` and `residual`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub model: DecompositionModel,
    pub period: usize,
    /// Trend component
    pub trend: Vec<Option<f64>>,
    /// Seasonal component
    pub seasonal: Vec<f64>,
    /// Residual component
    pub residual: Vec<Option<f64>>,
}
