//! Forecasting method identifiers

use serde::{Deserialize, Serialize};

/// The four forecasting methods the pipeline knows how to run.
///
/// Ordering follows declaration order, which is also the presentation order
/// of a [`PipelineRun`](crate::PipelineRun).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Trend/seasonal exponential smoothing
    #[serde(alias = "ets")]
    ExponentialSmoothing,
    /// ARIMA / seasonal ARIMA
    Arima,
    /// Gradient-boosted regression trees on lag windows
    #[serde(alias = "gbt")]
    GradientBoosting,
    /// Stacked LSTM on lag windows
    #[serde(alias = "lstm")]
    Recurrent,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::ExponentialSmoothing,
        Method::Arima,
        Method::GradientBoosting,
        Method::Recurrent,
    ];

    /// Short display label
    pub fn label(&self) -> &'static str {
        match self {
            Method::ExponentialSmoothing => "ETS",
            Method::Arima => "ARIMA",
            Method::GradientBoosting => "GBT",
            Method::Recurrent => "LSTM",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
