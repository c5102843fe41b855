//! Uniform contract every forecasting method adapter satisfies

use crate::error::Result;
use crate::model::Method;

/// Which part of the series an adapter is fitted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitWindow {
    /// Everything except the holdout tail; the forecast predicts the tail
    History,
    /// The whole series; the adapter withholds the last `horizon` rows itself
    Full,
}

/// A forecasting method behind a single call contract.
///
/// Implementations fit a private model on every call and discard it
/// afterwards; nothing is shared between calls or between adapters.
pub trait Forecaster: Send + Sync {
    /// The method this adapter implements
    fn method(&self) -> Method;

    /// Which slice of the series the orchestrator should pass in
    fn fit_window(&self) -> FitWindow {
        FitWindow::History
    }

    /// Produce exactly `horizon` finite predictions
    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Vec<f64>>;
}
