//! Forecast method adapters
//!
//! One adapter per [`Method`], each implementing [`Forecaster`]. Adapters
//! are selected from a [`ForecastConfig`] by an explicit match.

pub mod arima;
pub mod boosting;
pub mod exponential_smoothing;
pub mod lag_frame;
pub mod recurrent;

pub use arima::{Arima, ArimaForecaster};
pub use boosting::{BoostingForecaster, GradientBoosting};
pub use exponential_smoothing::{EtsForecaster, ExponentialSmoothing, SmoothingParams};
pub use lag_frame::{LagFrame, Rows, Standardizer};
pub use recurrent::{RecurrentForecaster, RecurrentNetwork};

use forecast_spi::{ForecastConfig, ForecastError, Forecaster, Result};

/// Build the adapter for a configuration
pub fn forecaster_for(config: &ForecastConfig) -> Box<dyn Forecaster> {
    match config {
        ForecastConfig::ExponentialSmoothing(c) => Box::new(EtsForecaster::new(c.clone())),
        ForecastConfig::Arima(c) => Box::new(ArimaForecaster::new(c.clone())),
        ForecastConfig::GradientBoosting(c) => Box::new(BoostingForecaster::new(c.clone())),
        ForecastConfig::Recurrent(c) => Box::new(RecurrentForecaster::new(c.clone())),
    }
}

/// Forecast `horizon` values of `series` with the configured method.
///
/// The series is handed to the adapter as-is; holdout handling is the
/// caller's concern. The result is checked to hold exactly `horizon`
/// finite values.
pub fn forecast(series: &[f64], config: &ForecastConfig, horizon: usize) -> Result<Vec<f64>> {
    let values = forecaster_for(config).forecast(series, horizon)?;
    check_output(&values, horizon)?;
    Ok(values)
}

/// Enforce the adapter output contract
pub(crate) fn check_output(values: &[f64], horizon: usize) -> Result<()> {
    if values.len() != horizon {
        return Err(ForecastError::DimensionMismatch {
            actual: horizon,
            predicted: values.len(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::model_fit("forecast contains non-finite values"));
    }
    Ok(())
}
