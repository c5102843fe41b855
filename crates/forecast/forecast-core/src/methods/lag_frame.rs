//! Supervised lag-window frame shared by the learned methods
//!
//! Row `r` describes time `t = lags + r`: its features are
//! `[y(t-1), y(t-2), .., y(t-lags)]` and its label is `y(t)`. The first
//! `lags` observations have no complete history and produce no row.
//!
//! The last `horizon` rows are withheld from training and predicted directly
//! from their (already known) lag windows. That scores the model on the
//! holdout tail, but it is a one-step-ahead evaluation rather than a rolling
//! multi-step forecast.

use forecast_spi::{ForecastError, Result};

/// Lag features and labels for one series
#[derive(Debug, Clone, PartialEq)]
pub struct LagFrame {
    lags: usize,
    features: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl LagFrame {
    /// Build the frame, requiring at least one training row after withholding
    /// `horizon` rows.
    pub fn build(series: &[f64], lags: usize, horizon: usize) -> Result<Self> {
        if lags == 0 {
            return Err(ForecastError::invalid_parameter("lags", "must be at least 1"));
        }
        let required = lags + horizon + 1;
        if series.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: series.len(),
            });
        }

        let features = (lags..series.len())
            .map(|t| (1..=lags).map(|shift| series[t - shift]).collect())
            .collect();
        let labels = series[lags..].to_vec();

        Ok(Self {
            lags,
            features,
            labels,
        })
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    /// Split into (training rows, withheld rows) as `(features, labels)` pairs
    pub fn split(&self, horizon: usize) -> (Rows<'_>, Rows<'_>) {
        let cut = self.rows().saturating_sub(horizon);
        let train = Rows {
            features: &self.features[..cut],
            labels: &self.labels[..cut],
        };
        let test = Rows {
            features: &self.features[cut..],
            labels: &self.labels[cut..],
        };
        (train, test)
    }
}

/// Borrowed view over a contiguous block of frame rows
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a> {
    pub features: &'a [Vec<f64>],
    pub labels: &'a [f64],
}

impl Rows<'_> {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Zero-mean, unit-variance scaling fitted on training labels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    mean: f64,
    std_dev: f64,
}

impl Standardizer {
    pub fn fit(data: &[f64]) -> Self {
        let n = data.len().max(1) as f64;
        let mean = data.iter().sum::<f64>() / n;
        let std_dev = (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
        // A constant series scales by 1 so inverse_transform stays exact
        let std_dev = if std_dev > 1e-12 { std_dev } else { 1.0 };
        Self { mean, std_dev }
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }

    pub fn inverse_transform(&self, value: f64) -> f64 {
        value * self.std_dev + self.mean
    }
}
