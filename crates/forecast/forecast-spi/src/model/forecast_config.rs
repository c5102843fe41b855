//! Per-method configuration records
//!
//! One record per forecasting method, wrapped in the tagged
//! [`ForecastConfig`] variant. Records are plain data: validation happens
//! when an adapter is built from them.

use serde::{Deserialize, Serialize};

use super::Method;

/// Shape of a trend or seasonal component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    #[serde(alias = "add")]
    Additive,
    #[serde(alias = "mul")]
    Multiplicative,
    None,
}

impl ComponentKind {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ComponentKind::None)
    }
}

/// Exponential smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtsConfig {
    pub trend: ComponentKind,
    pub seasonal: ComponentKind,
    pub damped_trend: bool,
    /// Observations per seasonal cycle
    pub seasonal_periods: usize,
}

impl Default for EtsConfig {
    fn default() -> Self {
        Self {
            trend: ComponentKind::Additive,
            seasonal: ComponentKind::Additive,
            damped_trend: false,
            seasonal_periods: 12,
        }
    }
}

/// Seasonal (P, D, Q, m) part of a seasonal ARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl Default for SeasonalOrder {
    fn default() -> Self {
        Self {
            p: 1,
            d: 1,
            q: 1,
            period: 12,
        }
    }
}

/// ARIMA configuration; `seasonal` switches to the seasonal variant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaConfig {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub seasonal: Option<SeasonalOrder>,
}

impl Default for ArimaConfig {
    fn default() -> Self {
        Self {
            p: 1,
            d: 1,
            q: 1,
            seasonal: None,
        }
    }
}

/// Gradient-boosted trees configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    /// Lag window length used as features
    pub lags: usize,
    /// Shrinkage applied to every tree, in (0, 1]
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
    /// L2 penalty on leaf weights
    pub l2_regularization: f64,
    /// Minimum loss reduction required to split a node
    pub min_split_gain: f64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            lags: 5,
            learning_rate: 0.1,
            n_estimators: 100,
            max_depth: 6,
            l2_regularization: 1.0,
            min_split_gain: 0.0,
        }
    }
}

/// Recurrent network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurrentConfig {
    pub lags: usize,
    pub lstm_units: usize,
    pub lstm_layers: usize,
    /// Dropout rate applied to the dense output while training, in [0, 1)
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Seed for weight initialisation and batch shuffling
    pub seed: u64,
}

impl Default for RecurrentConfig {
    fn default() -> Self {
        Self {
            lags: 5,
            lstm_units: 50,
            lstm_layers: 1,
            dropout: 0.2,
            epochs: 10,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

/// Configuration for one forecasting method, tagged by method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ForecastConfig {
    ExponentialSmoothing(EtsConfig),
    Arima(ArimaConfig),
    GradientBoosting(BoostingConfig),
    Recurrent(RecurrentConfig),
}

impl ForecastConfig {
    /// The method this configuration drives
    pub fn method(&self) -> Method {
        match self {
            ForecastConfig::ExponentialSmoothing(_) => Method::ExponentialSmoothing,
            ForecastConfig::Arima(_) => Method::Arima,
            ForecastConfig::GradientBoosting(_) => Method::GradientBoosting,
            ForecastConfig::Recurrent(_) => Method::Recurrent,
        }
    }

    /// Default configuration for a method
    pub fn default_for(method: Method) -> Self {
        match method {
            Method::ExponentialSmoothing => ForecastConfig::ExponentialSmoothing(EtsConfig::default()),
            Method::Arima => ForecastConfig::Arima(ArimaConfig::default()),
            Method::GradientBoosting => ForecastConfig::GradientBoosting(BoostingConfig::default()),
            Method::Recurrent => ForecastConfig::Recurrent(RecurrentConfig::default()),
        }
    }
}

impl From<EtsConfig> for ForecastConfig {
    fn from(config: EtsConfig) -> Self {
        ForecastConfig::ExponentialSmoothing(config)
    }
}

impl From<ArimaConfig> for ForecastConfig {
    fn from(config: ArimaConfig) -> Self {
        ForecastConfig::Arima(config)
    }
}

impl From<BoostingConfig> for ForecastConfig {
    fn from(config: BoostingConfig) -> Self {
        ForecastConfig::GradientBoosting(config)
    }
}

impl From<RecurrentConfig> for ForecastConfig {
    fn from(config: RecurrentConfig) -> Self {
        ForecastConfig::Recurrent(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_matches_variant() {
        for method in Method::ALL {
            assert_eq!(ForecastConfig::default_for(method).method(), method);
        }
    }

    #[test]
    fn test_component_aliases() {
        let kind: ComponentKind = serde_json::from_str("\"mul\"").unwrap();
        assert_eq!(kind, ComponentKind::Multiplicative);
        let kind: ComponentKind = serde_json::from_str("\"none\"").unwrap();
        assert!(!kind.is_enabled());
    }

    #[test]
    fn test_tagged_json_shape() {
        let config = ForecastConfig::from(ArimaConfig {
            p: 2,
            ..Default::default()
        });
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["method"], "arima");
        assert_eq!(json["p"], 2);
        assert_eq!(json["d"], 1);
    }

    #[test]
    fn test_partial_record_uses_defaults() {
        let config: RecurrentConfig = serde_json::from_str(r#"{"lstm_units": 10}"#).unwrap();
        assert_eq!(config.lstm_units, 10);
        assert_eq!(config.lags, 5);
        assert_eq!(config.batch_size, 32);
    }
}
