//! Forecast Consumer API
//!
//! Consumer configuration and builder APIs for the forecast pipeline.
//!
//! This crate provides:
//! - [`PipelineConfig`], loadable from and savable to TOML
//! - [`PipelineBuilder`] for constructing a [`ForecastPipeline`] in code
//! - Re-exports from SPI and core for convenience
//!
//! ```toml
//! horizon = 12
//! workers = 4
//! task_timeout_ms = 30000
//! methods = ["ets", "arima", "gbt", "lstm"]
//!
//! [ets]
//! trend = "add"
//! seasonal = "add"
//! seasonal_periods = 12
//!
//! [lstm]
//! lstm_units = 10
//! epochs = 10
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

// Re-export from core
pub use forecast_core::{
    cache, decompose, decomposition, evaluate, forecast, forecaster_for, methods, metrics,
    orchestrator, CacheStats, ForecastCache, Orchestrator,
};

// Re-export from SPI
pub use forecast_spi::{
    ArimaConfig, BoostingConfig, ChannelSink, ComponentKind, DecompositionModel,
    DecompositionResult, Decomposer, EtsConfig, FitWindow, ForecastConfig, ForecastError,
    ForecastResult, Forecaster, Method, MethodConfigs, MethodOutcome, Metric, MetricSet,
    PipelineRun, Progress, ProgressSink, RecurrentConfig, Result, SeasonalOrder, TimeSeries,
    HORIZON,
};

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Configuration for decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    /// Seasonality period
    pub period: usize,
    /// Whether to use multiplicative decomposition
    pub multiplicative: bool,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            period: 12,
            multiplicative: false,
        }
    }
}

impl DecompositionConfig {
    pub fn model(&self) -> DecompositionModel {
        if self.multiplicative {
            DecompositionModel::Multiplicative
        } else {
            DecompositionModel::Additive
        }
    }
}

/// Configuration for a forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Steps to forecast and to hold out for scoring
    pub horizon: usize,
    /// Worker threads in the pool
    pub workers: usize,
    /// Per-method deadline in milliseconds
    pub task_timeout_ms: Option<u64>,
    /// Memoise forecasts across runs of the same pipeline
    pub cache: bool,
    /// Methods to run
    pub methods: Vec<Method>,
    pub ets: EtsConfig,
    pub arima: ArimaConfig,
    pub gbt: BoostingConfig,
    pub lstm: RecurrentConfig,
    pub decomposition: DecompositionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: HORIZON,
            workers: forecast_core::DEFAULT_WORKERS,
            task_timeout_ms: None,
            cache: false,
            methods: Method::ALL.to_vec(),
            ets: EtsConfig::default(),
            arima: ArimaConfig::default(),
            gbt: BoostingConfig::default(),
            lstm: RecurrentConfig::default(),
            decomposition: DecompositionConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn from_toml_str(s: &str) -> std::result::Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded pipeline config");
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::result::Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check run-level settings; per-method values are checked by the adapters
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::Invalid {
                field: "horizon",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.task_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid {
                field: "task_timeout_ms",
                reason: "must be positive when set".to_string(),
            });
        }
        if self.decomposition.period < 2 {
            return Err(ConfigError::Invalid {
                field: "decomposition.period",
                reason: "must be at least 2".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration of every enabled method
    pub fn method_configs(&self) -> MethodConfigs {
        self.methods
            .iter()
            .map(|method| match method {
                Method::ExponentialSmoothing => ForecastConfig::from(self.ets.clone()),
                Method::Arima => ForecastConfig::from(self.arima.clone()),
                Method::GradientBoosting => ForecastConfig::from(self.gbt.clone()),
                Method::Recurrent => ForecastConfig::from(self.lstm.clone()),
            })
            .collect()
    }

    /// Orchestrator carrying the run-level settings
    pub fn orchestrator(&self) -> Orchestrator {
        let mut orchestrator = Orchestrator::new()
            .with_horizon(self.horizon)
            .with_workers(self.workers);
        if let Some(ms) = self.task_timeout_ms {
            orchestrator = orchestrator.with_task_timeout(Duration::from_millis(ms));
        }
        if self.cache {
            orchestrator = orchestrator.with_cache(Arc::new(ForecastCache::new()));
        }
        orchestrator
    }

    pub fn into_pipeline(self) -> std::result::Result<ForecastPipeline, ConfigError> {
        self.validate()?;
        Ok(ForecastPipeline {
            orchestrator: self.orchestrator(),
            configs: self.method_configs(),
            decomposition: self.decomposition,
        })
    }
}

/// Ready-to-run forecast pipeline
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    orchestrator: Orchestrator,
    configs: MethodConfigs,
    decomposition: DecompositionConfig,
}

impl ForecastPipeline {
    /// Forecast, score and collect every configured method
    pub fn run(&self, series: &TimeSeries) -> Result<PipelineRun> {
        self.orchestrator.run(series, &self.configs)
    }

    /// Trend/seasonal/residual view of the series
    pub fn decompose(&self, series: &TimeSeries) -> Result<DecompositionResult> {
        decompose(
            series.values(),
            self.decomposition.period,
            self.decomposition.model(),
        )
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn configs(&self) -> &MethodConfigs {
        &self.configs
    }
}

/// Builder for [`ForecastPipeline`]
///
/// # Example
///
/// ```rust
/// use forecast_api::{EtsConfig, Method, PipelineConfig};
///
/// let pipeline = PipelineConfig::builder()
///     .horizon(6)
///     .methods([Method::ExponentialSmoothing, Method::Arima])
///     .ets(EtsConfig { seasonal_periods: 4, ..EtsConfig::default() })
///     .build()
///     .unwrap();
/// assert_eq!(pipeline.configs().len(), 2);
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    progress: Option<Box<dyn FnOnce(Orchestrator) -> Orchestrator>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: PipelineConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    pub fn horizon(mut self, horizon: usize) -> Self {
        self.config.horizon = horizon;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.config.task_timeout_ms = Some(forecast_core::orchestrator::timeout_millis(timeout));
        self
    }

    pub fn cache(mut self, enabled: bool) -> Self {
        self.config.cache = enabled;
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.config.methods = methods.into_iter().collect();
        self
    }

    pub fn ets(mut self, config: EtsConfig) -> Self {
        self.config.ets = config;
        self
    }

    pub fn arima(mut self, config: ArimaConfig) -> Self {
        self.config.arima = config;
        self
    }

    pub fn gbt(mut self, config: BoostingConfig) -> Self {
        self.config.gbt = config;
        self
    }

    pub fn lstm(mut self, config: RecurrentConfig) -> Self {
        self.config.lstm = config;
        self
    }

    pub fn decomposition(mut self, config: DecompositionConfig) -> Self {
        self.config.decomposition = config;
        self
    }

    /// Receive progress reports while runs execute
    pub fn progress<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.progress = Some(Box::new(move |o: Orchestrator| o.with_progress(sink)));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn build(self) -> std::result::Result<ForecastPipeline, ConfigError> {
        let mut pipeline = self.config.into_pipeline()?;
        if let Some(attach) = self.progress {
            pipeline.orchestrator = attach(pipeline.orchestrator);
        }
        Ok(pipeline)
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        ConfigError, DecompositionConfig, ForecastPipeline, PipelineBuilder, PipelineConfig,
    };
    pub use forecast_core::{decompose, evaluate, ForecastCache, Orchestrator};
    pub use forecast_spi::{
        ForecastConfig, ForecastError, Forecaster, Method, MethodConfigs, MethodOutcome,
        MetricSet, PipelineRun, Progress, ProgressSink, Result, TimeSeries,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.horizon, 12);
        assert_eq!(config.workers, 4);
        assert_eq!(config.methods.len(), 4);
        assert_eq!(config.decomposition.period, 12);
        assert!(!config.decomposition.multiplicative);
        assert_eq!(config.method_configs(), MethodConfigs::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            horizon = 6
            methods = ["ets", "gbt"]

            [gbt]
            lags = 3

            [arima]
            p = 2
            [arima.seasonal]
            period = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.horizon, 6);
        assert_eq!(config.workers, 4);
        assert_eq!(
            config.methods,
            vec![Method::ExponentialSmoothing, Method::GradientBoosting]
        );
        assert_eq!(config.gbt.lags, 3);
        assert_eq!(config.gbt.n_estimators, 100);
        let seasonal = config.arima.seasonal.unwrap();
        assert_eq!((seasonal.p, seasonal.d, seasonal.q, seasonal.period), (1, 1, 1, 4));

        let methods: Vec<Method> = config.method_configs().methods().collect();
        assert_eq!(
            methods,
            vec![Method::ExponentialSmoothing, Method::GradientBoosting]
        );
    }

    #[test]
    fn test_component_aliases() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [ets]
            trend = "mul"
            seasonal = "none"
            damped_trend = true
            "#,
        )
        .unwrap();
        assert_eq!(config.ets.trend, ComponentKind::Multiplicative);
        assert_eq!(config.ets.seasonal, ComponentKind::None);
        assert!(config.ets.damped_trend);
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = PipelineConfig::default();
        config.task_timeout_ms = Some(2500);
        config.lstm.lstm_units = 10;
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        let config = PipelineConfig::builder().horizon(8).cache(true).config().clone();
        config.save(&path).unwrap();
        assert_eq!(PipelineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PipelineConfig::from_toml_str("horizon = 0"),
            Err(ConfigError::Invalid { field: "horizon", .. })
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("methods = [\"prophet\"]"),
            Err(ConfigError::Parse(_))
        ));
        assert!(PipelineConfig::builder().workers(0).build().is_err());
    }

    #[test]
    fn test_sub_millisecond_timeout_rounds_up() {
        let pipeline = PipelineConfig::builder()
            .task_timeout(Duration::from_micros(400))
            .build()
            .unwrap();
        assert_eq!(
            pipeline.orchestrator().task_timeout(),
            Some(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_orchestrator_settings() {
        let config = PipelineConfig {
            task_timeout_ms: Some(1500),
            cache: true,
            workers: 2,
            ..PipelineConfig::default()
        };
        let orchestrator = config.orchestrator();
        assert_eq!(orchestrator.workers(), 2);
        assert_eq!(orchestrator.task_timeout(), Some(Duration::from_millis(1500)));
        assert!(orchestrator.cache().is_some());
    }

    #[test]
    fn test_builder_pipeline_runs() {
        let (tx, rx) = mpsc::channel();
        let pipeline = PipelineConfig::builder()
            .horizon(6)
            .methods([Method::GradientBoosting])
            .gbt(BoostingConfig {
                n_estimators: 20,
                ..BoostingConfig::default()
            })
            .progress(ChannelSink::new(tx))
            .build()
            .unwrap();

        let series = TimeSeries::new((0..40).map(|i| (i % 7) as f64).collect()).unwrap();
        let run = pipeline.run(&series).unwrap();
        assert_eq!(run.success_count(), 1);
        assert_eq!(run.forecast(Method::GradientBoosting).unwrap().len(), 6);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn test_pipeline_decompose() {
        let pipeline = PipelineConfig::builder()
            .decomposition(DecompositionConfig {
                period: 4,
                multiplicative: true,
            })
            .build()
            .unwrap();
        let series =
            TimeSeries::new((0..16).map(|i| 10.0 + [1.0, 2.0, 3.0, 2.0][i % 4]).collect())
                .unwrap();
        let result = pipeline.decompose(&series).unwrap();
        assert_eq!(result.model, DecompositionModel::Multiplicative);
        assert_eq!(result.period, 4);
    }
}
