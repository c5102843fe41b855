//! Forecast Service Provider Interface
//!
//! Defines the contracts and data model shared by the forecast pipeline:
//!
//! - [`Forecaster`]: uniform adapter contract for one forecasting method
//! - [`ProgressSink`]: receiver of `(completed, total)` progress reports
//! - [`Decomposer`]: trend/seasonal/residual decomposition
//! - [`ForecastConfig`]: tagged per-method configuration
//! - [`PipelineRun`]: per-method outcomes handed to presentation
//! - [`ForecastError`]: error taxonomy for fitting and scoring

pub mod contract;
pub mod error;
pub mod model;

/// Number of future steps forecast by default
pub const HORIZON: usize = 12;

// Re-export all public items at crate root for convenience
pub use contract::{ChannelSink, Decomposer, FitWindow, Forecaster, ProgressSink};
pub use error::{ForecastError, Result};
pub use model::{
    ArimaConfig, BoostingConfig, ComponentKind, DecompositionModel, DecompositionResult,
    EtsConfig, ForecastConfig, ForecastResult, Method, MethodConfigs, MethodOutcome, Metric,
    MetricSet, PipelineRun, Progress, RecurrentConfig, SeasonalOrder, TimeSeries,
};
