//! Forecast Core
//!
//! Core implementations for the forecast pipeline: the metric evaluator,
//! the four method adapters, the concurrent orchestrator, the forecast
//! cache and classical decomposition.

pub mod cache;
pub mod decomposition;
pub mod methods;
pub mod metrics;
pub mod orchestrator;

// Re-export SPI types used alongside the implementations
pub use forecast_spi::{
    DecompositionResult, Decomposer, ForecastError, Forecaster, ProgressSink, Result,
};

// Re-export main types
pub use cache::{CacheStats, ForecastCache};
pub use decomposition::{decompose, AdditiveDecomposer, MultiplicativeDecomposer};
pub use methods::{forecast, forecaster_for};
pub use metrics::evaluate;
pub use orchestrator::{Orchestrator, DEFAULT_WORKERS};
