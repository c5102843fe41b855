//! Forecast Facade
//!
//! High-level API for the forecast pipeline. Re-exports all public types
//! from the forecast stack for convenient usage.

// Re-export everything from API (which includes SPI and core)
pub use forecast_api::*;

// Explicit re-exports for documentation
pub use forecast_api::prelude;

// Re-export core modules for direct access
pub use forecast_core::{cache, decomposition, methods, metrics, orchestrator};

// Re-export concrete adapters and decomposers at root
pub use forecast_core::decomposition::{AdditiveDecomposer, MultiplicativeDecomposer};
pub use forecast_core::methods::{
    ArimaForecaster, BoostingForecaster, EtsForecaster, RecurrentForecaster,
};
