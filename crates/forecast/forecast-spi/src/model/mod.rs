//! Model module containing data structures

mod decomposition_result;
mod forecast_config;
mod method;
mod method_configs;
mod metric_set;
mod pipeline_run;
mod time_series;

pub use decomposition_result::{DecompositionModel, DecompositionResult};
pub use forecast_config::{
    ArimaConfig, BoostingConfig, ComponentKind, EtsConfig, ForecastConfig, RecurrentConfig,
    SeasonalOrder,
};
pub use method::Method;
pub use method_configs::MethodConfigs;
pub use metric_set::{Metric, MetricSet};
pub use pipeline_run::{ForecastResult, MethodOutcome, PipelineRun, Progress};
pub use time_series::TimeSeries;
