//! Results of one orchestrated run

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Method, Metric, MetricSet};
use crate::error::ForecastError;

/// Exactly `horizon` predictions produced by one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastResult(Vec<f64>);

impl ForecastResult {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

/// What happened to one method during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Succeeded {
        forecast: ForecastResult,
        metrics: MetricSet,
        elapsed: Duration,
    },
    Failed {
        error: ForecastError,
        elapsed: Duration,
    },
}

impl MethodOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MethodOutcome::Succeeded { .. })
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        match self {
            MethodOutcome::Succeeded { forecast, .. } => Some(forecast),
            MethodOutcome::Failed { .. } => None,
        }
    }

    pub fn metrics(&self) -> Option<&MetricSet> {
        match self {
            MethodOutcome::Succeeded { metrics, .. } => Some(metrics),
            MethodOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ForecastError> {
        match self {
            MethodOutcome::Failed { error, .. } => Some(error),
            MethodOutcome::Succeeded { .. } => None,
        }
    }

    /// Message shown in place of a failed method's chart line and metrics row
    pub fn failure_reason(&self) -> Option<String> {
        self.error().map(|e| e.to_string())
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            MethodOutcome::Succeeded { elapsed, .. } | MethodOutcome::Failed { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

/// Hand-off structure from the orchestrator to presentation.
///
/// Holds one outcome per configured method; a method is never silently
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub horizon: usize,
    /// True values the forecasts were scored against
    pub holdout: Vec<f64>,
    pub outcomes: BTreeMap<Method, MethodOutcome>,
}

impl PipelineRun {
    pub fn new(horizon: usize, holdout: Vec<f64>) -> Self {
        Self {
            horizon,
            holdout,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn outcome(&self, method: Method) -> Option<&MethodOutcome> {
        self.outcomes.get(&method)
    }

    pub fn forecast(&self, method: Method) -> Option<&ForecastResult> {
        self.outcome(method).and_then(MethodOutcome::forecast)
    }

    pub fn metrics(&self, method: Method) -> Option<&MetricSet> {
        self.outcome(method).and_then(MethodOutcome::metrics)
    }

    pub fn successes(&self) -> impl Iterator<Item = (Method, &ForecastResult, &MetricSet)> {
        self.outcomes.iter().filter_map(|(method, outcome)| match outcome {
            MethodOutcome::Succeeded {
                forecast, metrics, ..
            } => Some((*method, forecast, metrics)),
            MethodOutcome::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (Method, &ForecastError)> {
        self.outcomes
            .iter()
            .filter_map(|(method, outcome)| outcome.error().map(|e| (*method, e)))
    }

    /// One metric row per successful method, ordered by method
    pub fn metrics_table(&self) -> Vec<(Method, MetricSet)> {
        self.successes()
            .map(|(method, _, metrics)| (method, *metrics))
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Method with the lowest score on `metric`, ignoring non-finite scores
    pub fn best_by(&self, metric: Metric) -> Option<(Method, f64)> {
        self.successes()
            .map(|(method, _, metrics)| (method, metrics.get(metric)))
            .filter(|(_, score)| score.is_finite())
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Advisory progress report emitted as adapters finish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Method whose completion produced this report
    pub method: Method,
    pub succeeded: bool,
}

impl Progress {
    /// Completed fraction in [0, 1]; an empty run counts as done
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}
