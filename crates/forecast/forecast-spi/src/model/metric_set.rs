//! Accuracy scores for one forecast

use serde::{Deserialize, Serialize};

/// Metric used to rank methods against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Metric {
    Rmse,
    Mae,
    Smape,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Rmse, Metric::Mae, Metric::Smape];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Rmse => "RMSE",
            Metric::Mae => "MAE",
            Metric::Smape => "SMAPE",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// RMSE, MAE and SMAPE of one forecast against the holdout tail
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAE")]
    pub mae: f64,
    /// Percentage in [0, 200]
    #[serde(rename = "SMAPE")]
    pub smape: f64,
}

impl MetricSet {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rmse => self.rmse,
            Metric::Mae => self.mae,
            Metric::Smape => self.smape,
        }
    }

    /// Look a score up by its display name (`"RMSE"`, `"MAE"`, `"SMAPE"`)
    pub fn by_name(&self, name: &str) -> Option<f64> {
        Metric::ALL
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .map(|m| self.get(*m))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}
