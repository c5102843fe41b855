//! Gradient-boosted regression trees over lag windows
//!
//! Squared-loss boosting: every round fits a depth-limited tree to the
//! current residuals and adds it to the ensemble, shrunk by the learning
//! rate. Leaf weights carry an L2 penalty `λ`:
//!
//! ```text
//! weight = Σ residual / (count + λ)
//! gain   = G_L² / (H_L + λ) + G_R² / (H_R + λ) - G² / (H + λ)
//! ```
//!
//! where `G` sums residuals and `H` counts rows. A split is kept only when
//! its gain exceeds `min_split_gain`.

use forecast_spi::{BoostingConfig, FitWindow, ForecastError, Forecaster, Method, Result};

use super::lag_frame::{LagFrame, Rows};

/// Regression tree node
#[derive(Debug, Clone)]
enum Node {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf { weight } => *weight,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

/// Best split candidate for one node
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Boosted ensemble of regression trees
#[derive(Debug, Clone)]
pub struct GradientBoosting {
    config: BoostingConfig,
    base_score: f64,
    trees: Vec<Node>,
}

impl GradientBoosting {
    /// Create an untrained ensemble, validating the configuration
    pub fn new(config: BoostingConfig) -> Result<Self> {
        if config.lags == 0 {
            return Err(ForecastError::invalid_parameter("lags", "must be at least 1"));
        }
        if !(config.learning_rate > 0.0 && config.learning_rate <= 1.0) {
            return Err(ForecastError::invalid_parameter(
                "learning_rate",
                "must be in (0, 1]",
            ));
        }
        if config.n_estimators == 0 {
            return Err(ForecastError::invalid_parameter(
                "n_estimators",
                "must be at least 1",
            ));
        }
        if config.max_depth == 0 {
            return Err(ForecastError::invalid_parameter("max_depth", "must be at least 1"));
        }
        if !(config.l2_regularization >= 0.0) || !config.l2_regularization.is_finite() {
            return Err(ForecastError::invalid_parameter(
                "l2_regularization",
                "must be a finite non-negative number",
            ));
        }
        if !(config.min_split_gain >= 0.0) {
            return Err(ForecastError::invalid_parameter(
                "min_split_gain",
                "must be non-negative",
            ));
        }

        Ok(Self {
            config,
            base_score: 0.0,
            trees: Vec::new(),
        })
    }

    /// Train on the given rows
    pub fn fit(&mut self, rows: Rows<'_>) -> Result<()> {
        if rows.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let n = rows.len();
        self.base_score = rows.labels.iter().sum::<f64>() / n as f64;
        self.trees.clear();

        let mut predictions = vec![self.base_score; n];
        let all_rows: Vec<usize> = (0..n).collect();

        for _ in 0..self.config.n_estimators {
            let residuals: Vec<f64> = rows
                .labels
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();

            let tree = self.build_node(rows.features, &residuals, all_rows.clone(), 0);
            for (prediction, features) in predictions.iter_mut().zip(rows.features) {
                *prediction += self.config.learning_rate * tree.predict(features);
            }
            self.trees.push(tree);
        }

        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(ForecastError::model_fit("boosting produced non-finite fitted values"));
        }
        Ok(())
    }

    fn leaf_weight(&self, sum: f64, count: usize) -> f64 {
        sum / (count as f64 + self.config.l2_regularization)
    }

    fn score(&self, sum: f64, count: usize) -> f64 {
        let denom = count as f64 + self.config.l2_regularization;
        if denom > 0.0 {
            sum * sum / denom
        } else {
            0.0
        }
    }

    fn build_node(
        &self,
        features: &[Vec<f64>],
        residuals: &[f64],
        indices: Vec<usize>,
        depth: usize,
    ) -> Node {
        let sum: f64 = indices.iter().map(|&i| residuals[i]).sum();
        let leaf = Node::Leaf {
            weight: self.leaf_weight(sum, indices.len()),
        };

        if depth >= self.config.max_depth || indices.len() < 2 {
            return leaf;
        }

        let Some(split) = self.best_split(features, residuals, &indices, sum) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| features[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build_node(features, residuals, left, depth + 1)),
            right: Box::new(self.build_node(features, residuals, right, depth + 1)),
        }
    }

    fn best_split(
        &self,
        features: &[Vec<f64>],
        residuals: &[f64],
        indices: &[usize],
        total: f64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_score = self.score(total, n);
        let n_features = features[indices[0]].len();
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..n_features {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                features[a][feature]
                    .partial_cmp(&features[b][feature])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += residuals[sorted[k]];
                let current = features[sorted[k]][feature];
                let next = features[sorted[k + 1]][feature];
                if current == next {
                    continue;
                }

                let left_count = k + 1;
                let gain = self.score(left_sum, left_count)
                    + self.score(total - left_sum, n - left_count)
                    - parent_score;

                if gain > self.config.min_split_gain
                    && best.as_ref().map_or(true, |b| gain > b.gain)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: (current + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict one value per feature row
    pub fn predict(&self, features: &[Vec<f64>]) -> Vec<f64> {
        features
            .iter()
            .map(|row| {
                self.base_score
                    + self
                        .trees
                        .iter()
                        .map(|tree| self.config.learning_rate * tree.predict(row))
                        .sum::<f64>()
            })
            .collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Adapter running [`GradientBoosting`] behind the [`Forecaster`] contract
#[derive(Debug, Clone)]
pub struct BoostingForecaster {
    config: BoostingConfig,
}

impl BoostingForecaster {
    pub fn new(config: BoostingConfig) -> Self {
        Self { config }
    }
}

impl Forecaster for BoostingForecaster {
    fn method(&self) -> Method {
        Method::GradientBoosting
    }

    fn fit_window(&self) -> FitWindow {
        FitWindow::Full
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let mut model = GradientBoosting::new(self.config.clone())?;
        let frame = LagFrame::build(series, self.config.lags, horizon)?;
        let (train, test) = frame.split(horizon);
        model.fit(train)?;

        let predictions = model.predict(test.features);
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(ForecastError::model_fit("boosting produced non-finite forecasts"));
        }
        Ok(predictions)
    }
}
