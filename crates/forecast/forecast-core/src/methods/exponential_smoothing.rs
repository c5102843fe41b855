//! Exponential smoothing with optional trend, seasonality and damping
//!
//! Exponential smoothing assigns exponentially decreasing weights to past
//! observations. One recursion covers the whole family:
//!
//! - **Trend**: additive (`l + h·b`), multiplicative (`l · b^h`) or none
//! - **Seasonal**: additive (`+ s`), multiplicative (`· s`) or none
//! - **Damping**: replaces `h` by `φ + φ² + … + φ^h`
//!
//! ## Parameter selection
//!
//! The smoothing weights `alpha` (level), `beta` (trend), `gamma` (seasonal)
//! and `phi` (damping) are picked by grid search on the in-sample sum of
//! squared one-step errors.

use forecast_spi::{
    ComponentKind, EtsConfig, FitWindow, ForecastError, Forecaster, Method, Result,
};

const ALPHA_GRID: [f64; 11] = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95];
const BETA_GRID: [f64; 5] = [0.01, 0.05, 0.1, 0.2, 0.3];
const GAMMA_GRID: [f64; 6] = [0.01, 0.05, 0.1, 0.2, 0.3, 0.5];
const PHI_GRID: [f64; 5] = [0.8, 0.85, 0.9, 0.95, 0.98];

/// Smoothing weights for one candidate fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub phi: f64,
}

/// Fitted state at the end of the series
#[derive(Debug, Clone)]
struct State {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

/// Exponential smoothing model
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    config: EtsConfig,
    params: Option<SmoothingParams>,
    state: Option<State>,
    /// Number of observations the model was fitted on
    n_obs: usize,
}

impl ExponentialSmoothing {
    /// Create an unfitted model, validating the configuration
    pub fn new(config: EtsConfig) -> Result<Self> {
        if config.seasonal.is_enabled() && config.seasonal_periods < 2 {
            return Err(ForecastError::invalid_parameter(
                "seasonal_periods",
                "must be at least 2 when seasonality is enabled",
            ));
        }
        if config.damped_trend && !config.trend.is_enabled() {
            return Err(ForecastError::invalid_parameter(
                "damped_trend",
                "only a trend component can be damped",
            ));
        }

        Ok(Self {
            config,
            params: None,
            state: None,
            n_obs: 0,
        })
    }

    fn period(&self) -> usize {
        if self.config.seasonal.is_enabled() {
            self.config.seasonal_periods
        } else {
            1
        }
    }

    fn min_observations(&self) -> usize {
        if self.config.seasonal.is_enabled() {
            2 * self.config.seasonal_periods
        } else if self.config.trend.is_enabled() {
            3
        } else {
            2
        }
    }

    fn uses_multiplicative(&self) -> bool {
        self.config.trend == ComponentKind::Multiplicative
            || self.config.seasonal == ComponentKind::Multiplicative
    }

    /// Sum of damping factors for an `h`-step projection
    fn damped_steps(phi: f64, h: usize) -> f64 {
        if phi == 1.0 {
            return h as f64;
        }
        (1..=h).map(|k| phi.powi(k as i32)).sum()
    }

    fn trend_projection(&self, level: f64, trend: f64, steps: f64) -> f64 {
        match self.config.trend {
            ComponentKind::None => level,
            ComponentKind::Additive => level + steps * trend,
            ComponentKind::Multiplicative => level * trend.powf(steps),
        }
    }

    fn with_season(&self, base: f64, season: f64) -> f64 {
        match self.config.seasonal {
            ComponentKind::None => base,
            ComponentKind::Additive => base + season,
            ComponentKind::Multiplicative => base * season,
        }
    }

    /// Initial state positioned at the last observation used for
    /// initialisation, plus the index the recursion starts from.
    fn initial_state(&self, data: &[f64]) -> (State, usize) {
        if !self.config.seasonal.is_enabled() {
            let trend = match self.config.trend {
                ComponentKind::None => 0.0,
                ComponentKind::Additive => data[1] - data[0],
                ComponentKind::Multiplicative => data[1] / data[0],
            };
            let state = State {
                level: data[0],
                trend,
                seasonal: vec![0.0],
            };
            return (state, 1);
        }

        let m = self.config.seasonal_periods;
        let first = data[..m].iter().sum::<f64>() / m as f64;
        let second = data[m..2 * m].iter().sum::<f64>() / m as f64;
        let trend = match self.config.trend {
            ComponentKind::None => 0.0,
            ComponentKind::Additive => (second - first) / m as f64,
            ComponentKind::Multiplicative => (second / first).powf(1.0 / m as f64),
        };

        // The first-season mean sits at the centre of the season
        let centre = (m as f64 - 1.0) / 2.0;
        let seasonal = (0..m)
            .map(|i| {
                let base = self.trend_projection(first, trend, i as f64 - centre);
                match self.config.seasonal {
                    ComponentKind::Multiplicative => data[i] / base,
                    _ => data[i] - base,
                }
            })
            .collect();
        let level = self.trend_projection(first, trend, centre);

        (
            State {
                level,
                trend,
                seasonal,
            },
            m,
        )
    }

    /// Run the smoothing recursion; returns the final state and the sum of
    /// squared one-step errors, or `None` if the recursion breaks down.
    fn run(&self, data: &[f64], params: SmoothingParams) -> Option<(State, f64)> {
        let SmoothingParams {
            alpha,
            beta,
            gamma,
            phi,
        } = params;
        let period = self.period();
        let (mut state, start) = self.initial_state(data);
        let mut sse = 0.0;

        for (t, &value) in data.iter().enumerate().skip(start) {
            let slot = t % period;
            let season = state.seasonal[slot];
            let base = self.trend_projection(state.level, state.trend, phi);
            let fitted = self.with_season(base, season);
            if !fitted.is_finite() {
                return None;
            }
            sse += (value - fitted).powi(2);

            let deseasonalized = match self.config.seasonal {
                ComponentKind::None => value,
                ComponentKind::Additive => value - season,
                ComponentKind::Multiplicative => {
                    if season.abs() < 1e-10 {
                        return None;
                    }
                    value / season
                }
            };

            let prev_level = state.level;
            state.level = alpha * deseasonalized + (1.0 - alpha) * base;
            state.trend = match self.config.trend {
                ComponentKind::None => 0.0,
                ComponentKind::Additive => {
                    beta * (state.level - prev_level) + (1.0 - beta) * phi * state.trend
                }
                ComponentKind::Multiplicative => {
                    if prev_level.abs() < 1e-10 {
                        return None;
                    }
                    beta * (state.level / prev_level) + (1.0 - beta) * state.trend.powf(phi)
                }
            };
            state.seasonal[slot] = match self.config.seasonal {
                ComponentKind::None => 0.0,
                ComponentKind::Additive => gamma * (value - state.level) + (1.0 - gamma) * season,
                ComponentKind::Multiplicative => {
                    if state.level.abs() < 1e-10 {
                        return None;
                    }
                    gamma * (value / state.level) + (1.0 - gamma) * season
                }
            };
        }

        if sse.is_finite() {
            Some((state, sse))
        } else {
            None
        }
    }

    fn candidate_params(&self) -> Vec<SmoothingParams> {
        let betas: &[f64] = if self.config.trend.is_enabled() {
            &BETA_GRID
        } else {
            &[0.0]
        };
        let gammas: &[f64] = if self.config.seasonal.is_enabled() {
            &GAMMA_GRID
        } else {
            &[0.0]
        };
        let phis: &[f64] = if self.config.damped_trend { &PHI_GRID } else { &[1.0] };

        let mut candidates = Vec::new();
        for &alpha in &ALPHA_GRID {
            for &beta in betas {
                for &gamma in gammas {
                    for &phi in phis {
                        candidates.push(SmoothingParams {
                            alpha,
                            beta,
                            gamma,
                            phi,
                        });
                    }
                }
            }
        }
        candidates
    }

    /// Fit the model to historical data
    pub fn fit(&mut self, data: &[f64]) -> Result<()> {
        let required = self.min_observations();
        if data.len() < required {
            return Err(ForecastError::model_fit(format!(
                "exponential smoothing needs at least {} observations, got {}",
                required,
                data.len()
            )));
        }
        if self.uses_multiplicative() && data.iter().any(|&x| x <= 0.0) {
            return Err(ForecastError::model_fit(
                "multiplicative components require strictly positive data",
            ));
        }

        let mut best: Option<(SmoothingParams, State, f64)> = None;
        for params in self.candidate_params() {
            if let Some((state, sse)) = self.run(data, params) {
                if best.as_ref().map_or(true, |(_, _, best_sse)| sse < *best_sse) {
                    best = Some((params, state, sse));
                }
            }
        }

        let (params, state, _) = best.ok_or_else(|| {
            ForecastError::model_fit("no smoothing parameters produced a finite fit")
        })?;

        self.params = Some(params);
        self.state = Some(state);
        self.n_obs = data.len();
        Ok(())
    }

    /// Project `steps` values beyond the fitted data
    pub fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        let (state, params) = match (&self.state, &self.params) {
            (Some(state), Some(params)) => (state, params),
            _ => return Err(ForecastError::model_fit("model must be fitted before prediction")),
        };

        let period = self.period();
        let forecasts: Vec<f64> = (1..=steps)
            .map(|h| {
                let base = self.trend_projection(
                    state.level,
                    state.trend,
                    Self::damped_steps(params.phi, h),
                );
                let slot = (self.n_obs - 1 + h) % period;
                self.with_season(base, state.seasonal[slot])
            })
            .collect();

        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::model_fit(
                "exponential smoothing produced non-finite forecasts",
            ));
        }
        Ok(forecasts)
    }

    /// Selected smoothing weights
    pub fn params(&self) -> Option<SmoothingParams> {
        self.params
    }
}

/// Adapter running [`ExponentialSmoothing`] behind the [`Forecaster`] contract
#[derive(Debug, Clone)]
pub struct EtsForecaster {
    config: EtsConfig,
}

impl EtsForecaster {
    pub fn new(config: EtsConfig) -> Self {
        Self { config }
    }
}

impl Forecaster for EtsForecaster {
    fn method(&self) -> Method {
        Method::ExponentialSmoothing
    }

    fn fit_window(&self) -> FitWindow {
        FitWindow::History
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let mut model = ExponentialSmoothing::new(self.config.clone())?;
        model.fit(series)?;
        model.predict(horizon)
    }
}
