//! ARIMA and seasonal ARIMA
//!
//! The model combines three components:
//!
//! - **AR (AutoRegressive)**: Uses past values to predict future values
//! - **I (Integrated)**: Differencing to achieve stationarity
//! - **MA (Moving Average)**: Uses past forecast errors
//!
//! With a seasonal order `(P, D, Q, m)` the differencing gains `D` lag-`m`
//! steps and the AR/MA parts gain the seasonal lags `m, 2m, ..`.
//!
//! ## Parameters
//!
//! - `p`, `P`: autoregressive orders (0-10, 0-5)
//! - `d`, `D`: differencing orders (0-2)
//! - `q`, `Q`: moving average orders (0-10, 0-5)
//! - `m`: seasonal period (>= 2)
//!
//! ## Example
//!
//! ```rust
//! use forecast_core::methods::arima::Arima;
//! use forecast_spi::ArimaConfig;
//!
//! let data: Vec<f64> = (1..=30).map(|x| x as f64 + (x as f64 * 0.7).sin()).collect();
//! let mut model = Arima::new(ArimaConfig { p: 1, d: 1, q: 0, seasonal: None }).unwrap();
//! model.fit(&data).unwrap();
//! assert_eq!(model.predict(3).unwrap().len(), 3);
//! ```

use forecast_spi::{ArimaConfig, FitWindow, ForecastError, Forecaster, Method, Result};

/// Observations required after differencing beyond the largest lag
const MIN_EFFECTIVE_OBS: usize = 8;

/// ARIMA model for time series forecasting
#[derive(Debug, Clone)]
pub struct Arima {
    config: ArimaConfig,
    /// Lags carrying an AR coefficient, ascending
    ar_lags: Vec<usize>,
    /// Lags carrying an MA coefficient, ascending
    ma_lags: Vec<usize>,
    /// Lag of every differencing step, regular steps first
    diff_lags: Vec<usize>,
    ar_coeffs: Vec<f64>,
    ma_coeffs: Vec<f64>,
    constant: f64,
    /// Input of every differencing step (for undifferencing)
    stages: Vec<Vec<f64>>,
    /// Fully differenced data
    differenced_data: Vec<f64>,
    residuals: Vec<f64>,
    fitted: bool,
}

impl Arima {
    /// Create an unfitted model, validating the orders
    pub fn new(config: ArimaConfig) -> Result<Self> {
        if config.p > 10 {
            return Err(ForecastError::invalid_parameter("p", "AR order must be <= 10"));
        }
        if config.d > 2 {
            return Err(ForecastError::invalid_parameter(
                "d",
                "Differencing order must be <= 2",
            ));
        }
        if config.q > 10 {
            return Err(ForecastError::invalid_parameter("q", "MA order must be <= 10"));
        }

        let mut ar_lags: Vec<usize> = (1..=config.p).collect();
        let mut ma_lags: Vec<usize> = (1..=config.q).collect();
        let mut diff_lags = vec![1; config.d];

        if let Some(seasonal) = config.seasonal {
            if seasonal.period < 2 {
                return Err(ForecastError::invalid_parameter(
                    "period",
                    "seasonal period must be >= 2",
                ));
            }
            if seasonal.p > 5 {
                return Err(ForecastError::invalid_parameter(
                    "P",
                    "seasonal AR order must be <= 5",
                ));
            }
            if seasonal.d > 2 {
                return Err(ForecastError::invalid_parameter(
                    "D",
                    "seasonal differencing order must be <= 2",
                ));
            }
            if seasonal.q > 5 {
                return Err(ForecastError::invalid_parameter(
                    "Q",
                    "seasonal MA order must be <= 5",
                ));
            }

            let m = seasonal.period;
            ar_lags.extend((1..=seasonal.p).map(|k| k * m));
            ma_lags.extend((1..=seasonal.q).map(|k| k * m));
            diff_lags.extend(std::iter::repeat(m).take(seasonal.d));
        }

        ar_lags.sort_unstable();
        ar_lags.dedup();
        ma_lags.sort_unstable();
        ma_lags.dedup();

        Ok(Self {
            ar_coeffs: vec![0.0; ar_lags.len()],
            ma_coeffs: vec![0.0; ma_lags.len()],
            config,
            ar_lags,
            ma_lags,
            diff_lags,
            constant: 0.0,
            stages: Vec::new(),
            differenced_data: Vec::new(),
            residuals: Vec::new(),
            fitted: false,
        })
    }

    fn max_lag(&self) -> usize {
        let ar = self.ar_lags.last().copied().unwrap_or(0);
        let ma = self.ma_lags.last().copied().unwrap_or(0);
        ar.max(ma)
    }

    /// Minimum series length this order can be fitted on
    pub fn min_observations(&self) -> usize {
        self.diff_lags.iter().sum::<usize>() + self.max_lag() + MIN_EFFECTIVE_OBS
    }

    /// Apply every differencing step, keeping each step's input
    fn difference(data: &[f64], lags: &[usize]) -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut stages = Vec::with_capacity(lags.len());
        let mut current = data.to_vec();
        for &lag in lags {
            let next: Vec<f64> = (lag..current.len())
                .map(|i| current[i] - current[i - lag])
                .collect();
            stages.push(current);
            current = next;
        }
        (stages, current)
    }

    /// Reverse differencing to get original scale
    fn undifference(&self, forecasts: &[f64]) -> Vec<f64> {
        let mut result = forecasts.to_vec();
        for (stage, &lag) in self.stages.iter().zip(&self.diff_lags).rev() {
            let mut extended = stage.clone();
            for value in &result {
                let base = extended[extended.len() - lag];
                extended.push(base + value);
            }
            result = extended.split_off(stage.len());
        }
        result
    }

    /// Autocovariances of `centered` for lags `0..=max_lag`
    fn autocovariances(centered: &[f64], max_lag: usize) -> Vec<f64> {
        let n = centered.len();
        (0..=max_lag)
            .map(|k| {
                let sum: f64 = (k..n).map(|i| centered[i] * centered[i - k]).sum();
                sum / n as f64
            })
            .collect()
    }

    /// Estimate AR coefficients over the subset lags with Yule-Walker equations
    fn estimate_ar_coefficients(&self, data: &[f64]) -> Result<Vec<f64>> {
        if self.ar_lags.is_empty() {
            return Ok(Vec::new());
        }

        let n = data.len();
        let mean: f64 = data.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
        let max_lag = self.ar_lags.last().copied().unwrap_or(0);
        let gamma = Self::autocovariances(&centered, max_lag);

        let k = self.ar_lags.len();
        // Constant after differencing: the mean alone forecasts it exactly
        if gamma[0] <= 1e-10 {
            return Ok(vec![0.0; k]);
        }

        let mut matrix = vec![vec![0.0; k]; k];
        let mut rhs = vec![0.0; k];
        for (i, &li) in self.ar_lags.iter().enumerate() {
            for (j, &lj) in self.ar_lags.iter().enumerate() {
                matrix[i][j] = gamma[li.abs_diff(lj)];
            }
            rhs[i] = gamma[li];
        }

        solve_linear_system(matrix, rhs).ok_or_else(|| {
            ForecastError::model_fit("Yule-Walker system is singular; AR estimation did not converge")
        })
    }

    /// Estimate MA coefficients from residual autocorrelation
    fn estimate_ma_coefficients(&self, residuals: &[f64]) -> Vec<f64> {
        if self.ma_lags.is_empty() || residuals.is_empty() {
            return vec![0.0; self.ma_lags.len()];
        }

        let n = residuals.len();
        let mean: f64 = residuals.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = residuals.iter().map(|x| x - mean).collect();
        let max_lag = self.ma_lags.last().copied().unwrap_or(0);
        let gamma = Self::autocovariances(&centered, max_lag);

        if gamma[0].abs() <= 1e-10 {
            return vec![0.0; self.ma_lags.len()];
        }

        self.ma_lags
            .iter()
            // Bound coefficients for stability
            .map(|&lag| (gamma[lag] / gamma[0]).clamp(-0.99, 0.99))
            .collect()
    }

    /// Fit the model to historical data
    pub fn fit(&mut self, data: &[f64]) -> Result<()> {
        if data.iter().any(|x| !x.is_finite()) {
            return Err(ForecastError::InvalidData {
                reason: "Data contains NaN or infinite values".to_string(),
            });
        }

        let required = self.min_observations();
        if data.len() < required {
            return Err(ForecastError::model_fit(format!(
                "ARIMA order needs at least {} observations, got {}",
                required,
                data.len()
            )));
        }

        let (stages, differenced) = Self::difference(data, &self.diff_lags);
        let ar_coeffs = self.estimate_ar_coefficients(&differenced)?;

        let n = differenced.len();
        let constant = differenced.iter().sum::<f64>() / n as f64;
        let start = self.ar_lags.last().copied().unwrap_or(0);
        let mut residuals = vec![0.0; n];
        for i in start..n {
            let mut prediction = constant;
            for (coeff, &lag) in ar_coeffs.iter().zip(&self.ar_lags) {
                prediction += coeff * (differenced[i - lag] - constant);
            }
            residuals[i] = differenced[i] - prediction;
        }

        self.ma_coeffs = self.estimate_ma_coefficients(&residuals[start..]);
        self.ar_coeffs = ar_coeffs;
        self.constant = constant;
        self.stages = stages;
        self.differenced_data = differenced;
        self.residuals = residuals;
        self.fitted = true;
        Ok(())
    }

    /// Forecast `steps` values beyond the fitted data
    pub fn predict(&self, steps: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(ForecastError::model_fit("model must be fitted before prediction"));
        }

        if steps == 0 {
            return Ok(Vec::new());
        }

        let n = self.differenced_data.len();
        let mut extended = self.differenced_data.clone();
        let mut extended_residuals = self.residuals.clone();

        // Generate forecasts on differenced scale
        for _ in 0..steps {
            let len = extended.len();
            let mut forecast = self.constant;

            for (coeff, &lag) in self.ar_coeffs.iter().zip(&self.ar_lags) {
                forecast += coeff * (extended[len - lag] - self.constant);
            }
            for (coeff, &lag) in self.ma_coeffs.iter().zip(&self.ma_lags) {
                forecast += coeff * extended_residuals[len - lag];
            }

            extended.push(forecast);
            extended_residuals.push(0.0); // Future residuals are 0
        }

        let forecasts = self.undifference(&extended[n..]);
        if forecasts.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::model_fit("ARIMA produced non-finite forecasts"));
        }
        Ok(forecasts)
    }

    pub fn config(&self) -> &ArimaConfig {
        &self.config
    }

    /// AR coefficients, aligned with the AR lag set
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    /// MA coefficients, aligned with the MA lag set
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coeffs
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }
}

/// Gaussian elimination with partial pivoting; `None` if singular
fn solve_linear_system(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&a, &b| {
            matrix[a][col]
                .abs()
                .partial_cmp(&matrix[b][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if matrix[pivot][col].abs() < 1e-10 {
            return None;
        }
        matrix.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    if solution.iter().all(|x| x.is_finite()) {
        Some(solution)
    } else {
        None
    }
}

/// Adapter running [`Arima`] behind the [`Forecaster`] contract
#[derive(Debug, Clone)]
pub struct ArimaForecaster {
    config: ArimaConfig,
}

impl ArimaForecaster {
    pub fn new(config: ArimaConfig) -> Self {
        Self { config }
    }
}

impl Forecaster for ArimaForecaster {
    fn method(&self) -> Method {
        Method::Arima
    }

    fn fit_window(&self) -> FitWindow {
        FitWindow::History
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let mut model = Arima::new(self.config.clone())?;
        model.fit(series)?;
        model.predict(horizon)
    }
}
