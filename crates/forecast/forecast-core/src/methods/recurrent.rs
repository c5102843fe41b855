//! Stacked LSTM regressor over lag windows
//!
//! Each lag window is fed oldest-first as a one-feature sequence. Every
//! layer but the last passes its full hidden sequence upward; the last
//! layer's final hidden state goes through a dense unit to a single value.
//! Dropout acts on that dense output while training only.
//!
//! Training minimises mean squared error with Adam on standardised data,
//! back-propagating through time over the whole window. Initialisation and
//! batch shuffling draw from a seeded [`StdRng`], so runs are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::trace;

use forecast_spi::{FitWindow, ForecastError, Forecaster, Method, RecurrentConfig, Result};

use super::lag_frame::{LagFrame, Rows, Standardizer};

const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPSILON: f64 = 1e-7;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Trainable tensor with its gradient and Adam moments
#[derive(Debug, Clone)]
struct Param {
    value: Vec<f64>,
    grad: Vec<f64>,
    m: Vec<f64>,
    v: Vec<f64>,
}

impl Param {
    fn new(value: Vec<f64>) -> Self {
        let len = value.len();
        Self {
            value,
            grad: vec![0.0; len],
            m: vec![0.0; len],
            v: vec![0.0; len],
        }
    }

    /// Glorot uniform initialisation
    fn glorot(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Self {
        let limit = (6.0 / (fan_in + fan_out) as f64).sqrt();
        let value = (0..fan_in * fan_out)
            .map(|_| rng.gen_range(-limit..limit))
            .collect();
        Self::new(value)
    }

    fn zero_grad(&mut self) {
        self.grad.iter_mut().for_each(|g| *g = 0.0);
    }

    fn adam_step(&mut self, learning_rate: f64, step: i32) {
        let bias1 = 1.0 - ADAM_BETA1.powi(step);
        let bias2 = 1.0 - ADAM_BETA2.powi(step);
        for k in 0..self.value.len() {
            let g = self.grad[k];
            self.m[k] = ADAM_BETA1 * self.m[k] + (1.0 - ADAM_BETA1) * g;
            self.v[k] = ADAM_BETA2 * self.v[k] + (1.0 - ADAM_BETA2) * g * g;
            let m_hat = self.m[k] / bias1;
            let v_hat = self.v[k] / bias2;
            self.value[k] -= learning_rate * m_hat / (v_hat.sqrt() + ADAM_EPSILON);
        }
    }
}

/// Activations kept from one forward time step
#[derive(Debug, Clone)]
struct StepCache {
    x: Vec<f64>,
    h_prev: Vec<f64>,
    c_prev: Vec<f64>,
    i: Vec<f64>,
    f: Vec<f64>,
    g: Vec<f64>,
    o: Vec<f64>,
    tanh_c: Vec<f64>,
}

/// One LSTM layer; gate blocks are ordered input, forget, cell, output
#[derive(Debug, Clone)]
struct LstmLayer {
    input_size: usize,
    hidden: usize,
    /// `4H x I`, row-major
    w: Param,
    /// `4H x H`, row-major
    u: Param,
    b: Param,
}

impl LstmLayer {
    fn new(rng: &mut StdRng, input_size: usize, hidden: usize) -> Self {
        let mut bias = vec![0.0; 4 * hidden];
        // Forget gate starts open
        bias[hidden..2 * hidden].iter_mut().for_each(|b| *b = 1.0);

        Self {
            input_size,
            hidden,
            w: Param::glorot(rng, input_size, 4 * hidden),
            u: Param::glorot(rng, hidden, 4 * hidden),
            b: Param::new(bias),
        }
    }

    fn params_mut(&mut self) -> [&mut Param; 3] {
        [&mut self.w, &mut self.u, &mut self.b]
    }

    fn forward(&self, inputs: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<StepCache>) {
        let hidden = self.hidden;
        let width = self.input_size;
        let mut h = vec![0.0; hidden];
        let mut c = vec![0.0; hidden];
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut caches = Vec::with_capacity(inputs.len());

        for x in inputs {
            let z: Vec<f64> = (0..4 * hidden)
                .map(|r| {
                    self.b.value[r]
                        + dot(&self.w.value[r * width..(r + 1) * width], x)
                        + dot(&self.u.value[r * hidden..(r + 1) * hidden], &h)
                })
                .collect();

            let i: Vec<f64> = z[..hidden].iter().map(|&v| sigmoid(v)).collect();
            let f: Vec<f64> = z[hidden..2 * hidden].iter().map(|&v| sigmoid(v)).collect();
            let g: Vec<f64> = z[2 * hidden..3 * hidden].iter().map(|v| v.tanh()).collect();
            let o: Vec<f64> = z[3 * hidden..].iter().map(|&v| sigmoid(v)).collect();

            let c_next: Vec<f64> = (0..hidden).map(|k| f[k] * c[k] + i[k] * g[k]).collect();
            let tanh_c: Vec<f64> = c_next.iter().map(|v| v.tanh()).collect();
            let h_next: Vec<f64> = (0..hidden).map(|k| o[k] * tanh_c[k]).collect();

            caches.push(StepCache {
                x: x.clone(),
                h_prev: std::mem::replace(&mut h, h_next),
                c_prev: std::mem::replace(&mut c, c_next),
                i,
                f,
                g,
                o,
                tanh_c,
            });
            outputs.push(h.clone());
        }

        (outputs, caches)
    }

    /// Back-propagate through time; `dh_out[t]` is the loss gradient flowing
    /// into the step-`t` output. Returns the gradient w.r.t. each input.
    fn backward(&mut self, caches: &[StepCache], dh_out: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let hidden = self.hidden;
        let width = self.input_size;
        let mut dx = vec![vec![0.0; width]; caches.len()];
        let mut dh_next = vec![0.0; hidden];
        let mut dc_next = vec![0.0; hidden];

        for t in (0..caches.len()).rev() {
            let cache = &caches[t];
            let mut dz = vec![0.0; 4 * hidden];
            for k in 0..hidden {
                let dh = dh_out[t][k] + dh_next[k];
                let d_o = dh * cache.tanh_c[k];
                let dc = dh * cache.o[k] * (1.0 - cache.tanh_c[k].powi(2)) + dc_next[k];
                let d_i = dc * cache.g[k];
                let d_g = dc * cache.i[k];
                let d_f = dc * cache.c_prev[k];
                dc_next[k] = dc * cache.f[k];

                dz[k] = d_i * cache.i[k] * (1.0 - cache.i[k]);
                dz[hidden + k] = d_f * cache.f[k] * (1.0 - cache.f[k]);
                dz[2 * hidden + k] = d_g * (1.0 - cache.g[k].powi(2));
                dz[3 * hidden + k] = d_o * cache.o[k] * (1.0 - cache.o[k]);
            }

            let mut dh_prev = vec![0.0; hidden];
            for (r, &d) in dz.iter().enumerate() {
                if d == 0.0 {
                    continue;
                }
                self.b.grad[r] += d;
                for k in 0..width {
                    self.w.grad[r * width + k] += d * cache.x[k];
                    dx[t][k] += self.w.value[r * width + k] * d;
                }
                for k in 0..hidden {
                    self.u.grad[r * hidden + k] += d * cache.h_prev[k];
                    dh_prev[k] += self.u.value[r * hidden + k] * d;
                }
            }
            dh_next = dh_prev;
        }

        dx
    }
}

/// Stacked LSTM with a dense output unit
#[derive(Debug, Clone)]
pub struct RecurrentNetwork {
    config: RecurrentConfig,
    layers: Vec<LstmLayer>,
    dense_w: Param,
    dense_b: Param,
    scaler: Option<Standardizer>,
    rng: StdRng,
    step: i32,
}

impl RecurrentNetwork {
    /// Create an untrained network, validating the configuration
    pub fn new(config: RecurrentConfig) -> Result<Self> {
        if config.lags == 0 {
            return Err(ForecastError::invalid_parameter("lags", "must be at least 1"));
        }
        if config.lstm_units == 0 {
            return Err(ForecastError::invalid_parameter("lstm_units", "must be at least 1"));
        }
        if config.lstm_layers == 0 {
            return Err(ForecastError::invalid_parameter("lstm_layers", "must be at least 1"));
        }
        if config.epochs == 0 {
            return Err(ForecastError::invalid_parameter("epochs", "must be at least 1"));
        }
        if config.batch_size == 0 {
            return Err(ForecastError::invalid_parameter("batch_size", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&config.dropout) {
            return Err(ForecastError::invalid_parameter("dropout", "must be in [0, 1)"));
        }
        if !(config.learning_rate > 0.0) || !config.learning_rate.is_finite() {
            return Err(ForecastError::invalid_parameter(
                "learning_rate",
                "must be a finite positive number",
            ));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let units = config.lstm_units;
        let layers = (0..config.lstm_layers)
            .map(|l| LstmLayer::new(&mut rng, if l == 0 { 1 } else { units }, units))
            .collect();
        let dense_w = Param::glorot(&mut rng, units, 1);
        let dense_b = Param::new(vec![0.0]);

        Ok(Self {
            config,
            layers,
            dense_w,
            dense_b,
            scaler: None,
            rng,
            step: 0,
        })
    }

    /// Oldest-first scaled sequence for one lag window
    fn sequence(scaler: &Standardizer, features: &[f64]) -> Vec<Vec<f64>> {
        features
            .iter()
            .rev()
            .map(|&v| vec![scaler.transform(v)])
            .collect()
    }

    fn forward(&self, sequence: &[Vec<f64>]) -> (f64, Vec<f64>, Vec<Vec<StepCache>>) {
        let mut inputs = sequence.to_vec();
        let mut caches = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let (outputs, cache) = layer.forward(&inputs);
            caches.push(cache);
            inputs = outputs;
        }

        let last = inputs
            .pop()
            .unwrap_or_else(|| vec![0.0; self.config.lstm_units]);
        let output = dot(&self.dense_w.value, &last) + self.dense_b.value[0];
        (output, last, caches)
    }

    fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params: Vec<&mut Param> = Vec::new();
        for layer in &mut self.layers {
            params.extend(layer.params_mut());
        }
        params.push(&mut self.dense_w);
        params.push(&mut self.dense_b);
        params
    }

    /// One Adam step over a mini-batch; returns the summed squared error
    fn train_batch(&mut self, sequences: &[Vec<Vec<f64>>], labels: &[f64], batch: &[usize]) -> f64 {
        for param in self.params_mut() {
            param.zero_grad();
        }

        let dropout = self.config.dropout;
        let keep_scale = 1.0 / (1.0 - dropout);
        let mut loss = 0.0;

        for &idx in batch {
            let (output, last, caches) = self.forward(&sequences[idx]);
            let mask = if dropout > 0.0 && self.rng.gen::<f64>() < dropout {
                0.0
            } else if dropout > 0.0 {
                keep_scale
            } else {
                1.0
            };

            let error = output * mask - labels[idx];
            loss += error * error;

            let d_output = 2.0 * error / batch.len() as f64 * mask;
            for (grad, h) in self.dense_w.grad.iter_mut().zip(&last) {
                *grad += d_output * h;
            }
            self.dense_b.grad[0] += d_output;

            let steps = sequences[idx].len();
            let mut dh = vec![vec![0.0; self.config.lstm_units]; steps];
            dh[steps - 1] = self.dense_w.value.iter().map(|w| w * d_output).collect();
            for (layer, cache) in self.layers.iter_mut().zip(&caches).rev() {
                dh = layer.backward(cache, &dh);
            }
        }

        self.step += 1;
        let (learning_rate, step) = (self.config.learning_rate, self.step);
        for param in self.params_mut() {
            param.adam_step(learning_rate, step);
        }

        loss
    }

    /// Train on the given rows; returns the mean loss of every epoch
    pub fn fit(&mut self, rows: Rows<'_>) -> Result<Vec<f64>> {
        if rows.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let scaler = Standardizer::fit(rows.labels);
        let sequences: Vec<Vec<Vec<f64>>> = rows
            .features
            .iter()
            .map(|features| Self::sequence(&scaler, features))
            .collect();
        let labels: Vec<f64> = rows.labels.iter().map(|&y| scaler.transform(y)).collect();
        self.scaler = Some(scaler);

        let mut order: Vec<usize> = (0..labels.len()).collect();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            order.shuffle(&mut self.rng);
            let mut total = 0.0;
            for batch in order.chunks(self.config.batch_size) {
                total += self.train_batch(&sequences, &labels, batch);
            }

            let loss = total / labels.len() as f64;
            trace!(epoch, loss, "recurrent epoch finished");
            if !loss.is_finite() {
                return Err(ForecastError::TrainingDivergence { epoch, loss });
            }
            history.push(loss);
        }

        Ok(history)
    }

    /// Predict one value per lag window
    pub fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let scaler = self
            .scaler
            .ok_or_else(|| ForecastError::model_fit("model must be fitted before prediction"))?;

        Ok(features
            .iter()
            .map(|window| {
                let (output, _, _) = self.forward(&Self::sequence(&scaler, window));
                scaler.inverse_transform(output)
            })
            .collect())
    }
}

/// Adapter running [`RecurrentNetwork`] behind the [`Forecaster`] contract
#[derive(Debug, Clone)]
pub struct RecurrentForecaster {
    config: RecurrentConfig,
}

impl RecurrentForecaster {
    pub fn new(config: RecurrentConfig) -> Self {
        Self { config }
    }
}

/// Non-finite predictions are a divergence with no epoch loss to report
fn check_predictions(predictions: &[f64], epochs: usize) -> Result<()> {
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(ForecastError::TrainingDivergence {
            epoch: epochs,
            loss: f64::NAN,
        });
    }
    Ok(())
}

impl Forecaster for RecurrentForecaster {
    fn method(&self) -> Method {
        Method::Recurrent
    }

    fn fit_window(&self) -> FitWindow {
        FitWindow::Full
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Vec<f64>> {
        let mut model = RecurrentNetwork::new(self.config.clone())?;
        let frame = LagFrame::build(series, self.config.lags, horizon)?;
        let (train, test) = frame.split(horizon);

        model.fit(train)?;
        let predictions = model.predict(test.features)?;
        check_predictions(&predictions, self.config.epochs)?;
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_predictions_report_nan_loss() {
        assert!(check_predictions(&[1.0, 2.0], 10).is_ok());
        match check_predictions(&[1.0, f64::INFINITY], 10) {
            Err(ForecastError::TrainingDivergence { epoch, loss }) => {
                assert_eq!(epoch, 10);
                assert!(loss.is_nan());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 20.0 + 5.0 * (i as f64 * std::f64::consts::PI / 6.0).sin())
            .collect()
    }

    fn small_config() -> RecurrentConfig {
        RecurrentConfig {
            lstm_units: 10,
            ..RecurrentConfig::default()
        }
    }

    #[test]
    fn test_forecast_shape() {
        let forecast = RecurrentForecaster::new(small_config())
            .forecast(&wave(36), 12)
            .unwrap();
        assert_eq!(forecast.len(), 12);
        assert!(forecast.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let data = wave(40);
        let forecaster = RecurrentForecaster::new(small_config());
        assert_eq!(
            forecaster.forecast(&data, 12).unwrap(),
            forecaster.forecast(&data, 12).unwrap()
        );
    }

    #[test]
    fn test_stacked_layers() {
        let config = RecurrentConfig {
            lstm_units: 6,
            lstm_layers: 3,
            epochs: 3,
            ..RecurrentConfig::default()
        };
        let forecast = RecurrentForecaster::new(config).forecast(&wave(36), 12).unwrap();
        assert_eq!(forecast.len(), 12);
    }

    #[test]
    fn test_training_reduces_loss() {
        let data = wave(60);
        let frame = LagFrame::build(&data, 5, 12).unwrap();
        let (train, _) = frame.split(12);
        let mut model = RecurrentNetwork::new(RecurrentConfig {
            lstm_units: 8,
            dropout: 0.0,
            epochs: 60,
            batch_size: 8,
            learning_rate: 0.01,
            ..RecurrentConfig::default()
        })
        .unwrap();

        let history = model.fit(train).unwrap();
        assert_eq!(history.len(), 60);
        assert!(history[59] < history[0], "{:?}", history);
    }

    #[test]
    fn test_divergence_is_detected() {
        let config = RecurrentConfig {
            lstm_units: 8,
            epochs: 3,
            batch_size: 4,
            learning_rate: 1e300,
            dropout: 0.0,
            ..RecurrentConfig::default()
        };
        let err = RecurrentForecaster::new(config).forecast(&wave(40), 12).unwrap_err();
        assert_eq!(err.kind(), "training_divergence");
    }

    #[test]
    fn test_insufficient_data() {
        let err = RecurrentForecaster::new(small_config())
            .forecast(&wave(10), 12)
            .unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientData {
                required: 18,
                actual: 10
            }
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let invalid = [
            RecurrentConfig {
                lstm_units: 0,
                ..RecurrentConfig::default()
            },
            RecurrentConfig {
                lstm_layers: 0,
                ..RecurrentConfig::default()
            },
            RecurrentConfig {
                dropout: 1.0,
                ..RecurrentConfig::default()
            },
            RecurrentConfig {
                batch_size: 0,
                ..RecurrentConfig::default()
            },
            RecurrentConfig {
                learning_rate: -0.1,
                ..RecurrentConfig::default()
            },
        ];
        for config in invalid {
            assert!(RecurrentNetwork::new(config).is_err());
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let model = RecurrentNetwork::new(small_config()).unwrap();
        assert!(model.predict(&[vec![1.0; 5]]).is_err());
    }
}
