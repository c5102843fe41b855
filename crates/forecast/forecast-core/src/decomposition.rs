//! Classical time series decomposition
//!
//! Provides additive (`Y = T + S + R`) and multiplicative (`Y = T * S * R`)
//! decomposition. The trend is a centred moving average over one period
//! (a 2×m average for even periods) and is undefined for the first and last
//! `period / 2` observations. Seasonal indices average the detrended values
//! per cycle position and are normalised to sum to zero (additive) or to
//! average one (multiplicative).

use forecast_spi::{
    DecompositionModel, DecompositionResult, Decomposer, ForecastError, Result,
};

fn validate(data: &[f64], period: usize) -> Result<()> {
    if period < 2 {
        return Err(ForecastError::invalid_parameter("period", "must be at least 2"));
    }
    if data.len() < 2 * period {
        return Err(ForecastError::InsufficientData {
            required: 2 * period,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Centred moving average; `None` where the window does not fit
fn centred_moving_average(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = data.len();
    let half = period / 2;
    let even = period % 2 == 0;

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let window = &data[i - half..=i + half];
            if even {
                let inner: f64 = window[1..window.len() - 1].iter().sum();
                let ends = (window[0] + window[window.len() - 1]) / 2.0;
                Some((inner + ends) / period as f64)
            } else {
                Some(window.iter().sum::<f64>() / period as f64)
            }
        })
        .collect()
}

/// Average of the detrended values at every cycle position
fn position_averages(
    data: &[f64],
    trend: &[Option<f64>],
    period: usize,
    detrend: impl Fn(f64, f64) -> f64,
) -> Vec<f64> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, (value, t)) in data.iter().zip(trend).enumerate() {
        if let Some(t) = t {
            sums[i % period] += detrend(*value, *t);
            counts[i % period] += 1;
        }
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect()
}

/// Perform additive decomposition
pub fn decompose_additive(data: &[f64], period: usize) -> Result<DecompositionResult> {
    validate(data, period)?;

    let trend = centred_moving_average(data, period);
    let mut indices = position_averages(data, &trend, period, |d, t| d - t);
    let mean = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|s| *s -= mean);

    let seasonal: Vec<f64> = (0..data.len()).map(|i| indices[i % period]).collect();
    let residual = data
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((d, t), s)| t.map(|t| d - t - s))
        .collect();

    Ok(DecompositionResult {
        model: DecompositionModel::Additive,
        period,
        trend,
        seasonal,
        residual,
    })
}

/// Perform multiplicative decomposition; the data must be strictly positive
pub fn decompose_multiplicative(data: &[f64], period: usize) -> Result<DecompositionResult> {
    validate(data, period)?;
    if data.iter().any(|&x| x <= 0.0) {
        return Err(ForecastError::model_fit(
            "multiplicative decomposition requires strictly positive data",
        ));
    }

    let trend = centred_moving_average(data, period);
    let mut indices = position_averages(data, &trend, period, |d, t| d / t);
    let mean = indices.iter().sum::<f64>() / period as f64;
    indices.iter_mut().for_each(|s| *s /= mean);

    let seasonal: Vec<f64> = (0..data.len()).map(|i| indices[i % period]).collect();
    let residual = data
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((d, t), s)| t.map(|t| d / (t * s)))
        .collect();

    Ok(DecompositionResult {
        model: DecompositionModel::Multiplicative,
        period,
        trend,
        seasonal,
        residual,
    })
}

/// Decompose with the requested model
pub fn decompose(
    data: &[f64],
    period: usize,
    model: DecompositionModel,
) -> Result<DecompositionResult> {
    match model {
        DecompositionModel::Additive => decompose_additive(data, period),
        DecompositionModel::Multiplicative => decompose_multiplicative(data, period),
    }
}

/// Additive decomposition: Y = T + S + R
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveDecomposer;

impl Decomposer for AdditiveDecomposer {
    fn decompose(&self, data: &[f64], period: usize) -> Result<DecompositionResult> {
        decompose_additive(data, period)
    }
}

/// Multiplicative decomposition: Y = T * S * R
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeDecomposer;

impl Decomposer for MultiplicativeDecomposer {
    fn decompose(&self, data: &[f64], period: usize) -> Result<DecompositionResult> {
        decompose_multiplicative(data, period)
    }
}
