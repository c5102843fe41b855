//! End-to-end tests for the forecast pipeline
//!
//! Full runs from raw values through configuration, orchestration, scoring
//! and serialisation of the hand-off structure.

use forecast_facade::prelude::*;
use forecast_facade::{DecompositionModel, Metric, RecurrentConfig};

fn seasonal_trend(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            100.0 + i as f64 * 2.0 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
        })
        .collect()
}

fn default_pipeline() -> ForecastPipeline {
    PipelineConfig::builder()
        .lstm(RecurrentConfig {
            lstm_units: 10,
            ..RecurrentConfig::default()
        })
        .build()
        .unwrap()
}

// ============================================================================
// Full Runs
// ============================================================================

#[test]
fn test_e2e_three_seasons_all_methods_succeed() {
    let series = TimeSeries::new(seasonal_trend(36)).unwrap();
    let run = default_pipeline().run(&series).unwrap();

    assert_eq!(run.len(), 4);
    assert_eq!(run.success_count(), 4, "failures: {:?}", run.failures().collect::<Vec<_>>());
    assert_eq!(run.holdout.len(), 12);

    for (method, forecast, metrics) in run.successes() {
        assert_eq!(forecast.len(), 12, "{}", method);
        assert!(forecast.values().iter().all(|v| v.is_finite()), "{}", method);
        for (metric, value) in metrics.iter() {
            assert!(value.is_finite() && value >= 0.0, "{} {:?}", method, metric);
        }
    }

    for method in [Method::ExponentialSmoothing, Method::Arima] {
        let smape = run.metrics(method).unwrap().smape;
        assert!(smape < 50.0, "{} smape {}", method, smape);
    }

    let table = run.metrics_table();
    let order: Vec<Method> = table.iter().map(|(m, _)| *m).collect();
    assert_eq!(order, Method::ALL.to_vec());
    assert!(run.best_by(Metric::Smape).is_some());
}

#[test]
fn test_e2e_short_series_reports_every_method() {
    let series = TimeSeries::new(seasonal_trend(10)).unwrap();
    let run = default_pipeline().run(&series).unwrap();

    assert_eq!(run.len(), 4);
    assert_eq!(run.success_count(), 0);

    for method in [Method::GradientBoosting, Method::Recurrent] {
        assert!(matches!(
            run.outcome(method).and_then(MethodOutcome::error),
            Some(ForecastError::InsufficientData { .. })
        ));
    }
    for method in [Method::ExponentialSmoothing, Method::Arima] {
        assert!(matches!(
            run.outcome(method).and_then(MethodOutcome::error),
            Some(ForecastError::ModelFit { .. })
        ));
    }

    for (_, outcome) in &run.outcomes {
        assert!(!outcome.failure_reason().unwrap().is_empty());
    }
}

#[test]
fn test_e2e_zero_horizon_is_rejected() {
    let series = TimeSeries::new(seasonal_trend(36)).unwrap();
    let run = Orchestrator::new()
        .with_horizon(0)
        .run(&series, &MethodConfigs::default());
    assert!(matches!(run, Err(ForecastError::ModelFit { .. })));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_e2e_pipeline_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("forecast.toml");
    std::fs::write(
        &path,
        r#"
        horizon = 6
        workers = 2
        cache = true
        methods = ["ets", "arima", "gbt"]

        [ets]
        seasonal_periods = 6

        [gbt]
        lags = 4
        n_estimators = 30

        [decomposition]
        period = 6
        "#,
    )
    .unwrap();

    let config = PipelineConfig::from_file(&path).unwrap();
    let pipeline = config.into_pipeline().unwrap();
    assert_eq!(pipeline.orchestrator().horizon(), 6);
    assert_eq!(pipeline.configs().len(), 3);

    let values: Vec<f64> = (0..30)
        .map(|i| 50.0 + i as f64 + 5.0 * (2.0 * std::f64::consts::PI * i as f64 / 6.0).cos())
        .collect();
    let series = TimeSeries::new(values).unwrap();
    let run = pipeline.run(&series).unwrap();

    assert_eq!(run.len(), 3);
    assert!(run.outcome(Method::Recurrent).is_none());
    for (method, forecast, _) in run.successes() {
        assert_eq!(forecast.len(), 6, "{}", method);
    }
    assert!(run.outcome(Method::GradientBoosting).unwrap().is_success());

    let cache = pipeline.orchestrator().cache().unwrap();
    assert_eq!(cache.len(), run.success_count());
}

#[test]
fn test_e2e_saved_defaults_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("defaults.toml");
    PipelineConfig::default().save(&path).unwrap();
    assert_eq!(
        PipelineConfig::from_file(&path).unwrap(),
        PipelineConfig::default()
    );
}

// ============================================================================
// Decomposition
// ============================================================================

#[test]
fn test_e2e_decomposition_view() {
    let series = TimeSeries::new(seasonal_trend(48)).unwrap();
    let result = default_pipeline().decompose(&series).unwrap();

    assert_eq!(result.model, DecompositionModel::Additive);
    assert_eq!(result.period, 12);
    assert_eq!(result.trend.len(), 48);
    assert_eq!(result.seasonal.len(), 48);
    assert!(result.trend[0].is_none());
    assert!(result.trend[24].is_some());

    let cycle_sum: f64 = result.seasonal[..12].iter().sum();
    assert!(cycle_sum.abs() < 1e-9);
}

#[test]
fn test_e2e_decomposition_needs_two_cycles() {
    let series = TimeSeries::new(seasonal_trend(20)).unwrap();
    assert!(matches!(
        default_pipeline().decompose(&series),
        Err(ForecastError::InsufficientData {
            required: 24,
            actual: 20
        })
    ));
}

// ============================================================================
// Serialisation
// ============================================================================

#[test]
fn test_e2e_run_serialises_to_json() {
    let series = TimeSeries::new(seasonal_trend(30)).unwrap();
    let pipeline = PipelineConfig::builder()
        .methods([Method::ExponentialSmoothing, Method::GradientBoosting])
        .build()
        .unwrap();
    let run = pipeline.run(&series).unwrap();

    let json = serde_json::to_value(&run).unwrap();
    assert_eq!(json["horizon"], 12);
    assert_eq!(json["holdout"].as_array().unwrap().len(), 12);
    let outcomes = json["outcomes"].as_object().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.contains_key("exponential_smoothing"));
    assert!(outcomes.contains_key("gradient_boosting"));
}
