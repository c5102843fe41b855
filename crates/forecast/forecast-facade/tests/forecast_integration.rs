//! Integration tests for the forecast pipeline

use std::sync::{mpsc, Arc};
use std::time::Duration;

use forecast_facade::{
    ArimaConfig, BoostingConfig, ChannelSink, ForecastCache, ForecastConfig, ForecastError,
    Forecaster, Method, MethodConfigs, MethodOutcome, Orchestrator, Progress, RecurrentConfig,
    Result, TimeSeries,
};

fn sample_series(n: usize) -> TimeSeries {
    let values = (0..n)
        .map(|i| {
            100.0 + i as f64 * 2.0 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 12.0).sin()
        })
        .collect();
    TimeSeries::new(values).unwrap()
}

/// Fast settings for the recurrent adapter
fn light_configs() -> MethodConfigs {
    MethodConfigs::default().with(RecurrentConfig {
        lstm_units: 10,
        ..RecurrentConfig::default()
    })
}

fn error_kind(outcome: Option<&MethodOutcome>) -> Option<&'static str> {
    outcome.and_then(MethodOutcome::error).map(ForecastError::kind)
}

#[test]
fn test_invalid_config_fails_only_its_method() {
    let configs = light_configs().with(ArimaConfig {
        p: 11,
        ..ArimaConfig::default()
    });
    let run = Orchestrator::new().run(&sample_series(36), &configs).unwrap();

    assert_eq!(run.len(), 4);
    assert_eq!(run.success_count(), 3);
    assert_eq!(error_kind(run.outcome(Method::Arima)), Some("model_fit"));

    let reason = run
        .outcome(Method::Arima)
        .and_then(MethodOutcome::failure_reason)
        .unwrap();
    assert!(reason.contains("AR order must be <= 10"), "{}", reason);
}

#[test]
fn test_lag_methods_need_more_than_lags_plus_horizon() {
    let run = Orchestrator::new()
        .run(&sample_series(17), &light_configs())
        .unwrap();

    assert_eq!(run.len(), 4);
    for method in [Method::GradientBoosting, Method::Recurrent] {
        assert_eq!(
            run.outcome(method).and_then(MethodOutcome::error),
            Some(&ForecastError::InsufficientData {
                required: 18,
                actual: 17
            })
        );
    }
}

#[test]
fn test_every_success_is_scored_on_the_holdout() {
    let series = sample_series(48);
    let run = Orchestrator::new().run(&series, &light_configs()).unwrap();

    assert_eq!(run.holdout, series.values()[36..].to_vec());
    for (method, forecast, metrics) in run.successes() {
        assert_eq!(forecast.len(), 12, "{}", method);
        let expected = forecast_facade::evaluate(&run.holdout, forecast.values()).unwrap();
        assert_eq!(*metrics, expected, "{}", method);
    }
}

#[test]
fn test_progress_reports_every_method() {
    let (tx, rx) = mpsc::channel();
    let run = Orchestrator::new()
        .with_workers(2)
        .with_progress(ChannelSink::new(tx))
        .run(&sample_series(36), &light_configs())
        .unwrap();

    let reports: Vec<Progress> = rx.try_iter().collect();
    assert_eq!(reports.len(), run.len());
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.completed, i + 1);
        assert_eq!(report.total, 4);
    }
    assert_eq!(reports.last().map(Progress::fraction), Some(1.0));
}

#[test]
fn test_single_worker_runs_everything() {
    let run = Orchestrator::new()
        .with_workers(1)
        .run(&sample_series(36), &light_configs())
        .unwrap();
    assert_eq!(run.len(), 4);
}

#[test]
fn test_cache_round_trip_and_invalidation() {
    let cache = Arc::new(ForecastCache::new());
    let orchestrator = Orchestrator::new().with_cache(Arc::clone(&cache));
    let configs = MethodConfigs::empty()
        .with(ForecastConfig::default_for(Method::ExponentialSmoothing))
        .with(BoostingConfig {
            n_estimators: 20,
            ..BoostingConfig::default()
        });
    let series = sample_series(36);

    let first = orchestrator.run(&series, &configs).unwrap();
    assert_eq!(cache.len(), 2);
    let second = orchestrator.run(&series, &configs).unwrap();
    assert_eq!(first.outcomes.len(), second.outcomes.len());
    for method in [Method::ExponentialSmoothing, Method::GradientBoosting] {
        assert_eq!(first.forecast(method), second.forecast(method));
        assert_eq!(first.metrics(method), second.metrics(method));
    }
    assert_eq!(cache.stats().hits, 2);

    assert_eq!(cache.invalidate_series(&series), 2);
    orchestrator.run(&series, &configs).unwrap();
    assert_eq!(cache.stats().hits, 2);
}

/// Blocks long enough to trip any reasonable deadline
struct Stalled;

impl Forecaster for Stalled {
    fn method(&self) -> Method {
        Method::Arima
    }

    fn forecast(&self, _series: &[f64], horizon: usize) -> Result<Vec<f64>> {
        std::thread::sleep(Duration::from_millis(1200));
        Ok(vec![0.0; horizon])
    }
}

#[test]
fn test_timeout_is_reported_per_method() {
    let series = sample_series(36);
    let run = Orchestrator::new()
        .with_task_timeout(Duration::from_millis(100))
        .run_forecasters(
            &series,
            vec![
                Box::new(Stalled),
                forecast_facade::forecaster_for(&ForecastConfig::default_for(
                    Method::ExponentialSmoothing,
                )),
            ],
        )
        .unwrap();

    assert_eq!(error_kind(run.outcome(Method::Arima)), Some("timeout"));
    assert!(run.outcome(Method::ExponentialSmoothing).unwrap().is_success());
}

#[test]
fn test_exact_ramp_and_flat_series_succeed_for_arima() {
    let ramp: Vec<f64> = (0..36).map(|i| 20.0 + 1.5 * i as f64).collect();
    for values in [ramp, vec![7.0; 36]] {
        let series = TimeSeries::new(values).unwrap();
        let run = Orchestrator::new().run(&series, &light_configs()).unwrap();

        let metrics = run.metrics(Method::Arima).unwrap();
        assert!(metrics.mae < 1e-9, "mae {}", metrics.mae);
    }
}
