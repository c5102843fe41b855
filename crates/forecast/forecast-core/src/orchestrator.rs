//! Pipeline orchestrator - runs every configured forecasting method concurrently.
//!
//! Each adapter becomes one task on a bounded rayon pool. Tasks report back
//! over a channel to the calling thread, which is the only writer of the
//! resulting [`PipelineRun`]. Failures, panics and timeouts are recorded per
//! method and never abort the siblings.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use forecast_spi::{
    FitWindow, ForecastConfig, ForecastError, ForecastResult, Forecaster, Method, MethodConfigs,
    MethodOutcome, PipelineRun, Progress, ProgressSink, Result, TimeSeries, HORIZON,
};

use crate::cache::ForecastCache;
use crate::methods::forecaster_for;
use crate::metrics::evaluate;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 4;

/// One adapter scheduled for a run
struct Task {
    method: Method,
    /// Present for configured adapters; keys the cache
    config: Option<ForecastConfig>,
    forecaster: Box<dyn Forecaster>,
}

/// Messages sent from worker tasks to the collector
enum TaskEvent {
    Started {
        method: Method,
        at: Instant,
    },
    Finished {
        method: Method,
        result: Result<Vec<f64>>,
        elapsed: Duration,
    },
}

/// Runs forecasting methods concurrently and scores them on a holdout tail.
///
/// # Example
///
/// ```rust,ignore
/// use forecast_core::Orchestrator;
///
/// let run = Orchestrator::new()
///     .with_workers(4)
///     .with_task_timeout(Duration::from_secs(30))
///     .run(&series, &MethodConfigs::default())?;
///
/// for (method, forecast, metrics) in run.successes() {
///     println!("{}: SMAPE {:.2}", method, metrics.smape);
/// }
/// ```
#[derive(Clone)]
pub struct Orchestrator {
    horizon: usize,
    workers: usize,
    task_timeout: Option<Duration>,
    cache: Option<Arc<ForecastCache>>,
    progress: Option<Arc<dyn ProgressSink>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("horizon", &self.horizon)
            .field("workers", &self.workers)
            .field("task_timeout", &self.task_timeout)
            .field("cache", &self.cache.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            horizon: HORIZON,
            workers: DEFAULT_WORKERS,
            task_timeout: None,
            cache: None,
            progress: None,
        }
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    /// Bound the worker pool; zero is treated as one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Deadline per adapter, measured from when its task starts running.
    ///
    /// A timed-out adapter cannot be cancelled and keeps its worker until it
    /// returns. With fewer workers than methods, queued adapters wait for a
    /// free worker before their own deadline starts, so the run as a whole
    /// is not bounded by this timeout.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_cache(mut self, cache: Arc<ForecastCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress<S: ProgressSink + 'static>(mut self, sink: S) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout
    }

    pub fn cache(&self) -> Option<&Arc<ForecastCache>> {
        self.cache.as_ref()
    }

    /// Run every configured method against `series`.
    ///
    /// Returns an outcome for every configured method. Fails only when the
    /// horizon is zero or a forecast cannot be scored against the holdout
    /// because its length is wrong.
    pub fn run(&self, series: &TimeSeries, configs: &MethodConfigs) -> Result<PipelineRun> {
        let tasks = configs
            .iter()
            .map(|config| Task {
                method: config.method(),
                config: Some(config.clone()),
                forecaster: forecaster_for(config),
            })
            .collect();
        self.execute(series, tasks)
    }

    /// Run caller-supplied adapters; a later adapter for the same method
    /// replaces an earlier one. Results are never cached.
    pub fn run_forecasters(
        &self,
        series: &TimeSeries,
        forecasters: Vec<Box<dyn Forecaster>>,
    ) -> Result<PipelineRun> {
        let tasks = forecasters
            .into_iter()
            .map(|forecaster| Task {
                method: forecaster.method(),
                config: None,
                forecaster,
            })
            .collect();
        self.execute(series, tasks)
    }

    fn execute(&self, series: &TimeSeries, tasks: Vec<Task>) -> Result<PipelineRun> {
        if self.horizon == 0 {
            return Err(ForecastError::invalid_parameter("horizon", "must be at least 1"));
        }

        let tasks: BTreeMap<Method, Task> = tasks.into_iter().map(|t| (t.method, t)).collect();
        let total = tasks.len();
        let (history_len, holdout) = match series.split_holdout(self.horizon) {
            Some((history, tail)) => (history.len(), tail.to_vec()),
            None => (0, Vec::new()),
        };

        info!(
            methods = total,
            observations = series.len(),
            horizon = self.horizon,
            "starting forecast run"
        );

        let mut collector = Collector {
            orchestrator: self,
            series,
            run: PipelineRun::new(self.horizon, holdout),
            configs: HashMap::new(),
            total,
            completed: 0,
        };

        // Serve cache hits without dispatching
        let mut dispatch = Vec::with_capacity(total);
        for (method, task) in tasks {
            let cached = match (&self.cache, &task.config) {
                (Some(cache), Some(config)) => cache.get(series, self.horizon, config),
                _ => None,
            };
            if let Some(config) = &task.config {
                collector.configs.insert(method, config.clone());
            }
            match cached {
                Some(values) => {
                    debug!(%method, "forecast served from cache");
                    collector.record(method, Ok(values), Duration::ZERO, false)?;
                }
                None => dispatch.push(task),
            }
        }

        if dispatch.is_empty() {
            return Ok(collector.finish());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("forecast-worker-{}", i))
            .build()
            .map_err(|e| ForecastError::WorkerPool {
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel();
        let data = series.shared();
        let mut pending = BTreeSet::new();

        for task in dispatch {
            let Task {
                method, forecaster, ..
            } = task;
            let len = match forecaster.fit_window() {
                FitWindow::History => history_len,
                FitWindow::Full => data.len(),
            };
            let data = Arc::clone(&data);
            let tx = tx.clone();
            let horizon = self.horizon;
            pending.insert(method);

            debug!(%method, observations = len, "dispatching adapter");
            pool.spawn(move || {
                let started = Instant::now();
                // Collector may have returned early; sends are best effort
                let _ = tx.send(TaskEvent::Started {
                    method,
                    at: started,
                });
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    forecaster.forecast(&data[..len], horizon)
                }))
                .unwrap_or_else(|payload| {
                    Err(ForecastError::AdapterPanic {
                        message: panic_message(payload.as_ref()),
                    })
                });
                let _ = tx.send(TaskEvent::Finished {
                    method,
                    result,
                    elapsed: started.elapsed(),
                });
            });
        }
        drop(tx);

        let mut started: HashMap<Method, Instant> = HashMap::new();
        while !pending.is_empty() {
            let event = match self.next_wait(&started, &pending) {
                Some(wait) => rx.recv_timeout(wait),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match event {
                Ok(TaskEvent::Started { method, at }) => {
                    started.insert(method, at);
                }
                Ok(TaskEvent::Finished {
                    method,
                    result,
                    elapsed,
                }) => {
                    if pending.remove(&method) {
                        collector.record(method, result, elapsed, true)?;
                    } else {
                        debug!(%method, "discarding result that arrived after its deadline");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.expire_overdue(&started, &mut pending, &mut collector)?;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // Workers gone without reporting
        for method in std::mem::take(&mut pending) {
            collector.record(
                method,
                Err(ForecastError::AdapterPanic {
                    message: "worker exited without reporting a result".to_string(),
                }),
                Duration::ZERO,
                false,
            )?;
        }

        Ok(collector.finish())
    }

    /// Time until the earliest running task hits its deadline
    fn next_wait(
        &self,
        started: &HashMap<Method, Instant>,
        pending: &BTreeSet<Method>,
    ) -> Option<Duration> {
        let limit = self.task_timeout?;
        let now = Instant::now();
        pending
            .iter()
            .filter_map(|m| started.get(m))
            .map(|at| (*at + limit).saturating_duration_since(now))
            .min()
    }

    fn expire_overdue(
        &self,
        started: &HashMap<Method, Instant>,
        pending: &mut BTreeSet<Method>,
        collector: &mut Collector<'_>,
    ) -> Result<()> {
        let Some(limit) = self.task_timeout else {
            return Ok(());
        };
        let now = Instant::now();
        let overdue: Vec<(Method, Duration)> = pending
            .iter()
            .filter_map(|m| started.get(m).map(|at| (*m, now.duration_since(*at))))
            .filter(|(_, running)| *running >= limit)
            .collect();

        for (method, running) in overdue {
            pending.remove(&method);
            collector.record(
                method,
                Err(ForecastError::Timeout {
                    limit_ms: timeout_millis(limit),
                }),
                running,
                false,
            )?;
        }
        Ok(())
    }
}

/// Whole milliseconds covering `timeout`, rounded up and at least one
pub fn timeout_millis(timeout: Duration) -> u64 {
    let millis = timeout.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

/// Single writer of the run being assembled
struct Collector<'a> {
    orchestrator: &'a Orchestrator,
    series: &'a TimeSeries,
    run: PipelineRun,
    configs: HashMap<Method, ForecastConfig>,
    total: usize,
    completed: usize,
}

impl Collector<'_> {
    /// Score and store one adapter result
    fn record(
        &mut self,
        method: Method,
        result: Result<Vec<f64>>,
        elapsed: Duration,
        cacheable: bool,
    ) -> Result<()> {
        let outcome = match result.and_then(|values| self.score(values)) {
            Ok((values, metrics)) => {
                if cacheable {
                    if let (Some(cache), Some(config)) =
                        (&self.orchestrator.cache, self.configs.get(&method))
                    {
                        cache.insert(self.series, self.run.horizon, config, values.clone());
                    }
                }
                debug!(%method, smape = metrics.smape, ?elapsed, "adapter succeeded");
                MethodOutcome::Succeeded {
                    forecast: ForecastResult::new(values),
                    metrics,
                    elapsed,
                }
            }
            Err(error @ ForecastError::DimensionMismatch { .. }) => {
                warn!(%method, %error, "forecast length does not match the holdout");
                return Err(error);
            }
            Err(error) => {
                warn!(%method, kind = error.kind(), %error, "adapter failed");
                MethodOutcome::Failed { error, elapsed }
            }
        };

        let succeeded = outcome.is_success();
        self.run.outcomes.insert(method, outcome);
        self.completed += 1;
        if let Some(sink) = &self.orchestrator.progress {
            sink.report(Progress {
                completed: self.completed,
                total: self.total,
                method,
                succeeded,
            });
        }
        Ok(())
    }

    fn score(&self, values: Vec<f64>) -> Result<(Vec<f64>, forecast_spi::MetricSet)> {
        if self.run.holdout.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: self.run.horizon + 1,
                actual: self.series.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::model_fit("forecast contains non-finite values"));
        }
        let metrics = evaluate(&self.run.holdout, &values)?;
        Ok((values, metrics))
    }

    fn finish(self) -> PipelineRun {
        info!(
            succeeded = self.run.success_count(),
            failed = self.run.len() - self.run.success_count(),
            "forecast run finished"
        );
        self.run
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
