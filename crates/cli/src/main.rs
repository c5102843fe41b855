//! # forecast-cli
//!
//! Command-line front end for the forecast pipeline.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forecast_facade::prelude::*;
use forecast_facade::{DecompositionResult, Metric};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forecast")]
#[command(about = "Concurrent multi-method time series forecasting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast a series with every configured method and score the results
    Run {
        /// JSON file holding the series (array of numbers)
        #[arg(short, long)]
        series: PathBuf,

        /// TOML pipeline configuration (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the run as JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Also print the seasonal decomposition of the series
        #[arg(long)]
        decompose: bool,

        /// Write the JSON run to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default pipeline configuration as TOML
    Defaults,
}

/// Load a numeric series from a JSON file.
///
/// Accepts a bare array of numbers or an object with a `data`, `values`,
/// `series` or `y` array.
fn load_series(path: &Path) -> Result<TimeSeries> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse JSON in {}", path.display()))?;

    let array = match &json {
        serde_json::Value::Array(arr) => Some(arr),
        serde_json::Value::Object(obj) => ["data", "values", "series", "y"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(|v| v.as_array())),
        _ => None,
    };
    let Some(array) = array else {
        bail!("{} does not contain a numeric array", path.display());
    };

    let values = array
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64()
                .with_context(|| format!("element {} is not a number", i))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.is_empty() {
        bail!("{} contains an empty series", path.display());
    }

    Ok(TimeSeries::new(values)?)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("invalid pipeline configuration {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn print_forecasts(run: &PipelineRun) {
    println!("Forecast ({} steps):", run.horizon);
    let header: Vec<String> = (1..=run.horizon).map(|h| format!("{:>10}", h)).collect();
    println!("  {:<8}{}", "method", header.join(""));

    print!("  {:<8}", "holdout");
    for value in &run.holdout {
        print!("{:>10.3}", value);
    }
    println!();

    for (method, outcome) in &run.outcomes {
        match outcome {
            MethodOutcome::Succeeded { forecast, .. } => {
                print!("  {:<8}", method.label());
                for value in forecast.values() {
                    print!("{:>10.3}", value);
                }
                println!();
            }
            MethodOutcome::Failed { error, .. } => {
                println!("  {:<8}failed: {}", method.label(), error);
            }
        }
    }
}

fn print_metrics(run: &PipelineRun) {
    println!("\nMetrics:");
    println!(
        "  {:<8}{:>12}{:>12}{:>12}{:>10}",
        "method", "RMSE", "MAE", "SMAPE %", "time"
    );
    for (method, outcome) in &run.outcomes {
        match outcome.metrics() {
            Some(metrics) => println!(
                "  {:<8}{:>12.4}{:>12.4}{:>12.2}{:>8}ms",
                method.label(),
                metrics.rmse,
                metrics.mae,
                metrics.smape,
                outcome.elapsed().as_millis()
            ),
            None => println!(
                "  {:<8}{}",
                method.label(),
                outcome.failure_reason().unwrap_or_default()
            ),
        }
    }

    if let Some((method, smape)) = run.best_by(Metric::Smape) {
        println!("\nBest by SMAPE: {} ({:.2}%)", method, smape);
    }
}

fn print_decomposition(result: &DecompositionResult) {
    println!(
        "\nDecomposition ({:?}, period {}):",
        result.model, result.period
    );
    println!(
        "  {:>6}{:>12}{:>12}{:>12}",
        "t", "trend", "seasonal", "residual"
    );
    let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));
    for t in 0..result.seasonal.len() {
        println!(
            "  {:>6}{:>12}{:>12.3}{:>12}",
            t,
            cell(result.trend[t]),
            result.seasonal[t],
            cell(result.residual[t])
        );
    }
}

/// Run command
fn run_pipeline(
    series_path: &Path,
    config_path: Option<&Path>,
    json: bool,
    decompose: bool,
    output: Option<&Path>,
) -> Result<()> {
    let series = load_series(series_path)?;
    let pipeline = load_config(config_path)?.into_pipeline()?;
    info!(
        observations = series.len(),
        methods = pipeline.configs().len(),
        "loaded series"
    );

    let run = pipeline.run(&series)?;
    let decomposition = if decompose {
        Some(pipeline.decompose(&series)?)
    } else {
        None
    };

    if let Some(path) = output {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &run)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "run written");
    }

    if json {
        let value = serde_json::json!({
            "run": run,
            "decomposition": decomposition,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_forecasts(&run);
    print_metrics(&run);
    if let Some(result) = &decomposition {
        print_decomposition(result);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            series,
            config,
            json,
            decompose,
            output,
        } => run_pipeline(
            &series,
            config.as_deref(),
            json,
            decompose,
            output.as_deref(),
        ),
        Commands::Defaults => {
            print!("{}", PipelineConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
