//! Command-line interface: clean, train, predict, info

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ForecastConfig;
use crate::export::{ModelRegistry, SerializationFormat};
use crate::inference::{ForecastEngine, ModelForecast};
use crate::preprocessing::{summarize, DataCleaner};
use crate::training::{ForecastTrainer, TargetOutcome};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn kv(key: &str, val: impl std::fmt::Display) {
    println!("  {:<14} {}", muted(key), val.to_string().white());
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.3}", x)).unwrap_or_else(|| "-".to_string())
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "kolosal-forecast")]
#[command(author = "KolosalAI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-horizon weather forecasting with gradient boosted trees")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a raw hourly export (numeric coercion, gap filling)
    Clean {
        /// Raw CSV export
        #[arg(short, long)]
        input: PathBuf,

        /// Cleaned CSV output
        #[arg(short, long, default_value = "data/processed/cleaned_weather.csv")]
        output: PathBuf,

        /// Metadata lines before the header row
        #[arg(long, default_value = "3")]
        skip_rows: usize,
    },

    /// Train one model per target and horizon
    Train {
        /// Cleaned data file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Target variable (repeatable); defaults to the configured set
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// Forecast horizons per target
        #[arg(long)]
        forecast_hours: Option<usize>,

        /// Fraction of trainable rows used for training
        #[arg(long)]
        split_ratio: Option<f64>,

        /// Artifact format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Forecast every loaded model from the latest observation
    Predict {
        /// Cleaned data file (CSV or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Value used for model features missing from the input row
        #[arg(long)]
        fill: Option<f64>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Summarize a data file and/or a model directory
    Info {
        /// Data file to summarize
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model directory to list
        #[arg(short, long)]
        models: Option<PathBuf>,
    },
}

/// Options shared by train and predict
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Model artifact directory
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,

    /// Hours of lag history per variable
    #[arg(long)]
    pub lag_hours: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Binary,
    Json,
}

impl From<FormatArg> for SerializationFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Binary => SerializationFormat::Binary,
            FormatArg::Json => SerializationFormat::Json,
        }
    }
}

/// Load the configuration file (or defaults) and apply flag overrides
pub fn resolve_config(common: &CommonArgs) -> anyhow::Result<ForecastConfig> {
    let mut config = match &common.config {
        Some(path) => ForecastConfig::from_json_file(path)?,
        None => ForecastConfig::default(),
    };
    if let Some(dir) = &common.model_dir {
        config.model_dir = dir.clone();
    }
    if let Some(h) = common.lag_hours {
        config.lag_hours = h;
    }
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_clean(input: &Path, output: &Path, skip_rows: usize) -> anyhow::Result<()> {
    section("Clean");
    let cleaner = DataCleaner::new().with_skip_rows(skip_rows);

    step_run("Loading raw export");
    let start = Instant::now();
    let raw = cleaner.load_raw(input)?;
    step_done(&format!("{} rows × {} cols in {:?}", raw.height(), raw.width(), start.elapsed()));

    step_run("Cleaning");
    let mut cleaned = cleaner.clean(&raw)?;
    let order = cleaner.validate_time_order(&cleaned)?;
    step_done(&format!("{} timestamps checked", order.parsed));

    step_run(&format!("Saving → {}", output.display()));
    cleaner.save(&mut cleaned, output)?;
    step_done(&format!("{} rows", cleaned.height()));

    println!();
    Ok(())
}

pub fn cmd_train(
    data: &Path,
    targets: &[String],
    forecast_hours: Option<usize>,
    split_ratio: Option<f64>,
    format: Option<FormatArg>,
    common: &CommonArgs,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = resolve_config(common)?;
    if !targets.is_empty() {
        config.targets = targets.to_vec();
    }
    if let Some(f) = forecast_hours {
        config.forecast_hours = f;
    }
    if let Some(r) = split_ratio {
        config.split_ratio = r;
    }
    if let Some(fmt) = format {
        config.format = fmt.into();
    }
    config.validate()?;

    step_run("Loading data");
    let df = DataLoader::new().load_auto(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run(&format!(
        "Training {} targets × {} horizons",
        config.targets.len(),
        config.forecast_hours
    ));
    let start = Instant::now();
    let trainer = ForecastTrainer::new(config);
    let report = trainer.run(&df)?;
    step_done(&format!("{:.1?}", start.elapsed()));

    if let Some(split) = &report.split {
        kv("Rows", report.n_rows);
        kv("Train / test", format!("{} / {}", split.train_len(), split.test_len()));
        kv("Features", report.feature_columns.len());
    }
    println!();
    println!("  {:<48} {:>10}", muted("Target"), muted("RMSE"));
    println!("  {}", dim(&"─".repeat(60)));

    for entry in &report.outcomes {
        match &entry.outcome {
            TargetOutcome::Trained { metrics, .. } => {
                println!("  {:<48} {:>10}", entry.target, fmt_opt(metrics.rmse).white().bold());
            }
            TargetOutcome::Skipped { reason } => {
                println!("  {:<48} {:>10}  {}", entry.target, "skipped".yellow(), dim(reason));
            }
            TargetOutcome::Failed { error } => {
                println!("  {:<48} {:>10}  {}", entry.target, "failed".red(), error);
            }
        }
    }

    println!();
    println!(
        "  {} {} trained, {} skipped, {} failed → {}",
        ok("✓"),
        report.n_trained(),
        report.n_skipped(),
        report.n_failed(),
        trainer.config().model_dir.display()
    );
    println!();
    Ok(())
}

pub fn cmd_predict(data: &Path, fill: Option<f64>, common: &CommonArgs) -> anyhow::Result<()> {
    section("Predict");

    let mut config = resolve_config(common)?;
    if let Some(v) = fill {
        config.missing_feature_fill = v;
    }
    config.validate()?;

    step_run("Loading data");
    let df = DataLoader::new().load_auto(data)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run(&format!("Loading models from {}", config.model_dir.display()));
    let registry = ModelRegistry::load_all(&config.model_dir)?;
    step_done(&format!("{} models", registry.len()));

    for collision in registry.collisions() {
        println!(
            "  {} {} overwritten by {}",
            "!".yellow(),
            collision.replaced.display(),
            collision.kept.display()
        );
    }
    for failure in registry.failures() {
        println!("  {} {}: {}", "!".yellow(), failure.path.display(), failure.reason);
    }

    let engine = ForecastEngine::new(config);
    let report = engine.forecast(&df, &registry)?;

    println!();
    println!("  {}", "Forecast Results".white().bold());
    println!("  {}", dim(&"─".repeat(56)));
    if report.is_empty() {
        println!("  {}", muted("no models to run"));
    }
    for forecast in &report.forecasts {
        match forecast {
            ModelForecast::Succeeded { key, prediction } => {
                let note = if prediction.filled.is_empty() {
                    String::new()
                } else {
                    format!("({} features filled)", prediction.filled.len())
                };
                println!("  {:<44} {:>10.3}  {}", key, prediction.value, dim(&note));
            }
            ModelForecast::Failed { key, stage, reason } => {
                println!("  {:<44} {}", key, format!("Error while {}: {}", stage, reason).red());
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data: Option<&Path>, models: Option<&Path>) -> anyhow::Result<()> {
    if data.is_none() && models.is_none() {
        anyhow::bail!("nothing to show: pass --data and/or --models");
    }

    if let Some(path) = data {
        section("Data Info");
        let df = DataLoader::new().load_auto(path)?;
        kv("File", path.display());
        kv("Rows", df.height());
        kv("Columns", df.width());
        println!();

        println!(
            "  {:<40} {:>6} {:>10} {:>10} {:>10}",
            muted("Column"), muted("Nulls"), muted("Min"), muted("Mean"), muted("Max")
        );
        println!("  {}", dim(&"─".repeat(80)));
        for col in summarize(&df)? {
            println!(
                "  {:<40} {:>6} {:>10} {:>10} {:>10}",
                col.name,
                col.null_count,
                fmt_opt(col.min),
                fmt_opt(col.mean),
                fmt_opt(col.max)
            );
        }
    }

    if let Some(dir) = models {
        section("Models");
        let registry = ModelRegistry::load_all(dir)?;
        kv("Directory", dir.display());
        kv("Loaded", registry.len());
        println!();
        for entry in registry.iter() {
            let rmse = entry.metadata.metrics.get("rmse").copied();
            println!(
                "  {:<44} {:>4} features  rmse {}  {}",
                entry.key,
                entry.metadata.feature_names.len(),
                fmt_opt(rmse),
                dim(&entry.metadata.trained_at)
            );
        }
        for failure in registry.failures() {
            println!("  {} {}: {}", "!".red(), failure.path.display(), failure.reason);
        }
    }

    println!();
    Ok(())
}
