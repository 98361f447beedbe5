//! Drill-hole deviation predictor CLI
//!
//! Trains the azimuth/inclination deviation models on a CSV of historical
//! holes (or the built-in demo dataset) and predicts the path of a planned hole.
//!
//! # Usage
//!
//! ```bash
//! # Train on the demo dataset and print metrics + importances
//! deviation train
//!
//! # Train an SVR pair on real data, augmenting first
//! deviation train --data holes.csv --family svr --augment
//!
//! # Predict a planned hole and dump its trajectory
//! deviation predict --depth 600 --azimuth 45 --inclination -60 --rpm 120 \
//!     --lithology Granite --trajectory-csv path.csv
//!
//! # Deviation summaries and field correlations of a dataset
//! deviation explore --data holes.csv
//!
//! # Write an augmented copy of a dataset
//! deviation augment --data holes.csv --samples 800 -o augmented.csv
//! ```
//!
//! # Environment Variables
//!
//! - `DEVIATION_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use drillhole_deviation::analysis;
use drillhole_deviation::config::{self, PredictorConfig};
use drillhole_deviation::demo::{self, DEFAULT_DEMO_ROWS, DEFAULT_DEMO_SEED};
use drillhole_deviation::importance::{self, sort_by_target};
use drillhole_deviation::ingest;
use drillhole_deviation::prediction::{self, DeviationReport, PlannedHole};
use drillhole_deviation::session::Session;
use drillhole_deviation::trainer::{self, TrainError, TrainingOptions, TrainingReport};
use drillhole_deviation::trajectory::Trajectory;
use drillhole_deviation::types::{Dataset, FeatureImportance, FitQuality, PerformanceTier, Target};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "deviation")]
#[command(about = "Drill-hole deviation prediction")]
#[command(version)]
struct CliArgs {
    /// Config file (takes precedence over DEVIATION_CONFIG and ./deviation_config.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Args, Debug)]
struct SourceArgs {
    /// Historical holes CSV; the demo dataset is used when omitted
    #[arg(long, value_name = "CSV")]
    data: Option<PathBuf>,

    /// Demo rows when no CSV is given
    #[arg(long, default_value_t = DEFAULT_DEMO_ROWS)]
    demo_rows: usize,

    /// Demo generator seed
    #[arg(long, default_value_t = DEFAULT_DEMO_SEED)]
    demo_seed: u64,
}

#[derive(clap::Args, Debug)]
struct ModelArgs {
    /// Model family: random_forest, svr, linear, mlp (display names accepted)
    #[arg(short, long)]
    family: Option<String>,

    /// Held-out fraction for evaluation
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Train/test shuffle seed
    #[arg(long)]
    seed: Option<u64>,

    /// Augment the training table first (same as [augmentation] enabled = true)
    #[arg(long)]
    augment: bool,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Train both models and print metrics and feature importances as JSON
    Train {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Train, then predict the deviation of one planned hole
    Predict {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        model: ModelArgs,
        /// Planned final depth (m)
        #[arg(long)]
        depth: f64,
        /// Collar azimuth (degrees)
        #[arg(long)]
        azimuth: f64,
        /// Collar inclination (degrees, -90 = vertical down)
        #[arg(long, allow_hyphen_values = true)]
        inclination: f64,
        /// Rotation speed (rpm)
        #[arg(long)]
        rpm: f64,
        #[arg(long)]
        lithology: Option<String>,
        #[arg(long)]
        company: Option<String>,
        /// Trajectory samples (overrides [trajectory] num_points)
        #[arg(long)]
        points: Option<usize>,
        /// Also write the trajectory points to this CSV
        #[arg(long, value_name = "CSV")]
        trajectory_csv: Option<PathBuf>,
    },

    /// Write the dataset plus synthetic samples as CSV
    Augment {
        #[command(flatten)]
        source: SourceArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        samples: Option<usize>,
        #[arg(long)]
        noise_level: Option<f64>,
        /// Keep categorical labels unchanged
        #[arg(long)]
        no_vary_categories: bool,
        #[arg(long, conflicts_with = "random_seed")]
        seed: Option<u64>,
        /// Draw the augmentation seed from entropy
        #[arg(long)]
        random_seed: bool,
    },

    /// Print deviation summaries and field correlations as JSON
    Explore {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the effective configuration as TOML
    Config,
}

// ============================================================================
// Output Shapes
// ============================================================================

#[derive(Serialize)]
struct FitQualitySummary {
    azimuth: FitQuality,
    inclination: FitQuality,
}

#[derive(Serialize)]
struct PerformanceSummary {
    tier: PerformanceTier,
    advice: &'static str,
}

#[derive(Serialize)]
struct TrainOutput<'a> {
    report: &'a TrainingReport,
    fit_quality: FitQualitySummary,
    performance: PerformanceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    importances: Option<Vec<FeatureImportance>>,
}

// ============================================================================
// Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let cfg = match &args.config {
        Some(path) => PredictorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PredictorConfig::load(),
    };
    config::init(cfg);

    let session = Session::new();
    match args.command {
        SubCommand::Train { source, model } => run_train(&session, &source, &model),
        SubCommand::Predict {
            source,
            model,
            depth,
            azimuth,
            inclination,
            rpm,
            lithology,
            company,
            points,
            trajectory_csv,
        } => {
            let hole = PlannedHole {
                final_depth: depth,
                initial_azimuth: azimuth,
                initial_inclination: inclination,
                lithology,
                rotation_speed: rpm,
                drilling_company: company,
            };
            run_predict(&session, &source, &model, &hole, points, trajectory_csv.as_deref())
        }
        SubCommand::Augment {
            source,
            output,
            samples,
            noise_level,
            no_vary_categories,
            seed,
            random_seed,
        } => {
            let mut params = config::get().augmentation_params();
            if let Some(n) = samples {
                params.count = n;
            }
            if let Some(level) = noise_level {
                params.noise_level = level;
            }
            if no_vary_categories {
                params.vary_categories = false;
            }
            if let Some(s) = seed {
                params.seed = s;
            } else if random_seed {
                params.seed = rand::random();
            }

            let dataset = load_source(&source)?;
            let augmented = session
                .augmented_or_insert(&dataset, &params)
                .context("Augmentation failed")?;
            info!(
                original = augmented.original_len(),
                synthetic = augmented.synthetic_len(),
                seed = params.seed,
                "Augmented dataset"
            );
            write_dataset(augmented.dataset(), output.as_deref())
        }
        SubCommand::Explore { source } => run_explore(&source),
        SubCommand::Config => {
            print!("{}", config::get().to_toml()?);
            Ok(())
        }
    }
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_train(session: &Session, source: &SourceArgs, model: &ModelArgs) -> Result<()> {
    let dataset = load_source(source)?;
    let training_set = prepare_training_set(session, dataset, model.augment)?;
    let options = training_options(model)?;

    let (pair, report) = trainer::train(&training_set, &options).context("Training failed")?;
    let active = session.install_model(pair, report);

    let importances = match importance::importances(&active.pair) {
        Ok(mut entries) => {
            sort_by_target(&mut entries, Target::Azimuth);
            Some(entries)
        }
        Err(TrainError::ImportanceUnavailable(family)) => {
            info!(family = %family, "Feature importances not available for this family");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let metrics = &active.report.metrics;
    let tier = PerformanceTier::from_metrics(metrics);
    info!(mean_r2 = metrics.mean_r2(), tier = tier.label(), "Model performance");
    let output = TrainOutput {
        report: &active.report,
        fit_quality: FitQualitySummary {
            azimuth: FitQuality::from_r2(metrics.azimuth_r2),
            inclination: FitQuality::from_r2(metrics.inclination_r2),
        },
        performance: PerformanceSummary { tier, advice: tier.advice() },
        importances,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_explore(source: &SourceArgs) -> Result<()> {
    let dataset = load_source(source)?;
    let Some(report) = analysis::explore(&dataset) else {
        bail!("Dataset is empty");
    };
    for finding in &report.notable_correlations {
        info!("{finding}");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_predict(
    session: &Session,
    source: &SourceArgs,
    model: &ModelArgs,
    hole: &PlannedHole,
    points: Option<usize>,
    trajectory_csv: Option<&Path>,
) -> Result<()> {
    let dataset = load_source(source)?;
    let training_set = prepare_training_set(session, dataset, model.augment)?;
    let options = training_options(model)?;

    let (pair, report) = trainer::train(&training_set, &options).context("Training failed")?;
    session.install_model(pair, report);
    let Some(active) = session.model() else {
        bail!("No trained model available");
    };

    let cfg = config::get();
    let num_points = points.unwrap_or(cfg.trajectory.num_points);
    let prediction =
        prediction::predict_with_thresholds(&active.pair, hole, num_points, &cfg.recommendation)
            .context("Prediction failed")?;
    info!(
        delta_azimuth = prediction.delta_azimuth,
        delta_inclination = prediction.delta_inclination,
        tier = prediction.recommendation.label(),
        "Predicted deviation"
    );

    if let Some(path) = trajectory_csv {
        write_trajectory(&prediction.trajectory, path)
            .with_context(|| format!("Failed to write trajectory to {}", path.display()))?;
        info!(path = %path.display(), points = prediction.trajectory.len(), "Trajectory written");
    }

    let report = DeviationReport::new(
        active.pair.family(),
        hole,
        &prediction,
        Some(active.report.metrics),
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn load_source(source: &SourceArgs) -> Result<Dataset> {
    match &source.data {
        Some(path) => ingest::load_csv(path, &config::get().columns)
            .with_context(|| format!("Failed to load {}", path.display())),
        None => {
            info!(rows = source.demo_rows, seed = source.demo_seed, "Using demo dataset");
            Ok(demo::generate(source.demo_rows, source.demo_seed))
        }
    }
}

fn prepare_training_set(session: &Session, dataset: Dataset, force_augment: bool) -> Result<Dataset> {
    let cfg = config::get();
    if !(force_augment || cfg.augmentation.enabled) {
        return Ok(dataset);
    }
    let augmented = session
        .augmented_or_insert(&dataset, &cfg.augmentation_params())
        .context("Augmentation failed")?;
    Ok(augmented.dataset().clone())
}

fn training_options(model: &ModelArgs) -> Result<TrainingOptions> {
    let mut options = config::get().training_options();
    if let Some(name) = &model.family {
        options.family = name.parse().with_context(|| format!("Invalid --family '{name}'"))?;
    }
    if let Some(fraction) = model.test_fraction {
        options.test_fraction = fraction;
    }
    if let Some(seed) = model.seed {
        options.seed = seed;
    }
    Ok(options)
}

fn write_dataset(dataset: &Dataset, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            ingest::write_csv(dataset, &mut writer)?;
            writer.flush()?;
            info!(path = %path.display(), rows = dataset.len(), "Dataset written");
        }
        None => {
            let mut writer = BufWriter::new(std::io::stdout().lock());
            ingest::write_csv(dataset, &mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}

fn write_trajectory(trajectory: &Trajectory, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "depth,azimuth,inclination,east,north,up")?;
    for p in trajectory.points() {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            p.depth, p.azimuth, p.inclination, p.position.east, p.position.north, p.position.up
        )?;
    }
    writer.flush()?;
    Ok(())
}
