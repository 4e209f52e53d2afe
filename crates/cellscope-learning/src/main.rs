//! CLI entry point: train, predict and profile.

use anyhow::{Result, anyhow};
use cellscope_learning::{
    ArtifactStore, LearningError, PredictionRequest, PredictionResult, Predictor, ResultExt,
    ScalerKind, TestSize, TrainingConfig, TrainingOutcome, TrainingPipeline,
};
use cellscope_processing::{CleanedDataset, DatasetSummary, DisplayRanges, load_and_clean};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Breast-mass cytology diagnosis: train, persist and serve a logistic classifier",
    long_about = "Fits a scaler and a logistic regression on the cell-nuclei dataset and\n\
                  classifies new measurements as benign or malignant.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  CELLSCOPE_DATASET        Default dataset CSV path\n  \
                  CELLSCOPE_ARTIFACT_DIR   Default artifact directory\n\n\
                  EXAMPLES:\n  \
                  # Train with 80 held-out rows, seed 1\n  \
                  cellscope train -i data/data.csv -a model/ --test-count 80\n\n  \
                  # Classify one request\n  \
                  cellscope predict -a model/ --request sample.json\n\n  \
                  # Slider ranges and class balance\n  \
                  cellscope profile -i data/data.csv"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit the scaler and classifier, evaluate them and write the artifacts
    Train(TrainArgs),
    /// Classify one request using persisted artifacts
    Predict(PredictArgs),
    /// Summarize a dataset and print the form slider ranges
    Profile(ProfileArgs),
}

impl Command {
    fn json(&self) -> bool {
        match self {
            Command::Train(a) => a.json,
            Command::Predict(a) => a.json,
            Command::Profile(a) => a.json,
        }
    }
}

#[derive(clap::Args, Debug)]
struct TrainArgs {
    /// Path to the dataset CSV
    #[arg(short, long, env = "CELLSCOPE_DATASET")]
    input: PathBuf,

    /// Directory to write the `scaler` and `model` artifacts to
    #[arg(short, long, env = "CELLSCOPE_ARTIFACT_DIR", default_value = "./model")]
    artifacts: PathBuf,

    /// Fraction of rows held out for evaluation, in (0, 1)
    #[arg(long, conflicts_with = "test_count")]
    test_fraction: Option<f64>,

    /// Exact number of rows held out for evaluation
    #[arg(long)]
    test_count: Option<usize>,

    /// Seed for the train/test split
    #[arg(long, default_value = "1")]
    seed: u64,

    /// Feature scaler (standard, minmax)
    #[arg(long, default_value = "standard")]
    scaler: ScalerKind,

    /// Inverse regularization strength
    #[arg(long, default_value = "1.0")]
    c: f64,

    /// Gradient descent step size
    #[arg(long, default_value = "0.1")]
    learning_rate: f64,

    /// Maximum gradient descent iterations
    #[arg(long, default_value = "1000")]
    max_iter: usize,

    /// Evaluate only; do not write artifacts
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct PredictArgs {
    /// Directory holding the `scaler` and `model` artifacts
    #[arg(short, long, env = "CELLSCOPE_ARTIFACT_DIR", default_value = "./model")]
    artifacts: PathBuf,

    /// JSON object of feature name to value; `-` reads stdin
    ///
    /// Without a request, the slider defaults of `--dataset` are classified.
    #[arg(short, long)]
    request: Option<String>,

    /// Dataset CSV used for radar-chart normalization and slider defaults
    #[arg(short, long, env = "CELLSCOPE_DATASET")]
    dataset: Option<PathBuf>,

    /// Output JSON to stdout instead of human-readable summary
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ProfileArgs {
    /// Path to the dataset CSV
    #[arg(short, long, env = "CELLSCOPE_DATASET")]
    input: PathBuf,

    /// Output JSON to stdout instead of human-readable summary
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env must be read before clap resolves `env = ...` fallbacks
    dotenv().ok();

    let args = Args::parse();
    let json = args.command.json();
    init_logging(&args.log_level, args.quiet, json);

    let result = match args.command {
        Command::Train(ref train) => run_train(train, args.quiet),
        Command::Predict(ref predict) => run_predict(predict),
        Command::Profile(ref profile) => run_profile(profile),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if json => {
            println!("{}", serde_json::to_string_pretty(&e)?);
            std::process::exit(1);
        }
        Err(e) => Err(anyhow!("{e} ({})", e.error_code())),
    }
}

fn load_dataset(path: &Path) -> Result<(CleanedDataset, DatasetSummary), LearningError> {
    load_and_clean(path).context(format!("Failed to load {}", path.display()))
}

fn run_train(args: &TrainArgs, quiet: bool) -> Result<(), LearningError> {
    let (dataset, summary) = load_dataset(&args.input)?;
    info!(
        "Dataset loaded: {} rows ({} benign, {} malignant)",
        summary.rows, summary.benign, summary.malignant
    );

    let mut config = TrainingConfig::builder()
        .random_seed(args.seed)
        .scaler(args.scaler)
        .c(args.c)
        .learning_rate(args.learning_rate)
        .max_iter(args.max_iter);
    if let Some(count) = args.test_count {
        config = config.test_size(TestSize::Count(count));
    } else if let Some(fraction) = args.test_fraction {
        config = config.test_size(TestSize::Fraction(fraction));
    }

    let mut builder = TrainingPipeline::builder().config(config.build()?);
    if !quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.as_str(),
                update.message
            );
        });
    }
    let pipeline = builder.build()?;

    let outcome = if args.dry_run {
        pipeline.fit(&dataset)?
    } else {
        pipeline.run(&dataset, &ArtifactStore::new(&args.artifacts))?
    };

    if args.json {
        print_json(&outcome)?;
    } else {
        print_training_summary(&outcome, args);
    }
    Ok(())
}

fn print_training_summary(outcome: &TrainingOutcome, args: &TrainArgs) {
    let report = &outcome.report;
    let model = &outcome.model;

    println!("\n{}", "=".repeat(80));
    println!("TRAINING COMPLETE");
    println!("{}\n", "=".repeat(80));

    println!("PARTITIONS");
    println!("{}", "-".repeat(40));
    println!("  Train rows: {}", report.n_train);
    println!("  Test rows:  {}", report.n_test);
    println!("  Seed:       {}", args.seed);
    println!();

    println!("MODEL");
    println!("{}", "-".repeat(40));
    println!("  Scaler:      {}", outcome.scaler.kind.as_str());
    println!("  C:           {}", model.hyperparameters.c);
    println!(
        "  Iterations:  {}{}",
        model.n_iter,
        if model.converged { "" } else { " (not converged)" }
    );
    let degenerate = outcome.scaler.degenerate_features();
    if !degenerate.is_empty() {
        let names: Vec<&str> = degenerate
            .iter()
            .map(|&i| outcome.scaler.feature_names[i].as_str())
            .collect();
        println!("  Constant features (scaled to 0): {}", names.join(", "));
    }
    println!();

    println!("EVALUATION");
    println!("{}", "-".repeat(40));
    println!("  Train accuracy: {:.4}", report.train_accuracy);
    println!("  Test accuracy:  {:.4}", report.accuracy);
    println!();
    println!("{}", report);

    println!("{}", "=".repeat(80));
    if args.dry_run {
        println!("Dry run: no artifacts written");
    } else {
        println!("Artifacts written to {}", args.artifacts.display());
    }
    println!("Completed in {} ms", outcome.duration_ms);
    println!("{}", "=".repeat(80));
}

#[derive(Serialize)]
struct PredictOutput {
    request: serde_json::Map<String, serde_json::Value>,
    result: PredictionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    radar: Option<cellscope_processing::RadarChart>,
}

fn run_predict(args: &PredictArgs) -> Result<(), LearningError> {
    let predictor = Predictor::load(&args.artifacts)?;

    let ranges = match args.dataset {
        Some(ref path) => {
            let (dataset, _) = load_dataset(path)?;
            DisplayRanges::from_dataset(&dataset)
        }
        None => None,
    };

    let request = match (&args.request, &ranges) {
        (Some(source), _) => read_request(source)?,
        (None, Some(ranges)) => PredictionRequest::from_values(&ranges.default_row())?,
        (None, None) => {
            return Err(LearningError::InvalidConfig(
                "either --request or --dataset is required".to_string(),
            ));
        }
    };

    let result = predictor.predict(&request);
    let radar = ranges.as_ref().map(|r| r.radar_chart(request.values()));

    if args.json {
        return print_json(&PredictOutput {
            request: request.to_map(),
            result,
            radar,
        });
    }

    println!("\n{}", "=".repeat(80));
    println!("CELL CLUSTER PREDICTION");
    println!("{}\n", "=".repeat(80));
    println!("  Diagnosis: {}", result.diagnosis.as_str().to_uppercase());
    println!();
    println!("  {:<10} {}", "Benign", gauge(result.probability_benign));
    println!("  {:<10} {}", "Malignant", gauge(result.probability_malignant));

    if let Some(radar) = radar {
        println!();
        println!("RADAR (normalized over the full dataset)");
        println!("{}", "-".repeat(40));
        print!("  {:<20}", "");
        for trace in &radar.traces {
            print!(" {:>14}", trace.name);
        }
        println!();
        for (i, category) in radar.categories.iter().enumerate() {
            print!("  {:<20}", category);
            for trace in &radar.traces {
                print!(" {:>14.3}", trace.values[i]);
            }
            println!();
        }
    }
    println!();
    println!("{}", "=".repeat(80));
    println!("This output is an aid for professionals, not a substitute for a diagnosis.");
    println!("{}", "=".repeat(80));
    Ok(())
}

fn read_request(source: &str) -> Result<PredictionRequest, LearningError> {
    let text = if source == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(source)?
    };
    Ok(PredictionRequest::from_json_str(&text)?)
}

/// Probability as a fixed-width bar, e.g. `[############--------]  61.2%`.
fn gauge(probability: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((probability.clamp(0.0, 1.0) * WIDTH as f64).round() as usize).min(WIDTH);
    format!(
        "[{}{}] {:>5.1}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        probability * 100.0
    )
}

#[derive(Serialize)]
struct ProfileOutput {
    summary: DatasetSummary,
    sliders: Vec<cellscope_processing::SliderSpec>,
}

fn run_profile(args: &ProfileArgs) -> Result<(), LearningError> {
    let (dataset, summary) = load_dataset(&args.input)?;
    let ranges = DisplayRanges::from_dataset(&dataset)
        .ok_or_else(|| LearningError::Data("dataset contains no rows".to_string()))?;
    let sliders = ranges.slider_specs();

    if args.json {
        return print_json(&ProfileOutput { summary, sliders });
    }

    println!("\n{}", "=".repeat(80));
    println!("DATASET PROFILE");
    println!("{}\n", "=".repeat(80));
    println!("  File:      {}", args.input.display());
    println!("  Rows:      {}", summary.rows);
    println!("  Benign:    {}", summary.benign);
    println!("  Malignant: {}", summary.malignant);
    if !summary.dropped_columns.is_empty() {
        println!("  Dropped:   {}", summary.dropped_columns.join(", "));
    }
    println!();

    println!("SLIDERS");
    println!("{}", "-".repeat(70));
    println!(
        "{:<28} {:<16} {:>10} {:>10}",
        "Label", "Group", "Max", "Default"
    );
    println!("{}", "-".repeat(70));
    for slider in &sliders {
        println!(
            "{:<28} {:<16} {:>10.4} {:>10.4}",
            slider.label, slider.group, slider.max, slider.default
        );
    }
    println!("{}", "=".repeat(80));
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LearningError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| LearningError::Io(std::io::Error::other(e)))?;
    println!("{text}");
    Ok(())
}
