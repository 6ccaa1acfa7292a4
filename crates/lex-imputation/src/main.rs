//! CLI entry point for iterative missing-value imputation.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_imputation::{
    Dataset, ImputationFilter, ImputationReport, ImputerConfig, IterativeImputer, LearnerKind,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// CLI-compatible learner enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLearner {
    /// Least-squares linear regression (numeric attributes only)
    Linear,
    /// Multinomial logistic regression (nominal attributes only)
    Logistic,
    /// k-nearest-neighbour average or vote
    Knn,
    /// Mean or most frequent observed value
    Majority,
}

impl From<CliLearner> for LearnerKind {
    fn from(cli: CliLearner) -> Self {
        match cli {
            CliLearner::Linear => LearnerKind::LinearRegression,
            CliLearner::Logistic => LearnerKind::LogisticRegression,
            CliLearner::Knn => LearnerKind::NearestNeighbor,
            CliLearner::Majority => LearnerKind::Majority,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Iterative regression-based missing-value imputation",
    long_about = "Fills missing cells in a CSV file by regressing each incomplete column on \
                  all the others until the imputed values settle.\n\n\
                  EXAMPLES:\n  \
                  # Impute with default learners, last column as target\n  \
                  lex-imputation -i data.csv\n\n  \
                  # Choose the target and write the result somewhere specific\n  \
                  lex-imputation -i data.csv --target class -o data_filled.csv\n\n  \
                  # Train on one file, then impute a second file with the frozen models\n  \
                  lex-imputation -i train.csv --apply test.csv --apply-output test_filled.csv\n\n  \
                  # Nearest-neighbour learners, report as JSON\n  \
                  lex-imputation -i data.csv --numeric-learner knn --nominal-learner knn --json"
)]
struct Args {
    /// Path to the CSV file to impute (the training batch)
    #[arg(short, long)]
    input: String,

    /// Path of the imputed CSV
    ///
    /// If not specified, writes "<input_name>_imputed.csv" next to the input
    #[arg(short, long)]
    output: Option<String>,

    /// Target column, never imputed and never used as a dependent
    ///
    /// If not specified, the last column is the target
    #[arg(short, long)]
    target: Option<String>,

    /// CSV file to impute with the models trained on --input
    #[arg(long)]
    apply: Option<String>,

    /// Path of the imputed --apply CSV
    ///
    /// If not specified, writes "<apply_name>_imputed.csv" next to the --apply file
    #[arg(long, requires = "apply")]
    apply_output: Option<String>,

    /// JSON configuration file; command-line options override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Maximum number of refinement epochs
    #[arg(long)]
    max_epochs: Option<usize>,

    /// Sum of squared changes below which a column counts as stable
    #[arg(long)]
    epsilon: Option<f64>,

    /// Learner for numeric columns
    #[arg(long, value_enum)]
    numeric_learner: Option<CliLearner>,

    /// Learner for nominal columns
    #[arg(long, value_enum)]
    nominal_learner: Option<CliLearner>,

    /// Number of neighbours for the knn learner
    #[arg(long)]
    knn_neighbors: Option<usize>,

    /// Leave missing target cells unseeded during training
    #[arg(long)]
    no_seed_target: bool,

    /// Pass --apply rows through without imputing them
    #[arg(long)]
    no_apply_imputation: bool,

    /// Print the imputation report as JSON to stdout
    ///
    /// Disables all progress logs; only outputs the JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON report.
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
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    if let Some(ref apply) = args.apply
        && !Path::new(apply).exists()
    {
        return Err(anyhow!("Apply file not found: {}", apply));
    }

    let config = build_config(&args)?;
    debug!("Effective configuration: {:?}", config);

    info!("Loading dataset from: {}", args.input);
    let data = load_csv_with_fallbacks(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let dataset = Dataset::from_dataframe(&data, args.target.as_deref())?;
    info!(
        "Target column: {} ({} missing cells in total)",
        dataset.schema().target().name(),
        dataset.total_missing()
    );

    let mut filter = build_filter(&args, config)?;

    let completed = match filter.filter_dataset(dataset) {
        Ok(completed) => completed,
        Err(e) => {
            error!("Imputation failed: {}", e);
            return Err(anyhow!("Imputation failed: {}", e));
        }
    };

    let output_path = args
        .output
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(&args.input));
    write_csv(&completed, &output_path)?;
    info!("Imputed dataset written to: {}", output_path.display());

    if let Some(ref apply) = args.apply {
        let apply_output = args
            .apply_output
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_output_path(apply));
        apply_trained_models(&mut filter, apply, &apply_output)?;
    }

    let report = filter
        .last_report()
        .cloned()
        .ok_or_else(|| anyhow!("Imputation finished without a report"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report, &args.input, &output_path);
    Ok(())
}

/// Merge the optional JSON config file with command-line overrides.
fn build_config(args: &Args) -> Result<ImputerConfig> {
    let mut config = match args.config {
        Some(ref path) => ImputerConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path))?,
        None => ImputerConfig::default(),
    };

    if let Some(max_epochs) = args.max_epochs {
        config.max_epochs = max_epochs;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(learner) = args.numeric_learner {
        config.numeric_learner = learner.into();
    }
    if let Some(learner) = args.nominal_learner {
        config.nominal_learner = learner.into();
    }
    if let Some(k) = args.knn_neighbors {
        config.knn_neighbors = k;
    }
    if args.no_seed_target {
        config.seed_target = false;
    }
    if args.no_apply_imputation {
        config.impute_at_apply_time = false;
    }

    config.validate()?;
    Ok(config)
}

fn build_filter(args: &Args, config: ImputerConfig) -> Result<ImputationFilter> {
    let mut imputer = IterativeImputer::from_config(&config)?;

    if !args.quiet && !args.json {
        imputer = imputer.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(ImputationFilter::with_imputer(imputer))
}

/// Stream every row of `path` through the trained filter.
fn apply_trained_models(filter: &mut ImputationFilter, path: &str, output: &Path) -> Result<()> {
    let schema = filter
        .schema()
        .cloned()
        .ok_or_else(|| anyhow!("Filter has no schema after training"))?;

    info!("Loading rows to impute from: {}", path);
    let data = load_csv_with_fallbacks(path)?;
    let incoming = Dataset::from_dataframe_with_schema(&data, schema.clone())
        .with_context(|| format!("{} does not match the training columns", path))?;

    let total = incoming.len();
    let missing_before = incoming.total_missing();
    for row in incoming.into_rows() {
        filter.input(row)?;
    }
    filter.batch_finished()?;

    let applied = Dataset::with_rows(schema, filter.drain_output())?;
    info!(
        "Imputed {} rows ({} -> {} missing cells)",
        total,
        missing_before,
        applied.total_missing()
    );

    write_csv(&applied, output)?;
    info!("Imputed rows written to: {}", output.display());
    Ok(())
}

/// "<stem>_imputed.csv" in the same directory as `input`.
fn default_output_path(input: &str) -> PathBuf {
    let path = Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    path.with_file_name(format!("{}_imputed.csv", stem))
}

fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
        info!("Created output directory: {}", parent.display());
    }

    let mut df = dataset.to_dataframe()?;
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    Ok(())
}

/// Print a human-readable summary of the imputation run.
fn print_human_readable_summary(report: &ImputationReport, input: &str, output: &Path) {
    println!();
    println!("{}", "=".repeat(80));
    println!("IMPUTATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!("Input:  {} ({} rows)", input, report.rows);
    println!("Output: {}", output.display());
    println!("Target Column: {}", report.target);
    println!();

    println!("Summary:");
    println!("  Duration: {}ms", report.duration_ms);
    println!(
        "  Epochs: {} of {} ({})",
        report.epochs_run,
        report.max_epochs,
        if report.converged {
            "converged"
        } else {
            "epoch limit reached"
        }
    );
    println!(
        "  Missing cells: {} -> {}",
        report.cells_missing_before, report.cells_missing_after
    );
    println!("  Model fits: {}", report.total_fits);
    println!();

    println!(
        "{:<20} {:<9} {:<8} {:<20} {:<6} {:<8}",
        "Column", "Kind", "Missing", "Learner", "Fits", "Stable"
    );
    println!("{}", "-".repeat(75));
    for attribute in &report.attributes {
        let learner = match (&attribute.learner, &attribute.skipped) {
            (Some(learner), _) => learner.clone(),
            (None, Some(reason)) => format!("({})", reason),
            (None, None) => "-".to_string(),
        };
        let stable = attribute
            .stable_at_epoch
            .map(|epoch| format!("@{}", epoch))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<9} {:<8} {:<20} {:<6} {:<8}",
            truncate_str(&attribute.name, 19),
            attribute.kind,
            attribute.missing,
            learner,
            attribute.fits,
            stable
        );
    }
    println!();

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Cell texts read as missing, besides empty fields.
fn missing_markers() -> NullValues {
    NullValues::AllColumns(vec!["?".into(), "NA".into()])
}

/// Parse options for one loading attempt; `None` turns quote handling off.
fn parse_options(quote_char: Option<u8>) -> CsvParseOptions {
    CsvParseOptions::default()
        .with_quote_char(quote_char)
        .with_null_values(Some(missing_markers()))
}

/// Load CSV with multiple fallback strategies
fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(parse_options(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(parse_options(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cleaned = clean_csv_content(&content);
            let cursor = std::io::Cursor::new(cleaned);

            CsvReadOptions::default()
                .with_infer_schema_length(Some(100))
                .with_has_header(true)
                .with_parse_options(parse_options(Some(b'"')))
                .into_reader_with_file_handle(cursor)
                .finish()
                .map_err(|e| e.into())
        }
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Drop blank lines and collapse doubled quotes.
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
