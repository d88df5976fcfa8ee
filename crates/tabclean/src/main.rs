//! CLI entry point for the tabular cleaning and analysis library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tabclean::{
    CasePolicy, CleaningSummary, DataProfiler, OutlierDetector, OutlierSummary, Pipeline,
    PipelineConfig, PipelineResult, ReportGenerator, RunReport, TableSchema, TabularCleaner,
    load_csv,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXAMPLES: &str = "\
EXAMPLES:
    # Clean a table and write the cleaned CSV plus reports
    tabclean clean -i data/titanic.csv -o outputs

    # Treat only these columns as text, keep Ticket upper-cased
    tabclean clean -i data/titanic.csv --text-columns Name,Sex,Ticket,Embarked --upper-case Ticket

    # Preview what cleaning would do without writing anything
    tabclean clean -i data/titanic.csv --dry-run

    # Run the analysis step on an already cleaned table
    tabclean eda -i outputs/cleaned_dataset.csv -o eda_outputs --top-n 5

    # Clean and analyse in one go, printing the report as JSON
    tabclean run -i data/titanic.csv --json
";

/// Tabular data cleaning, IQR outlier detection and exploratory reports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = EXAMPLES)]
struct Cli {
    /// Logging level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove duplicates, normalize text, drop sparse columns and impute
    Clean(CleanArgs),
    /// Profile a cleaned table and write the analysis tables
    Eda(EdaArgs),
    /// Clean, detect outliers and profile in a single run
    Run(RunArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Casing applied to text columns without an explicit override.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum CaseArg {
    Lower,
    Upper,
    Preserve,
}

impl From<CaseArg> for CasePolicy {
    fn from(value: CaseArg) -> Self {
        match value {
            CaseArg::Lower => CasePolicy::Lower,
            CaseArg::Upper => CasePolicy::Upper,
            CaseArg::Preserve => CasePolicy::Preserve,
        }
    }
}

#[derive(Args, Debug)]
struct CleaningArgs {
    /// Drop columns whose missing fraction is above this value (0.0 - 1.0)
    #[arg(long, default_value = "0.6")]
    drop_threshold: f64,

    /// Comma-separated columns to treat as text; others are numeric.
    /// Inferred from the loaded types when omitted
    #[arg(long, value_delimiter = ',')]
    text_columns: Option<Vec<String>>,

    /// Casing for text columns
    #[arg(long, value_enum, default_value_t = CaseArg::Lower)]
    case: CaseArg,

    /// Comma-separated text columns to upper-case
    #[arg(long, value_delimiter = ',')]
    upper_case: Vec<String>,

    /// Comma-separated text columns whose casing is kept
    #[arg(long, value_delimiter = ',')]
    preserve_case: Vec<String>,

    /// Keep blank strings as values instead of treating them as missing
    #[arg(long)]
    keep_blanks: bool,
}

#[derive(Args, Debug)]
struct AnalysisArgs {
    /// Number of most frequent values listed per text column
    #[arg(long, default_value = "10")]
    top_n: usize,

    /// Number of equal-width bins for the binned rate table
    #[arg(long, default_value = "10")]
    age_bins: usize,

    /// Column to group rates by
    #[arg(long, default_value = "sex")]
    group_column: String,

    /// Binary column whose mean is reported as the rate
    #[arg(long, default_value = "survived")]
    rate_column: String,

    /// Numeric column split into bins
    #[arg(long, default_value = "age")]
    binned_column: String,
}

#[derive(Args, Debug)]
struct CleanArgs {
    /// Input CSV file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the cleaned CSV and reports
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Base name of the cleaned CSV (without extension)
    #[arg(long)]
    output_name: Option<String>,

    #[command(flatten)]
    cleaning: CleaningArgs,

    /// Print the planned actions without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct EdaArgs {
    /// Cleaned CSV file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the analysis tables
    #[arg(short, long, default_value = "eda_outputs")]
    output: PathBuf,

    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Input CSV file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the cleaned CSV and every report
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Base name of the cleaned CSV (without extension)
    #[arg(long)]
    output_name: Option<String>,

    #[command(flatten)]
    cleaning: CleaningArgs,

    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Print the run report as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

/// Initialize tracing. JSON mode keeps stdout clean, so logging stays off.
fn init_logging(level: LogLevel, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    let effective_level = if quiet { "warn" } else { level.as_str() };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let json_output = match &cli.command {
        Command::Clean(args) => args.json,
        Command::Eda(args) => args.json,
        Command::Run(args) => args.json,
    };
    init_logging(cli.log_level, cli.quiet, json_output);

    let result = match &cli.command {
        Command::Clean(args) => run_clean(args, cli.quiet),
        Command::Eda(args) => run_eda(args, cli.quiet),
        Command::Run(args) => run_all(args, cli.quiet),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

/// Build the pipeline configuration shared by every subcommand.
fn build_config(
    output: &Path,
    output_name: Option<&str>,
    cleaning: Option<&CleaningArgs>,
    analysis: Option<&AnalysisArgs>,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder().output_dir(output);

    if let Some(name) = output_name {
        builder = builder.output_name(name);
    }

    if let Some(args) = cleaning {
        builder = builder
            .drop_threshold(args.drop_threshold)
            .default_case(args.case.into())
            .blank_as_missing(!args.keep_blanks);
        if let Some(columns) = &args.text_columns {
            builder = builder.text_columns(columns.iter().map(|c| c.trim().to_string()));
        }
        for column in &args.upper_case {
            builder = builder.case_override(column.trim(), CasePolicy::Upper);
        }
        for column in &args.preserve_case {
            builder = builder.case_override(column.trim(), CasePolicy::Preserve);
        }
    }

    if let Some(args) = analysis {
        builder = builder
            .top_n(args.top_n)
            .bins(args.age_bins)
            .group_column(args.group_column.as_str())
            .rate_column(args.rate_column.as_str())
            .binned_column(args.binned_column.as_str());
    }

    builder.build().context("Invalid configuration")
}

fn run_clean(args: &CleanArgs, quiet: bool) -> Result<()> {
    let config = build_config(
        &args.output,
        args.output_name.as_deref(),
        Some(&args.cleaning),
        None,
    )?;

    info!("Loading dataset from: {}", args.input.display());
    let df = load_csv(&args.input)
        .with_context(|| format!("Failed to load '{}'", args.input.display()))?;
    let original_shape = df.shape();

    let cleaner = TabularCleaner::new(config.cleaner.clone())?;
    let outcome = cleaner.run(df).context("Cleaning failed")?;

    if args.dry_run {
        print_dry_run(&args.input, original_shape, &outcome.summary, &config);
        return Ok(());
    }

    let generator = ReportGenerator::from_config(&config);
    let mut table = outcome.table;
    let cleaned_path = generator.write_cleaned_csv(&mut table)?;
    let missingness_path = generator.write_missingness(
        &outcome.summary.missing_before,
        Some(&outcome.summary.missing_after),
    )?;

    let mut written = vec![cleaned_path.clone(), missingness_path];
    let report = RunReport::new(Some(&args.input), original_shape)
        .with_cleaning(outcome.summary.clone())
        .with_files(Some(&cleaned_path), &written);
    written.push(generator.write_report_to_file(&report, generator.output_stem())?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        print_cleaning_summary(&report, &outcome.summary);
        print_written_files(&written);
        println!("{}", "=".repeat(80));
    }

    Ok(())
}

fn run_eda(args: &EdaArgs, quiet: bool) -> Result<()> {
    let config = build_config(&args.output, None, None, Some(&args.analysis))?;

    info!("Loading cleaned dataset from: {}", args.input.display());
    let df = load_csv(&args.input)
        .with_context(|| format!("Failed to load '{}'", args.input.display()))?;
    let shape = df.shape();
    let schema = TableSchema::infer(&df);

    let outliers = OutlierDetector::detect_all(&df, &schema).context("Outlier detection failed")?;
    let eda = DataProfiler::profile(&df, &schema, &config.eda).context("Profiling failed")?;

    let generator = ReportGenerator::from_config(&config);
    let mut written = generator.write_eda_tables(&eda, &outliers)?;
    let report = RunReport::new(Some(&args.input), shape)
        .with_analysis(outliers, eda)
        .with_files(None, &written);
    written.push(generator.write_report_to_file(&report, "eda")?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        println!();
        println!("{}", "=".repeat(80));
        println!("ANALYSIS COMPLETE");
        println!("{}", "=".repeat(80));
        println!();
        println!("Input: {} ({} rows x {} columns)", args.input.display(), shape.0, shape.1);
        println!();
        print_outliers(&report.outliers);
        print_written_files(&written);
        println!("{}", "=".repeat(80));
    }

    Ok(())
}

fn run_all(args: &RunArgs, quiet: bool) -> Result<()> {
    let config = build_config(
        &args.output,
        args.output_name.as_deref(),
        Some(&args.cleaning),
        Some(&args.analysis),
    )?;

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update| {
            tracing::debug!(
                "[{:>5.1}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()
        .context("Invalid configuration")?;

    let result = pipeline
        .run_file(&args.input)
        .with_context(|| format!("Pipeline failed for '{}'", args.input.display()))?;

    if args.json {
        let report = report_for(&result, &args.input);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !quiet {
        let report = report_for(&result, &args.input);
        print_cleaning_summary(&report, &result.cleaning.summary);
        print_outliers(&result.outliers);
        print_written_files(&result.written_files);
        println!("Duration: {}ms", result.duration_ms);
        println!("{}", "=".repeat(80));
    }

    Ok(())
}

/// Rebuild the run report for printing; the written copy carries the same
/// content apart from its timestamp.
fn report_for(result: &PipelineResult, input: &Path) -> RunReport {
    let summary = &result.cleaning.summary;
    let cleaned = result.written_files.first().map(PathBuf::as_path);
    RunReport::new(Some(input), (summary.rows_before, summary.columns_before))
        .with_cleaning(summary.clone())
        .with_analysis(result.outliers.clone(), result.eda.clone())
        .with_files(cleaned, &result.written_files)
}

/// Print what a cleaning run would do, without writing anything.
fn print_dry_run(
    input: &Path,
    original_shape: (usize, usize),
    summary: &CleaningSummary,
    config: &PipelineConfig,
) {
    println!("{}", "=".repeat(80));
    println!("DRY RUN - No files will be written");
    println!("{}", "=".repeat(80));
    println!();

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", input.display());
    println!("  Rows: {}", original_shape.0);
    println!("  Columns: {}", original_shape.1);
    println!();

    println!("MISSING VALUES");
    println!("{}", "-".repeat(40));
    let with_missing = summary.missing_before.with_missing();
    if with_missing.is_empty() {
        println!("  No missing values found");
    } else {
        println!("{:<20} {:>10} {:>12}", "Column", "Missing", "Fraction");
        println!("{}", "-".repeat(44));
        for column in with_missing {
            println!(
                "{:<20} {:>10} {:>12.3}",
                truncate_str(&column.column, 19),
                column.missing_count,
                column.missing_fraction
            );
        }
    }
    println!();

    println!("PLANNED ACTIONS");
    println!("{}", "-".repeat(40));
    for (i, action) in summary.actions.iter().enumerate() {
        println!("  {}. {}", i + 1, action);
    }
    println!();

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    let stem = config.output_stem();
    println!("  - {}/{}.csv", config.output_dir.display(), stem);
    println!("  - {}/{}", config.output_dir.display(), tabclean::reporting::MISSINGNESS_FILE);
    println!("  - {}/{}_report.json", config.output_dir.display(), stem);
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this cleaning, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Print a human-readable summary of a cleaning run.
fn print_cleaning_summary(report: &RunReport, summary: &CleaningSummary) {
    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file.as_deref().unwrap_or("<memory>"),
        report.original_shape.0,
        report.original_shape.1
    );
    if let Some(output_file) = &report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, report.final_shape.0, report.final_shape.1
        );
    }
    println!();

    println!("Cleaning Summary:");
    println!(
        "  Rows: {} -> {} ({} duplicates removed)",
        summary.rows_before, summary.rows_after, summary.duplicates_removed
    );
    println!(
        "  Columns: {} -> {} ({} dropped)",
        summary.columns_before,
        summary.columns_after,
        summary.dropped_columns.len()
    );
    println!(
        "  Missing values: {} -> {}",
        summary.missing_before.total_missing(),
        summary.missing_after.total_missing()
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in summary.actions.iter().take(10) {
            println!("  - {}", action);
        }
        if summary.actions.len() > 10 {
            println!("  ... and {} more actions", summary.actions.len() - 10);
        }
        println!();
    }
}

fn print_outliers(outliers: &[OutlierSummary]) {
    if outliers.is_empty() {
        return;
    }

    println!("Outliers (IQR):");
    for summary in outliers {
        match summary {
            OutlierSummary::Detected {
                column,
                outlier_count,
                bounds,
            } => println!(
                "  {:<20} {:>5} outside [{:.2}, {:.2}]",
                truncate_str(column, 19),
                outlier_count,
                bounds.lower,
                bounds.upper
            ),
            OutlierSummary::Skipped { column, reason } => {
                println!("  {:<20} skipped: {}", truncate_str(column, 19), reason)
            }
        }
    }
    println!();
}

fn print_written_files(written: &[PathBuf]) {
    if written.is_empty() {
        return;
    }
    println!("Files Written:");
    for path in written {
        println!("  - {}", path.display());
    }
    println!();
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
