//! Tabular Cleaning and Analysis Library
//!
//! A small, deterministic cleaning and exploratory-analysis library built
//! with Rust and Polars, shaped around passenger-record tables such as the
//! Titanic dataset.
//!
//! # Overview
//!
//! - **Cleaning**: duplicate removal, text normalization, missingness
//!   measurement, column pruning and median/mode imputation
//! - **Outlier Detection**: IQR fences over every numeric column
//! - **Profiling**: descriptive statistics, value counts, correlations,
//!   group and binned rates
//! - **Reporting**: cleaned CSV, analysis tables as CSV and a JSON run report
//! - **Progress Reporting**: stage updates through a callback
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabclean::{TabularCleaner, OutlierDetector};
//! use tabclean::utils::load_csv;
//!
//! let df = load_csv("data/titanic.csv")?;
//!
//! // Clean with an explicit set of text columns
//! let (cleaned, missingness) = TabularCleaner::clean(df, 0.6, &["Sex", "Embarked"])?;
//!
//! // Flag outliers in one column
//! let report = OutlierDetector::detect(cleaned.column("Fare")?.as_materialized_series())?;
//! println!("{} outliers above {:.2}", report.count(), report.bounds.upper);
//! ```
//!
//! # Full Pipeline
//!
//! ```rust,ignore
//! use tabclean::{CasePolicy, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .drop_threshold(0.6)
//!     .case_override("Ticket", CasePolicy::Upper)
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:?}] {}", update.stage, update.message);
//!     })
//!     .build()?
//!     .run_file("data/titanic.csv")?;
//!
//! println!("Wrote {} files", result.written_files.len());
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod pipeline;
pub mod profiler;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::TabularCleaner;
pub use config::{
    CasePolicy, CleanerConfig, ConfigValidationError, EdaConfig, PipelineConfig,
    PipelineConfigBuilder,
};
pub use error::{Result as TabcleanResult, ResultExt, TabcleanError};
pub use imputers::StatisticalImputer;
pub use pipeline::{
    ClosureProgressReporter, OutlierDetector, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate,
};
pub use profiler::DataProfiler;
pub use reporting::{ReportGenerator, RunReport};
pub use types::{
    BinRate, CleaningOutcome, CleaningSummary, ColumnKind, ColumnStats, CorrelationMatrix,
    EdaReport, GroupRate, MissingnessReport, OutlierBounds, OutlierReport, OutlierSummary,
    PipelineResult, TableSchema, ValueCount,
};
pub use utils::load_csv;
