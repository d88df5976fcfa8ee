//! Report generation module.
//!
//! Writes the cleaned table, the analysis tables as CSV and a JSON
//! [`RunReport`] into the output directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabclean::reporting::{ReportGenerator, RunReport};
//!
//! let generator = ReportGenerator::new(PathBuf::from("outputs"), None);
//! let written = generator.write_eda_tables(&eda, &outliers)?;
//!
//! let report = RunReport::new(Some(input), original_shape).with_analysis(outliers, eda);
//! generator.write_report_to_file(&report, "eda")?;
//! ```

mod generator;

pub use generator::{
    BINNED_RATE_FILE, CORRELATION_FILE, GROUP_RATE_FILE, MISSINGNESS_FILE, OUTLIERS_FILE,
    ReportGenerator, RunReport, STATS_FILE,
};
