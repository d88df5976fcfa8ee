//! Pipeline module.
//!
//! This module provides the pipeline composing cleaning, outlier detection
//! and profiling, plus its progress reporting.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::OutlierDetector;
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
