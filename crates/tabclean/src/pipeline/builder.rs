//! Main pipeline module.
//!
//! This module provides the `Pipeline` struct and builder composing the
//! cleaner, the outlier detector, the profiler and the report generator.

use crate::cleaner::TabularCleaner;
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::pipeline::outliers::OutlierDetector;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::DataProfiler;
use crate::reporting::{ReportGenerator, RunReport};
use crate::types::{CleaningOutcome, EdaReport, OutlierSummary, PipelineResult};
use crate::utils::load_csv;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// The cleaning and analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::{Pipeline, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .drop_threshold(0.6)
///     .output_dir("outputs")
///     .build()?;
///
/// let result = Pipeline::builder()
///     .config(config)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run(dataframe)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: TabularCleaner,
    reporter: ReportGenerator,
}

// Pipeline can be moved to another thread
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Clean, scan for outliers and profile a table.
    ///
    /// Fails fast: the first error aborts the run and no partial result is
    /// returned.
    pub fn run(&self, df: DataFrame) -> Result<PipelineResult> {
        self.run_reported(df, None)
    }

    /// Load a CSV file and run the pipeline on it.
    ///
    /// The input path is recorded in the JSON report.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<PipelineResult> {
        let path = path.as_ref();
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            format!("Loading {}", path.display()),
        ));
        let outcome = load_csv(path).and_then(|df| self.run_internal(df, Some(path)));
        self.finish(outcome)
    }

    fn run_reported(&self, df: DataFrame, input: Option<&Path>) -> Result<PipelineResult> {
        self.finish(self.run_internal(df, input))
    }

    /// Send the final progress update for a run.
    fn finish(&self, outcome: Result<PipelineResult>) -> Result<PipelineResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_internal(&self, df: DataFrame, input: Option<&Path>) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let original_shape = df.shape();

        info!("Starting pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            1.0,
            format!("Loaded table with {} rows and {} columns", original_shape.0, original_shape.1),
        ));

        // Step 1: Cleaning
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            0.0,
            "Cleaning table...",
        ));
        info!("Step 1: Cleaning table...");
        let cleaning = self
            .cleaner
            .run(df)
            .context("Cleaning failed")?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Cleaning,
            1.0,
            format!(
                "Cleaning complete: {} duplicates removed, {} columns dropped",
                cleaning.summary.duplicates_removed,
                cleaning.summary.dropped_columns.len()
            ),
        ));

        // Step 2: Outlier detection
        self.report_progress(ProgressUpdate::new(
            PipelineStage::OutlierDetection,
            0.0,
            "Detecting outliers...",
        ));
        info!("Step 2: Detecting outliers...");
        let outliers = OutlierDetector::detect_all(&cleaning.table, &cleaning.schema)
            .context("Outlier detection failed")?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::OutlierDetection,
            1.0,
            format!(
                "Outlier detection complete: {} values flagged",
                outliers.iter().map(OutlierSummary::outlier_count).sum::<usize>()
            ),
        ));

        // Step 3: Profiling
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Profiling,
            0.0,
            "Profiling cleaned table...",
        ));
        info!("Step 3: Profiling cleaned table...");
        let eda = DataProfiler::profile(&cleaning.table, &cleaning.schema, &self.config.eda)
            .context("Profiling failed")?;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Profiling,
            1.0,
            "Profiling complete",
        ));

        // Step 4: Reports
        let written_files = if self.config.save_to_disk {
            self.report_progress(ProgressUpdate::new(
                PipelineStage::ReportGeneration,
                0.0,
                "Writing reports...",
            ));
            info!("Step 4: Writing reports...");
            let written = self.write_outputs(&cleaning, &outliers, &eda, input, original_shape)?;
            self.report_progress(ProgressUpdate::new(
                PipelineStage::ReportGeneration,
                1.0,
                format!("Wrote {} files", written.len()),
            ));
            written
        } else {
            info!("Step 4: Skipping reports (save_to_disk disabled)");
            Vec::new()
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;
        info!("Pipeline finished in {} ms", duration_ms);

        Ok(PipelineResult {
            cleaning,
            outliers,
            eda,
            written_files,
            duration_ms,
        })
    }

    fn write_outputs(
        &self,
        cleaning: &CleaningOutcome,
        outliers: &[OutlierSummary],
        eda: &EdaReport,
        input: Option<&Path>,
        original_shape: (usize, usize),
    ) -> Result<Vec<PathBuf>> {
        let mut table = cleaning.table.clone();
        let cleaned_path = self.reporter.write_cleaned_csv(&mut table)?;

        let mut written = vec![cleaned_path.clone()];
        written.push(self.reporter.write_missingness(
            &cleaning.summary.missing_before,
            Some(&cleaning.summary.missing_after),
        )?);
        written.extend(self.reporter.write_eda_tables(eda, outliers)?);

        let report = RunReport::new(input, original_shape)
            .with_cleaning(cleaning.summary.clone())
            .with_analysis(outliers.to_vec(), eda.clone())
            .with_files(Some(&cleaned_path), &written);
        written.push(
            self.reporter
                .write_report_to_file(&report, self.reporter.output_stem())?,
        );

        Ok(written)
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let reporter = ReportGenerator::from_config(&config);
        let cleaner = TabularCleaner::from_validated(config.cleaner.clone());

        Ok(Pipeline {
            config,
            progress_reporter: self.progress_reporter,
            cleaner,
            reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TabcleanError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn in_memory() -> PipelineConfig {
        PipelineConfig::builder().save_to_disk(false).build().unwrap()
    }

    fn passengers() -> DataFrame {
        df![
            "Survived" => [0i64, 1, 1, 1, 0, 0, 0, 1],
            "Sex" => ["male", "female", "Female ", "female", "male", "male", " MALE", "female"],
            "Age" => [Some(22.0), Some(38.0), Some(26.0), None, Some(35.0), None, Some(54.0), Some(2.0)],
            "Fare" => [7.25, 71.28, 7.92, 53.1, 8.05, 8.46, 51.86, 21.07],
        ]
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.progress_reporter.is_none());
        assert_eq!(pipeline.config.cleaner.drop_threshold, 0.6);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.cleaner.drop_threshold = 2.0;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_progress_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |_update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        pipeline.report_progress(ProgressUpdate::new(PipelineStage::Profiling, 0.5, "Test"));

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_in_memory() {
        let pipeline = Pipeline::builder().config(in_memory()).build().unwrap();
        let result = pipeline.run(passengers()).unwrap();

        assert_eq!(result.table().height(), 8);
        assert_eq!(result.cleaning.summary.missing_after.total_missing(), 0);
        assert!(result.written_files.is_empty());
        assert_eq!(result.outliers.len(), 3);

        let rates = result.eda.group_rates.unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].group, "female");
        assert_eq!(rates[0].rate, 1.0);
    }

    #[test]
    fn test_run_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let sink = stages.clone();
        let pipeline = Pipeline::builder()
            .config(in_memory())
            .on_progress(move |update| sink.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        pipeline.run(passengers()).unwrap();

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                PipelineStage::Initializing,
                PipelineStage::Cleaning,
                PipelineStage::OutlierDetection,
                PipelineStage::Profiling,
                PipelineStage::Complete,
            ]
        );
    }

    #[test]
    fn test_run_fails_fast() {
        let failed = Arc::new(AtomicUsize::new(0));
        let failed_clone = failed.clone();
        let pipeline = Pipeline::builder()
            .config(
                PipelineConfig::builder()
                    .drop_threshold(1.0)
                    .save_to_disk(false)
                    .build()
                    .unwrap(),
            )
            .on_progress(move |update| {
                if update.stage == PipelineStage::Failed {
                    failed_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        let df = df![
            "Deck" => [Option::<&str>::None, None, None, None],
            "Fare" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap();

        let err = pipeline.run(df).unwrap_err();
        assert!(matches!(err.root(), TabcleanError::EmptyColumn(_)));
        assert_eq!(err.error_code(), "EMPTY_COLUMN");
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_file_reports_load_failure() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = stages.clone();
        let pipeline = Pipeline::builder()
            .config(in_memory())
            .on_progress(move |update| seen.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let err = pipeline
            .run_file(std::env::temp_dir().join("tabclean_missing_input.csv"))
            .unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert_eq!(
            *stages.lock().unwrap(),
            vec![PipelineStage::Initializing, PipelineStage::Failed]
        );
    }
}
