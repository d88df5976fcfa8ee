use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::types::{
    BinRate, CleaningSummary, ColumnStats, CorrelationMatrix, EdaReport, GroupRate,
    MissingnessReport, OutlierSummary,
};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File names of the analysis tables.
pub const STATS_FILE: &str = "basic_stats_numeric.csv";
pub const OUTLIERS_FILE: &str = "outlier_report_iqr.csv";
pub const CORRELATION_FILE: &str = "correlation_matrix.csv";
pub const GROUP_RATE_FILE: &str = "survival_rate_by_sex.csv";
pub const BINNED_RATE_FILE: &str = "survival_rate_by_age_bins.csv";
pub const MISSINGNESS_FILE: &str = "missingness_report.csv";

// ============================================================================
// Run Report
// ============================================================================

/// JSON report of a run, written next to the output tables and printed by
/// the CLI's `--json` mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub input_file: Option<String>,
    /// Path of the cleaned CSV, if written
    pub output_file: Option<String>,
    /// (rows, columns) of the loaded table
    pub original_shape: (usize, usize),
    /// (rows, columns) after cleaning
    pub final_shape: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaning: Option<CleaningSummary>,
    pub outliers: Vec<OutlierSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eda: Option<EdaReport>,
    pub written_files: Vec<String>,
}

impl RunReport {
    /// Start a report for a table of the given shape.
    pub fn new(input_file: Option<&Path>, original_shape: (usize, usize)) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.map(|p| p.display().to_string()),
            output_file: None,
            original_shape,
            final_shape: original_shape,
            cleaning: None,
            outliers: Vec::new(),
            eda: None,
            written_files: Vec::new(),
        }
    }

    pub fn with_cleaning(mut self, summary: CleaningSummary) -> Self {
        self.final_shape = (summary.rows_after, summary.columns_after);
        self.cleaning = Some(summary);
        self
    }

    pub fn with_analysis(mut self, outliers: Vec<OutlierSummary>, eda: EdaReport) -> Self {
        self.outliers = outliers;
        self.eda = Some(eda);
        self
    }

    pub fn with_files(mut self, output_file: Option<&Path>, written: &[PathBuf]) -> Self {
        self.output_file = output_file.map(|p| p.display().to_string());
        self.written_files = written.iter().map(|p| p.display().to_string()).collect();
        self
    }
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes the cleaned table, the analysis tables and the JSON report into
/// an output directory.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self { output_dir, output_name }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Stem of the cleaned CSV and JSON report names.
    pub fn output_stem(&self) -> &str {
        self.output_name.as_deref().unwrap_or("cleaned_dataset")
    }

    /// Write the cleaned table as `<stem>.csv`.
    pub fn write_cleaned_csv(&self, df: &mut DataFrame) -> Result<PathBuf> {
        let path = self.write_csv(&format!("{}.csv", self.output_stem()), df)?;
        info!("Dataset saved: {}", path.display());
        Ok(path)
    }

    /// Write the missingness measured before cleaning, with the counts left
    /// after imputation alongside.
    pub fn write_missingness(
        &self,
        before: &MissingnessReport,
        after: Option<&MissingnessReport>,
    ) -> Result<PathBuf> {
        let mut df = missingness_frame(before, after)?;
        self.write_csv(MISSINGNESS_FILE, &mut df)
    }

    /// Write every analysis table that was computed.
    ///
    /// Returns the paths written, in write order.
    pub fn write_eda_tables(
        &self,
        eda: &EdaReport,
        outliers: &[OutlierSummary],
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        written.push(self.write_csv(STATS_FILE, &mut stats_frame(&eda.stats)?)?);
        written.push(self.write_csv(OUTLIERS_FILE, &mut outliers_frame(outliers)?)?);

        if let Some(matrix) = &eda.correlation {
            written.push(self.write_csv(CORRELATION_FILE, &mut correlation_frame(matrix)?)?);
        }
        if let Some(rates) = &eda.group_rates {
            written.push(self.write_csv(GROUP_RATE_FILE, &mut group_rate_frame(rates)?)?);
        }
        if let Some(bins) = &eda.binned_rates {
            written.push(self.write_csv(BINNED_RATE_FILE, &mut binned_rate_frame(bins)?)?);
        }

        info!("Analysis tables saved to {}", self.output_dir.display());
        Ok(written)
    }

    /// Write a run report to `<base>_report.json`.
    pub fn write_report_to_file(&self, report: &RunReport, report_base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self.output_dir.join(format!("{}_report.json", report_base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }

    fn write_csv(&self, file_name: &str, df: &mut DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .context(format!("Failed to create '{}'", self.output_dir.display()))?;

        let path = self.output_dir.join(file_name);
        let mut file = File::create(&path).context(format!("Failed to create '{}'", path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .context(format!("Failed to write '{}'", path.display()))?;

        debug!("Wrote {} rows to {}", df.height(), path.display());
        Ok(path)
    }
}

// ============================================================================
// Table builders
// ============================================================================

fn missingness_frame(
    before: &MissingnessReport,
    after: Option<&MissingnessReport>,
) -> Result<DataFrame> {
    let columns: Vec<&str> = before.columns.iter().map(|c| c.column.as_str()).collect();
    let counts: Vec<u64> = before.columns.iter().map(|c| c.missing_count as u64).collect();
    let fractions: Vec<f64> = before.columns.iter().map(|c| c.missing_fraction).collect();
    // None for columns dropped during cleaning
    let remaining: Vec<Option<u64>> = before
        .columns
        .iter()
        .map(|c| after.and_then(|a| a.get(&c.column)).map(|a| a.missing_count as u64))
        .collect();

    Ok(DataFrame::new(vec![
        Column::new("column".into(), columns),
        Column::new("missing_count".into(), counts),
        Column::new("missing_fraction".into(), fractions),
        Column::new("missing_after".into(), remaining),
    ])?)
}

fn stats_frame(stats: &[ColumnStats]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new("column".into(), stats.iter().map(|s| s.column.as_str()).collect::<Vec<_>>()),
        Column::new("count".into(), stats.iter().map(|s| s.count as u64).collect::<Vec<_>>()),
        Column::new("mean".into(), stats.iter().map(|s| s.mean).collect::<Vec<_>>()),
        Column::new("median".into(), stats.iter().map(|s| s.median).collect::<Vec<_>>()),
        Column::new("min".into(), stats.iter().map(|s| s.min).collect::<Vec<_>>()),
        Column::new("max".into(), stats.iter().map(|s| s.max).collect::<Vec<_>>()),
    ])?)
}

fn outliers_frame(outliers: &[OutlierSummary]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(outliers.len());
    let mut counts = Vec::with_capacity(outliers.len());
    let mut lower = Vec::with_capacity(outliers.len());
    let mut upper = Vec::with_capacity(outliers.len());
    let mut q1 = Vec::with_capacity(outliers.len());
    let mut q3 = Vec::with_capacity(outliers.len());

    for summary in outliers {
        columns.push(summary.column());
        counts.push(summary.outlier_count() as u64);
        let bounds = match summary {
            OutlierSummary::Detected { bounds, .. } => Some(*bounds),
            OutlierSummary::Skipped { .. } => None,
        };
        q1.push(bounds.map(|b| b.q1));
        q3.push(bounds.map(|b| b.q3));
        lower.push(bounds.map(|b| b.lower));
        upper.push(bounds.map(|b| b.upper));
    }

    Ok(DataFrame::new(vec![
        Column::new("column".into(), columns),
        Column::new("outlier_count".into(), counts),
        Column::new("q1".into(), q1),
        Column::new("q3".into(), q3),
        Column::new("lower_bound".into(), lower),
        Column::new("upper_bound".into(), upper),
    ])?)
}

/// Square correlation table. The row-label column has an empty header so
/// it never collides with a variable name.
fn correlation_frame(matrix: &CorrelationMatrix) -> Result<DataFrame> {
    let mut columns = vec![Column::new("".into(), matrix.columns.clone())];
    for (j, name) in matrix.columns.iter().enumerate() {
        let values: Vec<Option<f64>> = matrix.values.iter().map(|row| row[j]).collect();
        columns.push(Column::new(name.as_str().into(), values));
    }
    Ok(DataFrame::new(columns)?)
}

fn group_rate_frame(rates: &[GroupRate]) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        Column::new("group".into(), rates.iter().map(|r| r.group.as_str()).collect::<Vec<_>>()),
        Column::new("count".into(), rates.iter().map(|r| r.count as u64).collect::<Vec<_>>()),
        Column::new("rate".into(), rates.iter().map(|r| r.rate).collect::<Vec<_>>()),
    ])?)
}

fn binned_rate_frame(bins: &[BinRate]) -> Result<DataFrame> {
    let labels: Vec<String> = bins
        .iter()
        .enumerate()
        .map(|(i, b)| b.label(i == 0))
        .collect();

    Ok(DataFrame::new(vec![
        Column::new("bin".into(), labels),
        Column::new("lower".into(), bins.iter().map(|b| b.lower).collect::<Vec<_>>()),
        Column::new("upper".into(), bins.iter().map(|b| b.upper).collect::<Vec<_>>()),
        Column::new("count".into(), bins.iter().map(|b| b.count as u64).collect::<Vec<_>>()),
        Column::new("rate".into(), bins.iter().map(|b| b.rate).collect::<Vec<_>>()),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutlierBounds, ValueCount};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tabclean_report_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_eda() -> EdaReport {
        EdaReport {
            stats: vec![ColumnStats {
                column: "Age".to_string(),
                count: 3,
                mean: 30.0,
                median: 28.0,
                min: 22.0,
                max: 40.0,
            }],
            value_counts: vec![crate::types::ColumnValueCounts {
                column: "Sex".to_string(),
                counts: vec![ValueCount { value: Some("male".to_string()), count: 2 }],
            }],
            correlation: Some(CorrelationMatrix {
                columns: vec!["Age".to_string(), "Fare".to_string()],
                values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
            }),
            group_rates: Some(vec![GroupRate { group: "female".to_string(), count: 1, rate: 1.0 }]),
            binned_rates: None,
        }
    }

    #[test]
    fn test_write_eda_tables_only_computed() {
        let dir = temp_dir("eda");
        let generator = ReportGenerator::new(dir.clone(), None);
        let outliers = vec![
            OutlierSummary::Detected {
                column: "Fare".to_string(),
                outlier_count: 2,
                bounds: OutlierBounds::from_quartiles(7.9, 31.0),
            },
            OutlierSummary::Skipped {
                column: "Deck".to_string(),
                reason: "insufficient data".to_string(),
            },
        ];

        let written = generator.write_eda_tables(&sample_eda(), &outliers).unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![STATS_FILE, OUTLIERS_FILE, CORRELATION_FILE, GROUP_RATE_FILE]);
        assert!(!dir.join(BINNED_RATE_FILE).exists());

        let outlier_csv = fs::read_to_string(dir.join(OUTLIERS_FILE)).unwrap();
        let mut lines = outlier_csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "column,outlier_count,q1,q3,lower_bound,upper_bound"
        );
        assert!(lines.next().unwrap().starts_with("Fare,2,"));
        assert_eq!(lines.next().unwrap(), "Deck,0,,,,");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_cleaned_csv_uses_output_name() {
        let dir = temp_dir("cleaned");
        let generator = ReportGenerator::new(dir.clone(), Some("titanic_cleaned".to_string()));
        let mut df = df!["Sex" => ["male", "female"], "Age" => [22.0, 38.0]].unwrap();

        let path = generator.write_cleaned_csv(&mut df).unwrap();

        assert_eq!(path, dir.join("titanic_cleaned.csv"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next().unwrap(), "Sex,Age");
        assert_eq!(content.lines().count(), 3);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_missingness_marks_dropped_columns() {
        let dir = temp_dir("missing");
        let generator = ReportGenerator::new(dir.clone(), None);
        let before_df = df![
            "Cabin" => [None, None, Some("C85")],
            "Age" => [Some(22.0), None, Some(26.0)],
        ]
        .unwrap();
        let after_df = df!["Age" => [22.0, 24.0, 26.0]].unwrap();

        let before = MissingnessReport::compute(&before_df);
        let after = MissingnessReport::compute(&after_df);
        let path = generator.write_missingness(&before, Some(&after)).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "column,missing_count,missing_fraction,missing_after");
        assert!(lines[1].starts_with("Cabin,2,"));
        assert!(lines[1].ends_with(','));
        assert!(lines[2].ends_with(",0"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_write_report_to_file() {
        let dir = temp_dir("json");
        let generator = ReportGenerator::new(dir.clone(), None);
        let report = RunReport::new(Some(Path::new("data/titanic.csv")), (891, 12))
            .with_analysis(Vec::new(), sample_eda());

        let path = generator.write_report_to_file(&report, "cleaned_dataset").unwrap();
        assert_eq!(path, dir.join("cleaned_dataset_report.json"));

        let parsed: RunReport = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, report);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_correlation_frame_with_column_named_column() {
        let matrix = CorrelationMatrix {
            columns: vec!["column".to_string(), "Fare".to_string()],
            values: vec![vec![Some(1.0), Some(0.5)], vec![Some(0.5), Some(1.0)]],
        };

        let df = correlation_frame(&matrix).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(
            df.get_column_names().iter().map(|n| n.as_str()).collect::<Vec<_>>(),
            vec!["", "column", "Fare"]
        );
    }

    #[test]
    fn test_binned_rate_frame_labels() {
        let bins = vec![
            BinRate { lower: 0.0, upper: 10.0, count: 2, rate: Some(0.5) },
            BinRate { lower: 10.0, upper: 20.0, count: 0, rate: None },
        ];
        let df = binned_rate_frame(&bins).unwrap();
        let labels: Vec<Option<&str>> = df
            .column("bin")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap().into_iter().collect();
        assert_eq!(labels, vec![Some("[0.00, 10.00]"), Some("(10.00, 20.00]")]);
        assert_eq!(df.column("rate").unwrap().null_count(), 1);
    }
}
