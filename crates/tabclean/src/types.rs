use crate::error::{Result, TabcleanError};
use crate::utils::{is_numeric_dtype, nan_count};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Table Schema
// ============================================================================

/// Semantic kind of a column, fixed once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Imputed with the median, eligible for statistics and outlier detection
    Numeric,
    /// Normalized text, imputed with the mode
    Categorical,
}

/// Declared kind of every column of a table, in table column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    columns: Vec<(String, ColumnKind)>,
}

impl TableSchema {
    /// Build a schema where `text_columns` are categorical and every other
    /// column of `df` is numeric.
    ///
    /// Fails with `InvalidInput` if a text column is not in the table.
    pub fn from_text_columns<S: AsRef<str>>(df: &DataFrame, text_columns: &[S]) -> Result<Self> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let text: HashSet<&str> = text_columns.iter().map(AsRef::as_ref).collect();
        if let Some(unknown) = text.iter().find(|t| !names.iter().any(|n| n == **t)) {
            return Err(TabcleanError::InvalidInput(format!(
                "text column '{}' is not present in the table",
                unknown
            )));
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let kind = if text.contains(name.as_str()) {
                    ColumnKind::Categorical
                } else {
                    ColumnKind::Numeric
                };
                (name, kind)
            })
            .collect();

        Ok(Self { columns })
    }

    /// Infer the schema once from the loaded dtypes.
    ///
    /// Numeric dtypes become [`ColumnKind::Numeric`], everything else
    /// (strings, categoricals, booleans, dates) is treated as categorical.
    pub fn infer(df: &DataFrame) -> Self {
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                let kind = if is_numeric_dtype(col.dtype()) {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Categorical
                };
                (col.name().to_string(), kind)
            })
            .collect();

        Self { columns }
    }

    /// Kind of the given column, if the schema knows it.
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, kind)| *kind)
    }

    /// Iterate over `(name, kind)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Names of the columns of the given kind, in column order.
    pub fn columns_of(&self, kind: ColumnKind) -> Vec<String> {
        self.iter()
            .filter(|(_, k)| *k == kind)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Schema restricted to the columns still present in `df`.
    pub fn retain_present(&self, df: &DataFrame) -> Self {
        let present: HashSet<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self {
            columns: self
                .columns
                .iter()
                .filter(|(name, _)| present.contains(name))
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Missingness
// ============================================================================

/// Missing-value count and fraction of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissingness {
    pub column: String,
    pub missing_count: usize,
    /// Fraction in 0.0 - 1.0; 0.0 for a table without rows.
    pub missing_fraction: f64,
}

/// Missingness of every column of a table, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MissingnessReport {
    pub columns: Vec<ColumnMissingness>,
}

impl MissingnessReport {
    /// Compute the report for every column of `df`.
    pub fn compute(df: &DataFrame) -> Self {
        let rows = df.height();
        let columns = df
            .get_columns()
            .iter()
            .map(|col| {
                let missing_count =
                    col.null_count() + nan_count(col.as_materialized_series());
                let missing_fraction = if rows > 0 {
                    missing_count as f64 / rows as f64
                } else {
                    0.0
                };
                ColumnMissingness {
                    column: col.name().to_string(),
                    missing_count,
                    missing_fraction,
                }
            })
            .collect();

        Self { columns }
    }

    /// Entry for the given column.
    pub fn get(&self, column: &str) -> Option<&ColumnMissingness> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Entries with at least one missing value, most missing first.
    pub fn with_missing(&self) -> Vec<&ColumnMissingness> {
        let mut entries: Vec<&ColumnMissingness> =
            self.columns.iter().filter(|c| c.missing_count > 0).collect();
        entries.sort_by(|a, b| b.missing_count.cmp(&a.missing_count));
        entries
    }

    /// Total number of missing cells.
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count).sum()
    }
}

// ============================================================================
// Cleaning results
// ============================================================================

/// How a column's missing values were filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Imputation {
    Median { value: f64 },
    Mode { value: String },
}

impl Imputation {
    /// Short description used in cleaning actions, e.g. `median (28.00)`.
    pub fn describe(&self) -> String {
        match self {
            Self::Median { value } => format!("median ({:.2})", value),
            Self::Mode { value } => format!("mode ('{}')", value),
        }
    }
}

/// Record of one imputed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationRecord {
    pub column: String,
    pub filled: usize,
    #[serde(flatten)]
    pub imputation: Imputation,
}

/// Serializable summary of a cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub duplicates_removed: usize,
    pub dropped_columns: Vec<String>,
    pub imputations: Vec<ImputationRecord>,
    pub missing_before: MissingnessReport,
    pub missing_after: MissingnessReport,
    pub actions: Vec<String>,
}

/// Everything produced by [`crate::cleaner::TabularCleaner::run`].
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub table: DataFrame,
    pub schema: TableSchema,
    pub summary: CleaningSummary,
}

// ============================================================================
// Statistics and outliers
// ============================================================================

/// Descriptive statistics of a numeric column over its observed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// IQR-derived bounds of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Multiplier of the IQR applied on both sides.
    pub const IQR_FACTOR: f64 = 1.5;

    pub fn from_quartiles(q1: f64, q3: f64) -> Self {
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            iqr,
            lower: q1 - Self::IQR_FACTOR * iqr,
            upper: q3 + Self::IQR_FACTOR * iqr,
        }
    }

    /// Strictly outside the bounds.
    #[inline]
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// A flagged value and its row index in the input column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlaggedValue {
    pub index: usize,
    pub value: f64,
}

/// Result of running the detector on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub bounds: OutlierBounds,
    pub flagged: Vec<FlaggedValue>,
}

impl OutlierReport {
    pub fn count(&self) -> usize {
        self.flagged.len()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.flagged.iter().map(|f| f.index).collect()
    }
}

/// Per-column outcome of a table-wide outlier scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutlierSummary {
    Detected {
        column: String,
        outlier_count: usize,
        bounds: OutlierBounds,
    },
    Skipped {
        column: String,
        reason: String,
    },
}

impl OutlierSummary {
    pub fn column(&self) -> &str {
        match self {
            Self::Detected { column, .. } | Self::Skipped { column, .. } => column,
        }
    }

    /// Outlier count, 0 for skipped columns.
    pub fn outlier_count(&self) -> usize {
        match self {
            Self::Detected { outlier_count, .. } => *outlier_count,
            Self::Skipped { .. } => 0,
        }
    }
}

// ============================================================================
// Exploratory analysis tables
// ============================================================================

/// Occurrences of one value of a column; `value` is None for the missing
/// bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: Option<String>,
    pub count: usize,
}

/// Top value counts of a categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValueCounts {
    pub column: String,
    pub counts: Vec<ValueCount>,
}

/// Square Pearson correlation matrix; None where undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation between two columns of the matrix.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Mean of the rate column within one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRate {
    pub group: String,
    pub count: usize,
    pub rate: f64,
}

/// Mean of the rate column within one equal-width bin.
///
/// The first bin is `[lower, upper]`, every other bin `(lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinRate {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    /// None for an empty bin.
    pub rate: Option<f64>,
}

impl BinRate {
    /// Interval label such as `(20.32, 28.31]`.
    pub fn label(&self, first: bool) -> String {
        let open = if first { '[' } else { '(' };
        format!("{}{:.2}, {:.2}]", open, self.lower, self.upper)
    }
}

/// Every table produced by [`crate::profiler::DataProfiler::profile`].
///
/// Analyses whose columns are absent or not computable are None.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdaReport {
    pub stats: Vec<ColumnStats>,
    pub value_counts: Vec<ColumnValueCounts>,
    pub correlation: Option<CorrelationMatrix>,
    pub group_rates: Option<Vec<GroupRate>>,
    pub binned_rates: Option<Vec<BinRate>>,
}

// ============================================================================
// Pipeline result
// ============================================================================

/// Everything produced by [`crate::pipeline::Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub cleaning: CleaningOutcome,
    pub outliers: Vec<OutlierSummary>,
    pub eda: EdaReport,
    /// Files written to the output directory; empty when saving is disabled.
    pub written_files: Vec<std::path::PathBuf>,
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn table(&self) -> &DataFrame {
        &self.cleaning.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_from_text_columns() {
        let df = df![
            "Age" => [Some(22.0), None],
            "Sex" => ["male", "female"],
            "Pclass" => [3i64, 1],
        ]
        .unwrap();

        let schema = TableSchema::from_text_columns(&df, &["Sex", "Pclass"]).unwrap();
        assert_eq!(schema.kind_of("Age"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("Sex"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("Pclass"), Some(ColumnKind::Categorical));
        assert_eq!(schema.columns_of(ColumnKind::Numeric), vec!["Age".to_string()]);
    }

    #[test]
    fn test_schema_unknown_text_column() {
        let df = df!["Age" => [22.0]].unwrap();
        let result = TableSchema::from_text_columns(&df, &["Cabin"]);
        assert!(matches!(result.unwrap_err(), TabcleanError::InvalidInput(_)));
    }

    #[test]
    fn test_schema_infer() {
        let df = df![
            "Fare" => [7.25, 71.28],
            "Name" => ["Braund", "Cumings"],
            "SibSp" => [1i64, 0],
        ]
        .unwrap();

        let schema = TableSchema::infer(&df);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.kind_of("Fare"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("Name"), Some(ColumnKind::Categorical));
        assert_eq!(schema.kind_of("SibSp"), Some(ColumnKind::Numeric));
    }

    #[test]
    fn test_missingness_report() {
        let df = df![
            "Cabin" => [None, None, None, Some("C85")],
            "Age" => [Some(22.0), None, Some(26.0), Some(35.0)],
            "Fare" => [7.25, 71.28, 7.92, 53.1],
        ]
        .unwrap();

        let report = MissingnessReport::compute(&df);
        assert_eq!(report.columns.len(), 3);
        assert_eq!(report.get("Cabin").unwrap().missing_count, 3);
        assert_eq!(report.get("Cabin").unwrap().missing_fraction, 0.75);
        assert_eq!(report.get("Fare").unwrap().missing_count, 0);
        assert_eq!(report.total_missing(), 4);

        let missing: Vec<&str> = report.with_missing().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(missing, vec!["Cabin", "Age"]);
    }

    #[test]
    fn test_missingness_report_counts_nan() {
        let df = df!["Age" => [Some(22.0), Some(f64::NAN), None, Some(35.0)]].unwrap();
        let report = MissingnessReport::compute(&df);
        assert_eq!(report.get("Age").unwrap().missing_count, 2);
        assert_eq!(report.get("Age").unwrap().missing_fraction, 0.5);
    }

    #[test]
    fn test_missingness_report_zero_rows() {
        let df = df!["Age" => Vec::<f64>::new()].unwrap();
        let report = MissingnessReport::compute(&df);
        assert_eq!(report.get("Age").unwrap().missing_fraction, 0.0);
    }

    #[test]
    fn test_outlier_bounds() {
        let bounds = OutlierBounds::from_quartiles(2.0, 4.5);
        assert_eq!(bounds.iqr, 2.5);
        assert_eq!(bounds.lower, -1.75);
        assert_eq!(bounds.upper, 8.25);
        assert!(bounds.is_outlier(100.0));
        assert!(!bounds.is_outlier(8.25));
        assert!(!bounds.is_outlier(-1.75));
    }

    #[test]
    fn test_correlation_matrix_get() {
        let matrix = CorrelationMatrix {
            columns: vec!["Age".to_string(), "Fare".to_string()],
            values: vec![vec![Some(1.0), Some(0.1)], vec![Some(0.1), Some(1.0)]],
        };
        assert_eq!(matrix.get("Fare", "Age"), Some(0.1));
        assert_eq!(matrix.get("Age", "Pclass"), None);
    }

    #[test]
    fn test_bin_rate_label() {
        let bin = BinRate { lower: 0.42, upper: 8.38, count: 3, rate: Some(0.5) };
        assert_eq!(bin.label(true), "[0.42, 8.38]");
        assert_eq!(bin.label(false), "(0.42, 8.38]");
    }

    #[test]
    fn test_imputation_describe() {
        assert_eq!(Imputation::Median { value: 28.0 }.describe(), "median (28.00)");
        assert_eq!(Imputation::Mode { value: "s".into() }.describe(), "mode ('s')");
    }
}
