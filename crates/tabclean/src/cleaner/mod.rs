//! Data cleaning module for preprocessing tables.
//!
//! This module provides functionality for:
//! - Removing duplicate rows
//! - Normalizing text columns (trim, casing, blank values)
//! - Measuring missingness and dropping columns above a threshold
//! - Imputing the remaining missing values

mod sanitizers;

use crate::config::CleanerConfig;
use crate::error::{Result, TabcleanError};
use crate::imputers::StatisticalImputer;
use crate::types::{CleaningOutcome, CleaningSummary, ColumnKind, MissingnessReport, TableSchema};
use polars::prelude::*;
use tracing::{debug, info};

/// Cleaner applying the fixed sequence of cleaning steps to a table.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::TabularCleaner;
///
/// let (cleaned, missingness) = TabularCleaner::clean(df, 0.5, &["Sex"])?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TabularCleaner {
    config: CleanerConfig,
}

impl TabularCleaner {
    /// Create a cleaner from a validated configuration.
    pub fn new(config: CleanerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Wrap a configuration that was already validated as part of a
    /// [`crate::config::PipelineConfig`].
    pub(crate) fn from_validated(config: CleanerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    /// Clean `table` with the default casing policy.
    ///
    /// `text_columns` are categorical, every other column is numeric.
    /// Returns the cleaned table and the missingness measured before any
    /// column was dropped or imputed.
    pub fn clean<S: AsRef<str>>(
        table: DataFrame,
        drop_threshold: f64,
        text_columns: &[S],
    ) -> Result<(DataFrame, MissingnessReport)> {
        let config = CleanerConfig {
            drop_threshold,
            text_columns: Some(text_columns.iter().map(|c| c.as_ref().to_string()).collect()),
            ..CleanerConfig::default()
        };
        let outcome = Self::new(config)?.run(table)?;
        Ok((outcome.table, outcome.summary.missing_before))
    }

    /// Run every cleaning step, resolving the schema from the configured
    /// text columns or from the loaded dtypes.
    pub fn run(&self, table: DataFrame) -> Result<CleaningOutcome> {
        ensure_has_columns(&table)?;
        let schema = match &self.config.text_columns {
            Some(columns) => TableSchema::from_text_columns(&table, columns)?,
            None => TableSchema::infer(&table),
        };
        self.run_with_schema(table, schema)
    }

    /// Run every cleaning step with an explicit schema.
    ///
    /// Every column of `table` must have a declared kind.
    pub fn run_with_schema(&self, table: DataFrame, schema: TableSchema) -> Result<CleaningOutcome> {
        ensure_has_columns(&table)?;
        if let Some(undeclared) = table
            .get_column_names()
            .into_iter()
            .find(|name| schema.kind_of(name.as_str()).is_none())
        {
            return Err(TabcleanError::InvalidInput(format!(
                "column '{}' has no declared kind",
                undeclared
            )));
        }

        let rows_before = table.height();
        let columns_before = table.width();
        let mut actions = Vec::new();

        info!(
            "Cleaning table with {} rows and {} columns...",
            rows_before, columns_before
        );

        // 1. Remove duplicate rows
        let df = table
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        let duplicates_removed = rows_before - df.height();
        if duplicates_removed > 0 {
            let pct = (duplicates_removed as f64 / rows_before as f64) * 100.0;
            actions.push(format!(
                "Removed {} duplicate rows ({:.1}%)",
                duplicates_removed, pct
            ));
            debug!("Removed {} duplicate rows", duplicates_removed);
        } else {
            actions.push("No duplicate rows found".to_string());
        }

        // 2. Normalize text and coerce numeric columns
        let df = sanitizers::normalize_text_columns(df, &schema, &self.config)?;
        let df = sanitizers::coerce_numeric_columns(df, &schema)?;
        let (df, nans) = sanitizers::nan_to_missing(df)?;
        if nans > 0 {
            actions.push(format!("Marked {} NaN values as missing", nans));
        }
        let text_count = schema.iter().filter(|(_, k)| *k == ColumnKind::Categorical).count();
        if text_count > 0 {
            actions.push(format!("Normalized {} text columns", text_count));
        }

        // 3. Missingness before dropping or imputing
        let missing_before = MissingnessReport::compute(&df);

        // 4. Drop columns above the threshold
        let threshold = self.config.drop_threshold;
        let dropped_columns: Vec<String> = missing_before
            .columns
            .iter()
            .filter(|c| c.missing_fraction > threshold)
            .map(|c| c.column.clone())
            .collect();

        let mut df = df;
        if !dropped_columns.is_empty() {
            let to_drop: Vec<PlSmallStr> = dropped_columns.iter().map(|s| s.as_str().into()).collect();
            df = df.drop_many(to_drop);
            actions.push(format!(
                "Removed {} columns with >{:.0}% missing values: {:?}",
                dropped_columns.len(),
                threshold * 100.0,
                dropped_columns
            ));
            debug!("Dropped columns {:?}", dropped_columns);
        } else {
            actions.push(format!(
                "No columns with >{:.0}% missing values found",
                threshold * 100.0
            ));
        }
        let schema = schema.retain_present(&df);

        // 5. Nothing is imputed while any retained column is entirely missing
        for (col_name, _) in schema.iter() {
            StatisticalImputer::ensure_imputable(df.column(col_name)?.as_materialized_series())?;
        }

        // 6. Impute
        let mut imputations = Vec::new();
        for (col_name, kind) in schema.iter() {
            if let Some(record) = StatisticalImputer::impute_column(&mut df, col_name, kind)? {
                actions.push(format!(
                    "Imputed {} missing values in '{}' with {}",
                    record.filled,
                    col_name,
                    record.imputation.describe()
                ));
                imputations.push(record);
            }
        }
        if imputations.is_empty() {
            actions.push("No missing values to impute".to_string());
        }

        let missing_after = MissingnessReport::compute(&df);
        info!(
            "Cleaning complete: {} rows, {} columns ({} dropped, {} imputed)",
            df.height(),
            df.width(),
            dropped_columns.len(),
            imputations.len()
        );

        let summary = CleaningSummary {
            rows_before,
            rows_after: df.height(),
            columns_before,
            columns_after: df.width(),
            duplicates_removed,
            dropped_columns,
            imputations,
            missing_before,
            missing_after,
            actions,
        };

        Ok(CleaningOutcome {
            table: df,
            schema,
            summary,
        })
    }
}

fn ensure_has_columns(table: &DataFrame) -> Result<()> {
    if table.width() == 0 {
        return Err(TabcleanError::InvalidInput(
            "table has no columns".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CasePolicy;
    use crate::types::Imputation;
    use pretty_assertions::assert_eq;

    fn titanic_like() -> DataFrame {
        df![
            "Age" => [Some(22.0), None, Some(38.0), None, Some(35.0)],
            "Sex" => ["male", "female", "male", "Male ", " female"],
        ]
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_clean_imputes_median_and_normalizes_text() {
        let (cleaned, report) = TabularCleaner::clean(titanic_like(), 0.5, &["Sex"]).unwrap();

        let ages: Vec<Option<f64>> = cleaned
            .column("Age")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            ages,
            vec![Some(22.0), Some(35.0), Some(38.0), Some(35.0), Some(35.0)]
        );
        assert_eq!(
            strings(&cleaned, "Sex"),
            ["male", "female", "male", "male", "female"]
                .iter()
                .map(|s| Some(s.to_string()))
                .collect::<Vec<_>>()
        );
        assert_eq!(report.get("Age").unwrap().missing_count, 2);
        assert_eq!(report.get("Age").unwrap().missing_fraction, 0.4);
        assert_eq!(report.get("Sex").unwrap().missing_count, 0);
    }

    #[test]
    fn test_clean_removes_duplicates_keeping_order() {
        let df = df![
            "Fare" => [Some(7.25), Some(71.28), Some(7.25), None, None],
            "Embarked" => [Some("S"), Some("C"), Some("S"), Some("Q"), Some("Q")],
        ]
        .unwrap();

        let outcome = TabularCleaner::new(CleanerConfig::default())
            .unwrap()
            .run(df)
            .unwrap();

        assert_eq!(outcome.summary.duplicates_removed, 2);
        assert_eq!(outcome.table.height(), 3);
        assert_eq!(
            strings(&outcome.table, "Embarked"),
            vec![Some("s".to_string()), Some("c".to_string()), Some("q".to_string())]
        );
    }

    #[test]
    fn test_clean_is_idempotent() {
        let df = df![
            "Age" => [Some(22.0), None, Some(22.0), Some(54.0)],
            "Sex" => [Some("Male"), Some("female"), Some("Male"), None],
        ]
        .unwrap();

        let (once, _) = TabularCleaner::clean(df, 0.6, &["Sex"]).unwrap();
        let (twice, report) = TabularCleaner::clean(once.clone(), 0.6, &["Sex"]).unwrap();

        assert!(once.equals_missing(&twice));
        assert_eq!(report.total_missing(), 0);
    }

    #[test]
    fn test_clean_leaves_no_missing_values() {
        let df = df![
            "Age" => [Some(22.0), None, Some(26.0), Some(35.0)],
            "Embarked" => [Some("S"), Some(" "), None, Some("S")],
            "Fare" => [Some(7.25), Some(71.28), None, Some(53.1)],
        ]
        .unwrap();

        let outcome = TabularCleaner::new(CleanerConfig::default())
            .unwrap()
            .run(df)
            .unwrap();

        assert_eq!(outcome.summary.missing_after.total_missing(), 0);
        for col in outcome.table.get_columns() {
            assert_eq!(col.null_count(), 0, "column {}", col.name());
        }
        // the blank Embarked value counts as missing before imputation
        assert_eq!(
            outcome.summary.missing_before.get("Embarked").unwrap().missing_count,
            2
        );
    }

    #[test]
    fn test_clean_drops_sparse_column_but_reports_it() {
        let mut cabin: Vec<Option<&str>> = vec![None; 20];
        cabin[0] = Some("C85");
        let df = df![
            "Cabin" => cabin,
            "Pclass" => (0..20i64).map(|i| i % 3 + 1).collect::<Vec<_>>(),
        ]
        .unwrap();

        let (cleaned, report) = TabularCleaner::clean(df, 0.5, &["Cabin"]).unwrap();

        assert!(cleaned.column("Cabin").is_err());
        assert_eq!(cleaned.width(), 1);
        assert_eq!(report.get("Cabin").unwrap().missing_fraction, 0.95);
    }

    #[test]
    fn test_clean_all_missing_column_kept_by_threshold() {
        let df = df![
            "Deck" => [Option::<&str>::None, None, None],
            "Fare" => [1.0, 2.0, 3.0],
        ]
        .unwrap();

        let err = TabularCleaner::clean(df, 1.0, &["Deck"]).unwrap_err();
        assert!(matches!(err, TabcleanError::EmptyColumn(ref col) if col == "Deck"));
    }

    #[test]
    fn test_clean_rejects_invalid_input() {
        let err = TabularCleaner::clean(DataFrame::empty(), 0.5, &["Sex"]).unwrap_err();
        assert!(matches!(err, TabcleanError::InvalidInput(_)));

        let err = TabularCleaner::clean(titanic_like(), 1.5, &["Sex"]).unwrap_err();
        assert!(matches!(err, TabcleanError::InvalidInput(_)));

        let err = TabularCleaner::clean(titanic_like(), 0.5, &["Cabin"]).unwrap_err();
        assert!(matches!(err, TabcleanError::InvalidInput(_)));
    }

    #[test]
    fn test_run_applies_case_override() {
        let df = df![
            "Ticket" => ["a/5 21171", " pc 17599"],
            "Sex" => ["Male", "FEMALE"],
        ]
        .unwrap();
        let mut config = CleanerConfig::default();
        config.case_overrides.insert("Ticket".to_string(), CasePolicy::Upper);

        let outcome = TabularCleaner::new(config).unwrap().run(df).unwrap();

        assert_eq!(
            strings(&outcome.table, "Ticket"),
            vec![Some("A/5 21171".to_string()), Some("PC 17599".to_string())]
        );
        assert_eq!(
            strings(&outcome.table, "Sex"),
            vec![Some("male".to_string()), Some("female".to_string())]
        );
    }

    #[test]
    fn test_run_records_imputations() {
        let df = df![
            "Age" => [Some(1.0), None, Some(3.0)],
            "Embarked" => [Some("S"), None, Some("C")],
        ]
        .unwrap();

        let outcome = TabularCleaner::new(CleanerConfig::default())
            .unwrap()
            .run(df)
            .unwrap();

        let imputations = &outcome.summary.imputations;
        assert_eq!(imputations.len(), 2);
        assert_eq!(imputations[0].imputation, Imputation::Median { value: 2.0 });
        assert_eq!(
            imputations[1].imputation,
            Imputation::Mode { value: "s".to_string() }
        );
        assert_eq!(outcome.schema.kind_of("Embarked"), Some(ColumnKind::Categorical));
    }

    #[test]
    fn test_clean_treats_nan_as_missing() {
        let df = df!["Age" => [Some(22.0), Some(f64::NAN), Some(38.0), None, Some(35.0)]].unwrap();

        let (cleaned, report) = TabularCleaner::clean(df, 0.5, &Vec::<&str>::new()).unwrap();

        assert_eq!(report.get("Age").unwrap().missing_count, 2);
        let ages: Vec<Option<f64>> = cleaned
            .column("Age")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            ages,
            vec![Some(22.0), Some(35.0), Some(38.0), Some(35.0), Some(35.0)]
        );
    }

    #[test]
    fn test_clean_imputes_mode_of_normalized_values() {
        let df = df!["Color" => [Some("Red"), Some(" red"), Some("RED"), Some("Blue"), None]].unwrap();

        let (cleaned, report) = TabularCleaner::clean(df, 0.5, &["Color"]).unwrap();

        // "red" occurs 3 times once casing and whitespace are normalized
        assert_eq!(report.get("Color").unwrap().missing_count, 1);
        assert_eq!(
            strings(&cleaned, "Color"),
            vec![
                Some("red".to_string()),
                Some("red".to_string()),
                Some("red".to_string()),
                Some("blue".to_string()),
                Some("red".to_string()),
            ]
        );
    }

    #[test]
    fn test_run_with_schema_requires_every_column() {
        let df = titanic_like();
        let schema = TableSchema::from_text_columns(&df.select(["Sex"]).unwrap(), &["Sex"]).unwrap();

        let err = TabularCleaner::default().run_with_schema(df, schema).unwrap_err();
        assert!(matches!(err, TabcleanError::InvalidInput(ref msg) if msg.contains("Age")));
    }
}
