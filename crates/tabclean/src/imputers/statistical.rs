//! Statistical imputation methods.
//!
//! Provides median imputation for numeric columns and mode imputation for
//! categorical columns.

use crate::error::{Result, TabcleanError};
use crate::types::{ColumnKind, Imputation, ImputationRecord};
use crate::profiler::statistics;
use crate::utils::{fill_numeric_nulls, fill_string_nulls, nan_count, numeric_values, string_mode};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fail with `EmptyColumn` if the column has missing values but no
    /// observed value to compute a fill value from.
    pub fn ensure_imputable(series: &Series) -> Result<()> {
        let missing = series.null_count() + nan_count(series);
        if missing > 0 && missing == series.len() {
            return Err(TabcleanError::EmptyColumn(series.name().to_string()));
        }
        Ok(())
    }

    /// Fill the missing values of a column according to its kind.
    ///
    /// Returns `None` when the column has nothing to fill.
    pub fn impute_column(
        df: &mut DataFrame,
        col_name: &str,
        kind: ColumnKind,
    ) -> Result<Option<ImputationRecord>> {
        match kind {
            ColumnKind::Numeric => Self::apply_numeric_median(df, col_name),
            ColumnKind::Categorical => Self::apply_mode_imputation(df, col_name),
        }
    }

    /// Apply median imputation for numeric columns.
    ///
    /// The median is taken over the non-missing values, NaN counting as
    /// missing; the column becomes Float64.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
    ) -> Result<Option<ImputationRecord>> {
        let series = df.column(col_name)?.as_materialized_series();
        let values = numeric_values(series)?;
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let filled = values.len() - observed.len();
        if filled == 0 {
            return Ok(None);
        }

        let median = statistics::median(&observed)
            .ok_or_else(|| TabcleanError::EmptyColumn(col_name.to_string()))?;
        let imputed = fill_numeric_nulls(series, median)?;
        df.replace(col_name, imputed)?;

        debug!("Filled {} values in '{}' with median {:.2}", filled, col_name, median);
        Ok(Some(ImputationRecord {
            column: col_name.to_string(),
            filled,
            imputation: Imputation::Median { value: median },
        }))
    }

    /// Apply mode imputation for categorical columns.
    ///
    /// Ties between equally frequent values go to the one seen first.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
    ) -> Result<Option<ImputationRecord>> {
        let series = df.column(col_name)?.as_materialized_series();
        let filled = series.null_count();
        if filled == 0 {
            return Ok(None);
        }
        Self::ensure_imputable(series)?;

        let mode = string_mode(series)?
            .ok_or_else(|| TabcleanError::EmptyColumn(col_name.to_string()))?;
        let imputed = fill_string_nulls(series, &mode)?;
        df.replace(col_name, imputed)?;

        debug!("Filled {} values in '{}' with mode '{}'", filled, col_name, mode);
        Ok(Some(ImputationRecord {
            column: col_name.to_string(),
            filled,
            imputation: Imputation::Mode { value: mode },
        }))
    }
}
