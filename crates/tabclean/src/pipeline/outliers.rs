//! Outlier detection module.
//!
//! Flags values of numeric columns that fall outside the IQR fences.

use crate::error::{Result, TabcleanError};
use crate::profiler::statistics::{quantile_sorted, sorted};
use crate::types::{
    ColumnKind, FlaggedValue, OutlierBounds, OutlierReport, OutlierSummary, TableSchema,
};
use crate::utils::{numeric_values, series_of};
use polars::prelude::*;
use tracing::{debug, warn};

/// IQR-based outlier detector.
pub struct OutlierDetector;

impl OutlierDetector {
    /// Minimum number of observed values needed to compute quartiles.
    pub const MIN_VALUES: usize = 4;

    /// Compute the IQR bounds of a numeric column and flag every value
    /// strictly outside them.
    ///
    /// Quartiles interpolate linearly at position `(n - 1) * p` of the
    /// sorted observed values. Flagged indices are row positions in the
    /// input, missing rows included.
    pub fn detect(series: &Series) -> Result<OutlierReport> {
        let values = numeric_values(series)?;
        let observed: Vec<f64> = values.iter().flatten().copied().collect();

        if observed.len() < Self::MIN_VALUES {
            return Err(TabcleanError::InsufficientData {
                column: series.name().to_string(),
                required: Self::MIN_VALUES,
                found: observed.len(),
            });
        }

        let sorted = sorted(&observed);
        let (Some(q1), Some(q3)) = (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75))
        else {
            return Err(TabcleanError::InsufficientData {
                column: series.name().to_string(),
                required: Self::MIN_VALUES,
                found: 0,
            });
        };
        let bounds = OutlierBounds::from_quartiles(q1, q3);

        let flagged: Vec<FlaggedValue> = values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let value = value?;
                bounds.is_outlier(value).then_some(FlaggedValue { index, value })
            })
            .collect();

        debug!(
            "Column '{}': bounds [{:.2}, {:.2}], {} outliers",
            series.name(),
            bounds.lower,
            bounds.upper,
            flagged.len()
        );

        Ok(OutlierReport {
            column: series.name().to_string(),
            bounds,
            flagged,
        })
    }

    /// Run [`detect`](Self::detect) on every numeric column of the schema.
    ///
    /// Columns with fewer than [`MIN_VALUES`](Self::MIN_VALUES) observed
    /// values are reported as skipped. Results are sorted by outlier count,
    /// highest first.
    pub fn detect_all(df: &DataFrame, schema: &TableSchema) -> Result<Vec<OutlierSummary>> {
        let mut summaries = Vec::new();

        for column in schema.columns_of(ColumnKind::Numeric) {
            let series = series_of(df, &column)?;
            match Self::detect(series) {
                Ok(report) => summaries.push(OutlierSummary::Detected {
                    outlier_count: report.count(),
                    bounds: report.bounds,
                    column,
                }),
                Err(TabcleanError::InsufficientData { found, required, .. }) => {
                    warn!(
                        "Skipping outlier detection for '{}': {} values, {} required",
                        column, found, required
                    );
                    summaries.push(OutlierSummary::Skipped {
                        reason: format!("insufficient data: {} of {} values", found, required),
                        column,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // stable sort keeps column order among equal counts
        summaries.sort_by(|a, b| b.outlier_count().cmp(&a.outlier_count()));
        Ok(summaries)
    }
}
