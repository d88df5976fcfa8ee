//! Data profiling module for exploratory analysis of a cleaned table.
//!
//! This module provides functionality for:
//! - Descriptive statistics of numeric columns
//! - Value counts of categorical columns
//! - Pearson correlation between numeric columns
//! - Group and binned rates of a 0/1 outcome column

mod relationships;
pub(crate) mod statistics;

pub use relationships::{binned_rate, group_rate};

use crate::config::EdaConfig;
use crate::error::{Result, TabcleanError};
use crate::types::{
    ColumnKind, ColumnStats, ColumnValueCounts, CorrelationMatrix, EdaReport, TableSchema,
    ValueCount,
};
use crate::utils::{numeric_values, series_of};
use polars::prelude::*;
use tracing::{debug, info, warn};

const VALUE: &str = "value";
const COUNT: &str = "count";

/// Data profiler producing the exploratory analysis tables.
pub struct DataProfiler;

impl DataProfiler {
    /// Run every analysis on a cleaned table.
    ///
    /// Group and binned rates are computed only when their columns are
    /// present (matched ignoring case); the correlation matrix needs at
    /// least two numeric columns.
    pub fn profile(df: &DataFrame, schema: &TableSchema, config: &EdaConfig) -> Result<EdaReport> {
        config.validate()?;
        info!("Profiling table with {} rows and {} columns...", df.height(), df.width());

        let stats = Self::describe_numeric(df, schema)?;

        let mut value_counts = Vec::new();
        for column in schema.columns_of(ColumnKind::Categorical) {
            let counts = Self::value_counts(df, &column, config.top_n)?;
            value_counts.push(ColumnValueCounts { column, counts });
        }

        let numeric = schema.columns_of(ColumnKind::Numeric);
        let correlation = if numeric.len() >= 2 {
            Some(Self::correlation_matrix(df, &numeric)?)
        } else {
            warn!(
                "Skipping correlation matrix: {} numeric column(s), at least 2 required",
                numeric.len()
            );
            None
        };

        let group = Self::find_column(df, &config.group_column);
        let rate = Self::find_column(df, &config.rate_column);
        let binned = Self::find_column(df, &config.binned_column);

        let group_rates = match (&group, &rate) {
            (Some(group), Some(rate)) => {
                let rates = group_rate(df, group, rate)?;
                if rates.is_empty() {
                    warn!(
                        "Skipping group rates: no row has both '{}' and a numeric '{}'",
                        group, rate
                    );
                    None
                } else {
                    Some(rates)
                }
            }
            _ => {
                warn!(
                    "Skipping group rates: columns '{}' and '{}' not both present",
                    config.group_column, config.rate_column
                );
                None
            }
        };

        let binned_rates = match (&binned, &rate) {
            (Some(binned), Some(rate)) => match binned_rate(df, binned, rate, config.bins) {
                Ok(bins) => Some(bins),
                Err(TabcleanError::InsufficientData { .. }) => {
                    warn!(
                        "Skipping binned rates: no row has both a numeric '{}' and '{}'",
                        binned, rate
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            _ => {
                warn!(
                    "Skipping binned rates: columns '{}' and '{}' not both present",
                    config.binned_column, config.rate_column
                );
                None
            }
        };

        Ok(EdaReport {
            stats,
            value_counts,
            correlation,
            group_rates,
            binned_rates,
        })
    }

    /// Mean, median, min and max of every numeric column over its observed
    /// values, sorted by mean descending.
    ///
    /// Columns without any observed value are skipped.
    pub fn describe_numeric(df: &DataFrame, schema: &TableSchema) -> Result<Vec<ColumnStats>> {
        let mut stats = Vec::new();

        for column in schema.columns_of(ColumnKind::Numeric) {
            let series = series_of(df, &column)?;
            let observed: Vec<f64> = numeric_values(series)?.into_iter().flatten().collect();
            let sorted = statistics::sorted(&observed);

            let (Some(mean), Some(median), Some(&min), Some(&max)) = (
                statistics::mean(&sorted),
                statistics::quantile_sorted(&sorted, 0.5),
                sorted.first(),
                sorted.last(),
            ) else {
                debug!("Column '{}' has no observed values, skipping stats", column);
                continue;
            };

            stats.push(ColumnStats {
                column,
                count: sorted.len(),
                mean,
                median,
                min,
                max,
            });
        }

        stats.sort_by(|a, b| b.mean.partial_cmp(&a.mean).unwrap_or(std::cmp::Ordering::Equal));
        Ok(stats)
    }

    /// Occurrences of each value of a column, missing values included as
    /// their own bucket.
    ///
    /// Ordered by count descending, then by first occurrence; at most
    /// `top_n` entries.
    pub fn value_counts(df: &DataFrame, column: &str, top_n: usize) -> Result<Vec<ValueCount>> {
        let values = series_of(df, column)?
            .cast(&DataType::String)?
            .with_name(VALUE.into());

        let grouped = DataFrame::new(vec![values.into()])?
            .lazy()
            .group_by_stable([col(VALUE)])
            .agg([len().alias(COUNT)])
            .collect()?;

        let names = grouped.column(VALUE)?.as_materialized_series().str()?.clone();
        let counts = grouped
            .column(COUNT)?
            .as_materialized_series()
            .cast(&DataType::UInt64)?;

        let mut counts: Vec<ValueCount> = names
            .into_iter()
            .zip(counts.u64()?.into_iter())
            .map(|(value, count)| ValueCount {
                value: value.map(str::to_string),
                count: count.unwrap_or(0) as usize,
            })
            .collect();

        // stable sort keeps first-occurrence order among equal counts
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(top_n);
        Ok(counts)
    }

    /// Pairwise Pearson correlation of the given numeric columns.
    pub fn correlation_matrix<S: AsRef<str>>(
        df: &DataFrame,
        columns: &[S],
    ) -> Result<CorrelationMatrix> {
        if columns.len() < 2 {
            return Err(TabcleanError::InsufficientData {
                column: "correlation matrix".to_string(),
                required: 2,
                found: columns.len(),
            });
        }

        let data = columns
            .iter()
            .map(|c| numeric_values(series_of(df, c.as_ref())?))
            .collect::<Result<Vec<_>>>()?;

        let values = data
            .iter()
            .map(|x| data.iter().map(|y| statistics::pearson(x, y)).collect())
            .collect();

        Ok(CorrelationMatrix {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            values,
        })
    }

    /// Case-insensitive column lookup returning the actual column name.
    pub fn find_column(df: &DataFrame, name: &str) -> Option<String> {
        crate::utils::find_column(df, name)
    }
}
