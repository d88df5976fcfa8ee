//! Value sanitization applied before missingness is measured.

use crate::config::{CasePolicy, CleanerConfig};
use crate::error::{Result, TabcleanError};
use crate::types::{ColumnKind, TableSchema};
use crate::utils::{is_float_dtype, is_numeric_dtype, nan_count, text_values};
use polars::prelude::*;
use tracing::debug;

/// Trim and re-case every text column of the schema.
///
/// Columns the reader inferred as numeric but that are declared
/// categorical are converted to strings first.
pub(crate) fn normalize_text_columns(
    df: DataFrame,
    schema: &TableSchema,
    config: &CleanerConfig,
) -> Result<DataFrame> {
    let mut df = df;

    for (col_name, kind) in schema.iter() {
        if kind != ColumnKind::Categorical {
            continue;
        }
        let series = df.column(col_name)?.as_materialized_series();
        let (normalized, blanked) =
            normalize_text_series(series, config.case_for(col_name), config.blank_as_missing)?;
        if blanked > 0 {
            debug!("Column '{}': {} blank values marked missing", col_name, blanked);
        }
        df.replace(col_name, normalized)?;
    }

    Ok(df)
}

/// Trim whitespace and apply `case` to every value of a series.
///
/// Returns the normalized string series and the number of values that
/// became missing because they were blank.
pub(crate) fn normalize_text_series(
    series: &Series,
    case: CasePolicy,
    blank_as_missing: bool,
) -> Result<(Series, usize)> {
    let mut blanked = 0;
    let normalized: Vec<Option<String>> = text_values(series)?
        .into_iter()
        .map(|value| {
            let value = value?;
            let trimmed = value.trim();
            if blank_as_missing && trimmed.is_empty() {
                blanked += 1;
                None
            } else {
                Some(case.apply(trimmed))
            }
        })
        .collect();

    Ok((Series::new(series.name().clone(), normalized), blanked))
}

/// Make sure every numeric column of the schema has a numeric dtype.
///
/// String columns are parsed value by value after trimming; blank values
/// become missing. Anything unparsable fails the run with `InvalidInput`.
pub(crate) fn coerce_numeric_columns(df: DataFrame, schema: &TableSchema) -> Result<DataFrame> {
    let mut df = df;

    for (col_name, kind) in schema.iter() {
        if kind != ColumnKind::Numeric {
            continue;
        }
        let series = df.column(col_name)?.as_materialized_series();
        if is_numeric_dtype(series.dtype()) {
            continue;
        }
        let parsed = parse_numeric_series(series)?;
        debug!("Converted '{}' from {} to Float64", col_name, series.dtype());
        df.replace(col_name, parsed)?;
    }

    Ok(df)
}

/// Turn float NaN values into missing values so they are counted and
/// imputed like any other gap.
///
/// Returns the table and the number of values converted.
pub(crate) fn nan_to_missing(df: DataFrame) -> Result<(DataFrame, usize)> {
    let mut converted = 0;
    let mut exprs = Vec::new();
    for column in df.get_columns() {
        if !is_float_dtype(column.dtype()) {
            continue;
        }
        let nans = nan_count(column.as_materialized_series());
        if nans > 0 {
            debug!("Column '{}': {} NaN values marked missing", column.name(), nans);
            converted += nans;
            exprs.push(col(column.name().clone()).fill_nan(lit(NULL)));
        }
    }

    if exprs.is_empty() {
        return Ok((df, 0));
    }
    Ok((df.lazy().with_columns(exprs).collect()?, converted))
}

fn parse_numeric_series(series: &Series) -> Result<Series> {
    if !matches!(series.dtype(), DataType::String | DataType::Boolean) {
        return Err(TabcleanError::InvalidInput(format!(
            "column '{}' is declared numeric but has dtype {}",
            series.name(),
            series.dtype()
        )));
    }
    if series.dtype() == &DataType::Boolean {
        return Ok(series.cast(&DataType::Float64)?);
    }

    let mut parsed: Vec<Option<f64>> = Vec::with_capacity(series.len());
    for value in series.str()?.into_iter() {
        match value.map(str::trim) {
            None | Some("") => parsed.push(None),
            Some(text) => match text.parse::<f64>() {
                Ok(number) => parsed.push(Some(number)),
                Err(_) => {
                    return Err(TabcleanError::InvalidInput(format!(
                        "column '{}' is declared numeric but contains '{}'",
                        series.name(),
                        text
                    )));
                }
            },
        }
    }

    Ok(Series::new(series.name().clone(), parsed))
}
