//! Shared utilities for the cleaning pipeline.
//!
//! This module contains the CSV source reader and the small series helpers
//! used across the cleaner, imputers, detector and profiler.

use crate::error::{Result, ResultExt, TabcleanError};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a float, the only dtypes that can hold NaN.
#[inline]
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Number of float NaN values in a series; 0 for every other dtype.
pub fn nan_count(series: &Series) -> usize {
    if !is_float_dtype(series.dtype()) {
        return 0;
    }
    series
        .cast(&DataType::Float64)
        .ok()
        .and_then(|cast| {
            cast.f64()
                .ok()
                .map(|ca| ca.into_iter().filter(|v| v.is_some_and(f64::is_nan)).count())
        })
        .unwrap_or(0)
}

// =============================================================================
// CSV Source Reader
// =============================================================================

/// Markers read as missing values by [`load_csv`].
pub const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "null", "None"];

/// Number of rows used by the reader to infer column dtypes.
pub const INFER_SCHEMA_ROWS: usize = 100;

/// Load a CSV file with a header row into a DataFrame.
///
/// Dtypes are inferred from the first [`INFER_SCHEMA_ROWS`] rows and every
/// marker in [`MISSING_MARKERS`] is read as null.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(TabcleanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let null_values = NullValues::AllColumns(MISSING_MARKERS.iter().map(|m| (*m).into()).collect());

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(null_values)),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read CSV '{}'", path.display()))
}

/// Find a column by name ignoring ASCII case, returning the actual name.
pub fn find_column(df: &DataFrame, target: &str) -> Option<String> {
    df.get_column_names()
        .into_iter()
        .find(|name| name.as_str().eq_ignore_ascii_case(target))
        .map(|name| name.to_string())
}

/// Look up a column as a materialized series.
pub fn series_of<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| TabcleanError::ColumnNotFound(name.to_string()))
}

// =============================================================================
// Series Value Utilities
// =============================================================================

/// Read a numeric series as `f64` values, keeping missing positions.
///
/// NaN is read as missing.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    if !is_numeric_dtype(series.dtype()) {
        return Err(TabcleanError::InvalidInput(format!(
            "column '{}' is not numeric (dtype {})",
            series.name(),
            series.dtype()
        )));
    }
    float_values(series)
}

/// Read any series as `f64` values, parsing text and turning anything
/// unparsable into a missing value.
pub fn coerce_numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    if is_numeric_dtype(series.dtype()) {
        return float_values(series);
    }
    let trimmed = match series.dtype() {
        DataType::String => Series::new(
            series.name().clone(),
            series
                .str()?
                .into_iter()
                .map(|v| v.map(str::trim))
                .collect::<Vec<_>>(),
        ),
        _ => series.clone(),
    };
    float_values(&trimmed)
}

fn float_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a series as text values, keeping missing positions.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Calculate the mode (most frequent value) of a string Series.
///
/// Missing values are ignored. Ties go to the value encountered first.
pub fn string_mode(series: &Series) -> Result<Option<String>> {
    let values = text_values(series)?;
    Ok(mode_of(values.iter().flatten().map(String::as_str)).map(str::to_string))
}

/// Most frequent item of an iterator; ties go to the first encountered.
pub fn mode_of<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    // value -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, value) in values.into_iter().enumerate() {
        counts.entry(value).or_insert((0, pos)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> Result<Series> {
    let filled: Vec<f64> = numeric_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> Result<Series> {
    let filled: Vec<String> = text_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Tests
// =============================================================================
