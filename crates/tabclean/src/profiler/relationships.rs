//! Rates of an outcome column across groups and numeric bins.

use crate::error::{Result, TabcleanError};
use crate::types::{BinRate, GroupRate};
use crate::utils::{coerce_numeric_values, series_of};
use polars::prelude::*;

const GROUP: &str = "group";
const RATE: &str = "rate";
const COUNT: &str = "count";

/// Mean of `rate_column` for every value of `group_column`, highest rate
/// first; equal rates keep first-seen group order.
///
/// The rate column is parsed leniently, so unparsable values count as
/// missing. Rows where either value is missing are skipped.
pub fn group_rate(df: &DataFrame, group_column: &str, rate_column: &str) -> Result<Vec<GroupRate>> {
    let groups = series_of(df, group_column)?
        .cast(&DataType::String)?
        .with_name(GROUP.into());
    let rates = Series::new(RATE.into(), coerce_numeric_values(series_of(df, rate_column)?)?);

    let grouped = DataFrame::new(vec![groups.into(), rates.into()])?
        .lazy()
        .filter(col(GROUP).is_not_null().and(col(RATE).is_not_null()))
        .group_by_stable([col(GROUP)])
        .agg([len().alias(COUNT), col(RATE).mean()])
        .collect()?;

    let names = grouped.column(GROUP)?.as_materialized_series().str()?.clone();
    let counts = grouped
        .column(COUNT)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    let means = grouped.column(RATE)?.as_materialized_series().f64()?.clone();

    let mut result: Vec<GroupRate> = names
        .into_iter()
        .zip(counts.u64()?.into_iter())
        .zip(means.into_iter())
        .filter_map(|((group, count), rate)| {
            Some(GroupRate {
                group: group?.to_string(),
                count: count? as usize,
                rate: rate?,
            })
        })
        .collect();
    result.sort_by(|a, b| b.rate.partial_cmp(&a.rate).unwrap_or(std::cmp::Ordering::Equal));
    Ok(result)
}

/// Mean of `rate_column` within `bins` equal-width bins spanning the range
/// of `value_column`.
///
/// Both columns are parsed leniently. The first bin includes its lower
/// edge. Empty bins have no rate. When all values are equal every row lands
/// in the first bin.
pub fn binned_rate(
    df: &DataFrame,
    value_column: &str,
    rate_column: &str,
    bins: usize,
) -> Result<Vec<BinRate>> {
    if bins == 0 {
        return Err(TabcleanError::InvalidInput(
            "number of bins must be at least 1".to_string(),
        ));
    }

    let values = coerce_numeric_values(series_of(df, value_column)?)?;
    let rates = coerce_numeric_values(series_of(df, rate_column)?)?;
    let pairs: Vec<(f64, f64)> = values
        .into_iter()
        .zip(rates)
        .filter_map(|(v, r)| Some((v?, r?)))
        .collect();

    if pairs.is_empty() {
        return Err(TabcleanError::InsufficientData {
            column: value_column.to_string(),
            required: 1,
            found: 0,
        });
    }

    let min = pairs.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
    let max = pairs.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;
    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { max } else { min + width * i as f64 })
        .collect();

    let mut sums = vec![(0.0, 0usize); bins];
    for (value, rate) in pairs {
        let bin = edges[1..]
            .iter()
            .position(|upper| value <= *upper)
            .unwrap_or(bins - 1);
        sums[bin].0 += rate;
        sums[bin].1 += 1;
    }

    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(i, (sum, count))| BinRate {
            lower: edges[i],
            upper: edges[i + 1],
            count,
            rate: (count > 0).then(|| sum / count as f64),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_rate_sorted_by_rate() {
        let df = df![
            "sex" => [Some("male"), Some("female"), Some("male"), Some("female"), None],
            "survived" => [Some(0i64), Some(1), Some(1), Some(1), Some(1)],
        ]
        .unwrap();

        let rates = group_rate(&df, "sex", "survived").unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0], GroupRate { group: "female".to_string(), count: 2, rate: 1.0 });
        assert_eq!(rates[1], GroupRate { group: "male".to_string(), count: 2, rate: 0.5 });
    }

    #[test]
    fn test_group_rate_parses_text_rate() {
        let df = df![
            "sex" => ["male", "female", "male", "female"],
            "survived" => ["0", "1", "yes", "1"],
        ]
        .unwrap();

        let rates = group_rate(&df, "sex", "survived").unwrap();
        assert_eq!(rates[0], GroupRate { group: "female".to_string(), count: 2, rate: 1.0 });
        assert_eq!(rates[1], GroupRate { group: "male".to_string(), count: 1, rate: 0.0 });
    }

    #[test]
    fn test_group_rate_equal_rates_keep_first_seen_order() {
        let df = df![
            "embarked" => ["s", "c", "q", "c", "s"],
            "survived" => [1i64, 1, 0, 1, 1],
        ]
        .unwrap();

        let groups: Vec<String> = group_rate(&df, "embarked", "survived")
            .unwrap()
            .into_iter()
            .map(|r| r.group)
            .collect();
        assert_eq!(groups, vec!["s", "c", "q"]);
    }

    #[test]
    fn test_group_rate_same_column_for_group_and_rate() {
        let df = df!["survived" => [0i64, 1, 1]].unwrap();

        let rates = group_rate(&df, "survived", "survived").unwrap();
        assert_eq!(rates[0], GroupRate { group: "1".to_string(), count: 2, rate: 1.0 });
    }

    #[test]
    fn test_binned_rate_edges_and_membership() {
        let df = df![
            "age" => [0.0, 10.0, 10.5, 20.0, 40.0],
            "survived" => [1.0, 0.0, 1.0, 1.0, 0.0],
        ]
        .unwrap();

        let bins = binned_rate(&df, "age", "survived", 4).unwrap();
        assert_eq!(bins.len(), 4);
        assert_eq!((bins[0].lower, bins[0].upper), (0.0, 10.0));
        assert_eq!((bins[3].lower, bins[3].upper), (30.0, 40.0));

        // [0, 10] holds 0 and 10; (10, 20] holds 10.5 and 20
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[0].rate, Some(0.5));
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[1].rate, Some(1.0));
        assert_eq!(bins[2].count, 0);
        assert_eq!(bins[2].rate, None);
        assert_eq!(bins[3].rate, Some(0.0));
    }

    #[test]
    fn test_binned_rate_constant_values() {
        let df = df!["age" => [30.0, 30.0], "survived" => [1.0, 0.0]].unwrap();
        let bins = binned_rate(&df, "age", "survived", 3).unwrap();

        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[0].rate, Some(0.5));
        assert!(bins[1..].iter().all(|b| b.rate.is_none()));
    }

    #[test]
    fn test_binned_rate_invalid() {
        let df = df!["age" => [Option::<f64>::None], "survived" => [Some(1.0)]].unwrap();
        assert!(binned_rate(&df, "age", "survived", 0).is_err());
        assert!(matches!(
            binned_rate(&df, "age", "survived", 2).unwrap_err(),
            TabcleanError::InsufficientData { .. }
        ));
    }
}
