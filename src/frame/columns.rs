//! Column-level helpers shared by the normalizers, the merger and the
//! archive engine.

use crate::frame::timestamp::{format_iso_utc, parse_utc};
use crate::frame::TIMESTAMP_COLUMN;
use log::warn;
use polars::prelude::*;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Returns the values of a column as owned strings, whatever its dtype.
///
/// Datetime columns are rendered as ISO-8601 UTC, the same text the CSV
/// store writes, so a typed instant and its persisted form compare equal.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?;
    if let DataType::Datetime(_, _) = column.dtype() {
        return Ok(timestamp_millis(df, name)?
            .into_iter()
            .map(|ms| ms.and_then(format_iso_utc))
            .collect());
    }
    let as_str = column.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect())
}

/// Reads a timestamp column as UTC epoch milliseconds.
///
/// Datetime columns are converted from their time unit, string columns are
/// parsed leniently (unreadable values become `None`).
pub fn timestamp_millis(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Datetime(unit, _) => {
            let divisor = match unit {
                TimeUnit::Milliseconds => 1,
                TimeUnit::Microseconds => 1_000,
                TimeUnit::Nanoseconds => 1_000_000,
            };
            let values = column.datetime()?;
            Ok(values
                .into_iter()
                .map(|value| value.map(|v| v.div_euclid(divisor)))
                .collect())
        }
        _ => Ok(string_values(df, name)?
            .into_iter()
            .map(|value| {
                value
                    .as_deref()
                    .and_then(parse_utc)
                    .map(|dt| dt.timestamp_millis())
            })
            .collect()),
    }
}

/// Builds a tz-aware UTC datetime series from epoch milliseconds.
pub fn datetime_series<I>(name: &str, millis: I) -> Series
where
    I: IntoIterator<Item = Option<i64>>,
{
    Int64Chunked::from_iter_options(name.into(), millis.into_iter())
        .into_datetime(TimeUnit::Milliseconds, Some("UTC".into()))
        .into_series()
}

/// Reads a column as `f64`, treating unparsable strings and NaN as missing.
pub fn float_values(df: &DataFrame, name: &str) -> PolarsResult<Float64Chunked> {
    let value = match df.column(name)?.dtype() {
        DataType::String => col(name).str().strip_chars(lit(NULL)),
        _ => col(name),
    };
    let parsed = df
        .select([name])?
        .lazy()
        .select([value.cast(DataType::Float64).fill_nan(lit(NULL)).alias(name)])
        .collect()?;
    Ok(parsed.column(name)?.f64()?.clone())
}

/// Reads a column of flags, accepting `true`/`false` in any case and `1`/`0`.
pub fn bool_values(df: &DataFrame, name: &str) -> PolarsResult<BooleanChunked> {
    let column = df.column(name)?;
    if let DataType::Boolean = column.dtype() {
        return Ok(column.bool()?.clone());
    }
    let values = string_values(df, name)?.into_iter().map(|value| {
        value.and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "1.0" => Some(true),
            "false" | "0" | "0.0" => Some(false),
            _ => None,
        })
    });
    Ok(BooleanChunked::from_iter_options(name.into(), values))
}

/// Drops every row whose key over `subset` was already seen earlier.
///
/// Row order is kept and nulls compare equal to each other, so two rows
/// missing the same key field count as duplicates.
pub fn keep_first(df: &DataFrame, subset: &[&str]) -> PolarsResult<DataFrame> {
    let subset: Vec<String> = subset.iter().map(|name| name.to_string()).collect();
    df.unique_stable(Some(&subset), UniqueKeepStrategy::First, None)
}

/// Stable ascending sort on `timestamp_utc`, missing timestamps last.
pub fn sort_by_timestamp(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.sort(
        [TIMESTAMP_COLUMN],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )
}

/// Removes the named columns, ignoring names the frame does not have.
pub fn drop_existing(df: &DataFrame, names: &[&str]) -> PolarsResult<DataFrame> {
    let kept: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|name| !names.contains(&name.as_str()))
        .cloned()
        .collect();
    df.select(kept)
}

/// Moves `timestamp_utc` to the front, keeping the order of the rest.
pub fn timestamp_first(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut order: Vec<PlSmallStr> = vec![TIMESTAMP_COLUMN.into()];
    order.extend(
        df.get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != TIMESTAMP_COLUMN)
            .cloned(),
    );
    df.select(order)
}

/// Drops rows whose `timestamp_utc` is missing, logging how many went.
pub fn drop_null_timestamps(df: &DataFrame, label: &str) -> PolarsResult<DataFrame> {
    let column = df.column(TIMESTAMP_COLUMN)?;
    let missing = column.null_count();
    if missing == 0 {
        return Ok(df.clone());
    }
    warn!(
        "{}: dropping {} of {} rows with an unreadable timestamp",
        label,
        missing,
        df.height()
    );
    let mask = column.is_not_null();
    df.filter(&mask)
}

/// Renders every datetime column as ISO-8601 UTC strings for CSV output.
pub fn format_timestamps(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    let datetime_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|column| matches!(column.dtype(), DataType::Datetime(_, _)))
        .map(|column| column.name().to_string())
        .collect();
    for name in datetime_columns {
        let rendered: Vec<Option<String>> = timestamp_millis(df, &name)?
            .into_iter()
            .map(|ms| ms.and_then(format_iso_utc))
            .collect();
        out.with_column(Series::new(name.as_str().into(), rendered))?;
    }
    Ok(out)
}

/// Casts every column to `String`, datetimes as ISO-8601 UTC.
pub fn stringify(df: &DataFrame) -> PolarsResult<DataFrame> {
    let columns = format_timestamps(df)?
        .get_columns()
        .iter()
        .map(|column| column.cast(&DataType::String))
        .collect::<PolarsResult<Vec<Column>>>()?;
    DataFrame::new(columns)
}
