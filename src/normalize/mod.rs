//! Per-source normalization of raw provider records into canonical rows.
//!
//! Every provider ships its own column names, time encodings and duplicate
//! patterns. A [`Normalizer`] turns one raw frame into a frame that
//!
//! * carries a tz-aware UTC `timestamp_utc` column as its first column,
//! * holds at most one row per identity key,
//! * is sorted ascending by `timestamp_utc`.
//!
//! Structurally broken input (a required column is absent) is an error.
//! Individual values that cannot be read become missing values.

pub mod airnow;
pub mod aqs;
pub mod error;
pub mod hvo;
pub mod openmeteo;
pub mod purpleair;

use crate::frame::columns::{
    drop_null_timestamps, has_column, keep_first, sort_by_timestamp, timestamp_first,
};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::types::source::Source;
use log::info;
use polars::prelude::DataFrame;

pub use airnow::AirNowNormalizer;
pub use aqs::AqsNormalizer;
pub use hvo::HvoNormalizer;
pub use openmeteo::OpenMeteoNormalizer;
pub use purpleair::PurpleAirNormalizer;

/// Converts one provider's raw frame into canonical rows.
pub trait Normalizer {
    /// The provider this normalizer understands.
    fn source(&self) -> Source;

    /// Columns that identify one canonical row. No two output rows share
    /// the same values over these columns.
    fn identity_key(&self) -> &[&'static str];

    /// Normalizes a raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::MissingColumn`] or
    /// [`NormalizeError::MissingTimeSource`] when the frame lacks a column
    /// the provider's rules depend on.
    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError>;
}

/// Returns the normalizer for `source` with its default configuration.
pub fn normalizer_for(source: Source) -> Box<dyn Normalizer> {
    match source {
        Source::AirNow => Box::new(AirNowNormalizer::default()),
        Source::Aqs => Box::new(AqsNormalizer::default()),
        Source::PurpleAir => Box::new(PurpleAirNormalizer::default()),
        Source::Hvo => Box::new(HvoNormalizer::default()),
        Source::OpenMeteo => Box::new(OpenMeteoNormalizer::default()),
    }
}

pub(crate) fn require_columns(
    df: &DataFrame,
    provider: Source,
    columns: &[&str],
) -> Result<(), NormalizeError> {
    match columns.iter().find(|column| !has_column(df, column)) {
        Some(column) => Err(NormalizeError::MissingColumn {
            provider,
            column: column.to_string(),
        }),
        None => Ok(()),
    }
}

/// Identity key columns that must already exist in the raw frame.
pub(crate) fn raw_key_columns(identity_key: &[&'static str]) -> Vec<&'static str> {
    identity_key
        .iter()
        .copied()
        .filter(|column| *column != TIMESTAMP_COLUMN)
        .collect()
}

/// Drops unreadable timestamps, removes duplicate identity keys (first row
/// wins), sorts by time and moves `timestamp_utc` to the front.
pub(crate) fn finalize(
    df: DataFrame,
    provider: Source,
    identity_key: &[&str],
) -> Result<DataFrame, NormalizeError> {
    let df = drop_null_timestamps(&df, provider.display_name())?;
    let before = df.height();
    let df = keep_first(&df, identity_key)?;
    let df = timestamp_first(&sort_by_timestamp(&df)?)?;
    info!(
        "{} cleaned: {} rows ({} duplicates removed), {} columns",
        provider.display_name(),
        df.height(),
        before - df.height(),
        df.width()
    );
    Ok(df)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::frame::columns::string_values;
    use polars::prelude::DataFrame;
    use std::collections::HashSet;

    /// Asserts that no two rows share the same values over `key`.
    pub fn assert_unique(df: &DataFrame, key: &[&str]) {
        let columns: Vec<Vec<Option<String>>> = key
            .iter()
            .map(|name| string_values(df, name).unwrap())
            .collect();
        let mut seen = HashSet::new();
        for row in 0..df.height() {
            let values: Vec<Option<String>> =
                columns.iter().map(|values| values[row].clone()).collect();
            assert!(seen.insert(values.clone()), "duplicate key {values:?}");
        }
    }
}
