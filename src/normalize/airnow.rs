use crate::frame::columns::{datetime_series, drop_existing, string_values, stringify};
use crate::frame::timestamp::{combine_date_and_hour, parse_date};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::normalize::{finalize, raw_key_columns, require_columns, Normalizer};
use crate::types::source::Source;
use log::warn;
use polars::prelude::*;

/// Column layout of an AirNow observation export.
pub const AIRNOW_HEADER: [&str; 12] = [
    "DateObserved",
    "HourObserved",
    "LocalTimeZone",
    "ReportingArea",
    "StateCode",
    "Latitude",
    "Longitude",
    "ParameterName",
    "AQI",
    "Category",
    "DateLocal",
    "HourLocal",
];

const DROPPED_COLUMNS: [&str; 5] = [
    "DateObserved",
    "HourObserved",
    "DateLocal",
    "HourLocal",
    "LocalTimeZone",
];

/// AirNow observations keyed by reporting area and pollutant.
///
/// The observation date and hour are combined into `timestamp_utc` and the
/// local-time fields are dropped.
#[derive(Debug, Clone)]
pub struct AirNowNormalizer {
    pub identity_key: &'static [&'static str],
}

impl Default for AirNowNormalizer {
    fn default() -> Self {
        Self {
            identity_key: &["ReportingArea", "ParameterName", TIMESTAMP_COLUMN],
        }
    }
}

impl Normalizer for AirNowNormalizer {
    fn source(&self) -> Source {
        Source::AirNow
    }

    fn identity_key(&self) -> &[&'static str] {
        self.identity_key
    }

    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError> {
        let mut df = restore_header(raw)?;
        require_columns(&df, Source::AirNow, &["DateObserved", "HourObserved"])?;
        require_columns(&df, Source::AirNow, &raw_key_columns(self.identity_key))?;

        let dates = string_values(&df, "DateObserved")?;
        let hours = string_values(&df, "HourObserved")?;
        let timestamps = dates.iter().zip(hours.iter()).map(|(date, hour)| {
            match (date.as_deref(), hour.as_deref()) {
                (Some(date), Some(hour)) => {
                    combine_date_and_hour(date, hour).map(|ts| ts.timestamp_millis())
                }
                _ => None,
            }
        });
        df.with_column(datetime_series(TIMESTAMP_COLUMN, timestamps))?;

        let df = drop_existing(&df, &DROPPED_COLUMNS)?;
        finalize(df, Source::AirNow, self.identity_key)
    }
}

/// Repairs exports written without a header line.
///
/// When the first line is an observation the reader turns its values into
/// column names. Such a frame has exactly twelve columns and its first
/// column name is a date (or repeats the first cell). The standard header is
/// restored and the swallowed line is put back as the first row.
fn restore_header(raw: DataFrame) -> PolarsResult<DataFrame> {
    if raw.width() != AIRNOW_HEADER.len() {
        return Ok(raw);
    }
    let names: Vec<String> = raw
        .get_column_names()
        .into_iter()
        .map(|name| strip_duplicate_suffix(name.as_str()).to_string())
        .collect();
    if names.iter().map(String::as_str).eq(AIRNOW_HEADER) {
        return Ok(raw);
    }
    let first_cell = match raw.height() {
        0 => None,
        _ => string_values(&raw, raw.get_columns()[0].name().as_str())?
            .into_iter()
            .next()
            .flatten(),
    };
    let header_is_data =
        parse_date(&names[0]).is_some() || first_cell.as_deref() == Some(names[0].as_str());
    if !header_is_data {
        return Ok(raw);
    }

    warn!("AirNow: header line holds observation values, restoring the standard header");
    let mut body = stringify(&raw)?;
    body.set_column_names(AIRNOW_HEADER)?;
    let swallowed = DataFrame::new(
        AIRNOW_HEADER
            .iter()
            .zip(names)
            .map(|(name, value)| Series::new((*name).into(), [Some(value)]).into_column())
            .collect(),
    )?;
    swallowed.vstack(&body)
}

/// The CSV reader renames repeated header values to `<name>_duplicated_<n>`.
fn strip_duplicate_suffix(name: &str) -> &str {
    name.find("_duplicated_").map_or(name, |idx| &name[..idx])
}
