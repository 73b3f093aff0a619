use crate::frame::columns::{datetime_series, drop_existing, has_column, string_values};
use crate::frame::timestamp::{floor_to_hour, parse_utc};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::normalize::{finalize, raw_key_columns, require_columns, Normalizer};
use crate::types::source::Source;
use polars::prelude::*;

const DROPPED_COLUMNS: [&str; 8] = [
    "date_local",
    "time_local",
    "date_gmt",
    "time_gmt",
    "uncertainty",
    "datum",
    "units_of_measure_code",
    "sample_duration_code",
];

/// Placeholder written for samples without a qualifier flag.
pub const NO_QUALIFIER: &str = "None";

/// EPA AQS sample data keyed by monitoring site and parameter.
///
/// `date_gmt` and `time_gmt` form the timestamp, which is floored to the
/// hour before duplicates are removed.
#[derive(Debug, Clone)]
pub struct AqsNormalizer {
    pub identity_key: &'static [&'static str],
}

impl Default for AqsNormalizer {
    fn default() -> Self {
        Self {
            identity_key: &[
                "state_code",
                "county_code",
                "site_number",
                TIMESTAMP_COLUMN,
                "parameter_code",
            ],
        }
    }
}

impl Normalizer for AqsNormalizer {
    fn source(&self) -> Source {
        Source::Aqs
    }

    fn identity_key(&self) -> &[&'static str] {
        self.identity_key
    }

    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError> {
        require_columns(&raw, Source::Aqs, &["date_gmt", "time_gmt"])?;
        require_columns(&raw, Source::Aqs, &raw_key_columns(self.identity_key))?;
        let mut df = raw;

        let dates = string_values(&df, "date_gmt")?;
        let times = string_values(&df, "time_gmt")?;
        let timestamps = dates.iter().zip(times.iter()).map(|(date, time)| {
            let (date, time) = (date.as_deref()?, time.as_deref()?);
            parse_utc(&format!("{} {}", date.trim(), time.trim()))
                .map(|ts| floor_to_hour(ts.timestamp_millis()))
        });
        df.with_column(datetime_series(TIMESTAMP_COLUMN, timestamps))?;

        if has_column(&df, "qualifier") {
            let qualifiers: Vec<String> = string_values(&df, "qualifier")?
                .into_iter()
                .map(|value| value.unwrap_or_else(|| NO_QUALIFIER.to_string()))
                .collect();
            df.with_column(Series::new("qualifier".into(), qualifiers))?;
        }

        let df = drop_existing(&df, &DROPPED_COLUMNS)?;
        finalize(df, Source::Aqs, self.identity_key)
    }
}
