use crate::frame::columns::{datetime_series, float_values, has_column, timestamp_millis};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::normalize::{finalize, require_columns, Normalizer};
use crate::types::source::Source;
use log::debug;
use polars::prelude::*;

/// Fields coerced to `f64` when present.
pub const NUMERIC_FIELDS: [&str; 10] = [
    "temperature_2m",
    "relative_humidity_2m",
    "precipitation",
    "rain",
    "wind_speed_10m",
    "wind_direction_10m",
    "wind_gusts_10m",
    "latitude",
    "longitude",
    "elevation_m",
];

/// A row is only dropped when every one of these (that the frame has) is missing.
pub const CORE_FIELDS: [&str; 4] = [
    "temperature_2m",
    "relative_humidity_2m",
    "precipitation",
    "wind_speed_10m",
];

/// Open-Meteo ERA5 hourly reanalysis for a single grid point.
#[derive(Debug, Clone)]
pub struct OpenMeteoNormalizer {
    pub identity_key: &'static [&'static str],
}

impl Default for OpenMeteoNormalizer {
    fn default() -> Self {
        Self {
            identity_key: &[TIMESTAMP_COLUMN],
        }
    }
}

impl Normalizer for OpenMeteoNormalizer {
    fn source(&self) -> Source {
        Source::OpenMeteo
    }

    fn identity_key(&self) -> &[&'static str] {
        self.identity_key
    }

    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError> {
        require_columns(&raw, Source::OpenMeteo, &[TIMESTAMP_COLUMN])?;
        let mut df = raw;

        let timestamps = timestamp_millis(&df, TIMESTAMP_COLUMN)?;
        df.with_column(datetime_series(TIMESTAMP_COLUMN, timestamps))?;
        for field in NUMERIC_FIELDS {
            if has_column(&df, field) {
                let values = float_values(&df, field)?;
                df.with_column(values.into_series())?;
            }
        }

        let df = drop_rows_without_core_fields(df)?;
        finalize(df, Source::OpenMeteo, self.identity_key)
    }
}

fn drop_rows_without_core_fields(df: DataFrame) -> PolarsResult<DataFrame> {
    let present: Vec<&str> = CORE_FIELDS
        .into_iter()
        .filter(|field| has_column(&df, field))
        .collect();
    if present.is_empty() {
        return Ok(df);
    }

    let before = df.height();
    let any_present: Vec<Expr> = present.into_iter().map(|field| col(field).is_not_null()).collect();
    let kept = df.lazy().filter(any_horizontal(any_present)?).collect()?;
    let dropped = before - kept.height();
    if dropped > 0 {
        debug!("Open-Meteo: dropping {} rows without any core field", dropped);
    }
    Ok(kept)
}
