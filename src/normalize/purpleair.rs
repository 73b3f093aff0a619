use crate::frame::columns::{datetime_series, drop_existing, has_column, string_values};
use crate::frame::timestamp::{floor_to_hour, parse_epoch_seconds, parse_utc};
use crate::frame::TIMESTAMP_COLUMN;
use crate::normalize::error::NormalizeError;
use crate::normalize::{finalize, raw_key_columns, require_columns, Normalizer};
use crate::types::source::Source;
use polars::prelude::*;

/// Time fields in order of preference. The first one present is used and
/// all of them are dropped afterwards.
pub const TIME_FIELDS: [&str; 2] = ["time_stamp", "last_seen"];

/// PurpleAir sensor readings keyed by sensor.
#[derive(Debug, Clone)]
pub struct PurpleAirNormalizer {
    pub identity_key: &'static [&'static str],
}

impl Default for PurpleAirNormalizer {
    fn default() -> Self {
        Self {
            identity_key: &["sensor_index", TIMESTAMP_COLUMN],
        }
    }
}

impl Normalizer for PurpleAirNormalizer {
    fn source(&self) -> Source {
        Source::PurpleAir
    }

    fn identity_key(&self) -> &[&'static str] {
        self.identity_key
    }

    fn normalize(&self, raw: DataFrame) -> Result<DataFrame, NormalizeError> {
        let time_field = TIME_FIELDS
            .into_iter()
            .find(|field| has_column(&raw, field))
            .ok_or_else(|| NormalizeError::MissingTimeSource {
                provider: Source::PurpleAir,
                candidates: TIME_FIELDS.iter().map(|f| f.to_string()).collect(),
            })?;
        require_columns(&raw, Source::PurpleAir, &raw_key_columns(self.identity_key))?;
        let mut df = raw;

        let timestamps: Vec<Option<i64>> = string_values(&df, time_field)?
            .into_iter()
            .map(|value| {
                let value = value?;
                parse_epoch_seconds(&value)
                    .or_else(|| parse_utc(&value))
                    .map(|ts| floor_to_hour(ts.timestamp_millis()))
            })
            .collect();
        df.with_column(datetime_series(TIMESTAMP_COLUMN, timestamps))?;

        let df = drop_existing(&df, &TIME_FIELDS)?;
        finalize(df, Source::PurpleAir, self.identity_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::columns::timestamp_millis;
    use crate::normalize::test_support::assert_unique;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_time_stamp_preferred_and_floored() -> Result<(), Box<dyn std::error::Error>> {
        // 1700000000 = 2023-11-14 22:13:20 UTC
        let raw = df!(
            "sensor_index" => &["101", "101", "202", "101"],
            "time_stamp" => &["1700000000", "1700001000", "1700000000", "1700003700"],
            "last_seen" => &["1", "1", "1", "1"],
            "pm2.5_atm" => &["3.0", "5.0", "8.0", "4.0"],
        )?;
        let df = PurpleAirNormalizer::default().normalize(raw)?;

        assert_eq!(df.height(), 3);
        assert!(df.column("time_stamp").is_err());
        assert!(df.column("last_seen").is_err());
        assert_unique(&df, PurpleAirNormalizer::default().identity_key);

        let h22 = Utc.with_ymd_and_hms(2023, 11, 14, 22, 0, 0).unwrap().timestamp_millis();
        let h23 = Utc.with_ymd_and_hms(2023, 11, 14, 23, 0, 0).unwrap().timestamp_millis();
        assert_eq!(
            timestamp_millis(&df, TIMESTAMP_COLUMN)?,
            vec![Some(h22), Some(h22), Some(h23)]
        );
        let pm: Vec<Option<&str>> = df.column("pm2.5_atm")?.str()?.into_iter().collect();
        assert_eq!(pm, vec![Some("3.0"), Some("8.0"), Some("4.0")]);
        Ok(())
    }

    #[test]
    fn test_falls_back_to_last_seen() -> Result<(), Box<dyn std::error::Error>> {
        let raw = df!(
            "sensor_index" => &["101"],
            "last_seen" => &["1700000000"],
        )?;
        let df = PurpleAirNormalizer::default().normalize(raw)?;
        assert_eq!(df.height(), 1);
        assert_eq!(
            timestamp_millis(&df, TIMESTAMP_COLUMN)?,
            vec![Some(
                Utc.with_ymd_and_hms(2023, 11, 14, 22, 0, 0)
                    .unwrap()
                    .timestamp_millis()
            )]
        );
        Ok(())
    }

    #[test]
    fn test_no_time_field_is_validation_error() -> Result<(), Box<dyn std::error::Error>> {
        let raw = df!("sensor_index" => &["101"], "pm2.5_atm" => &["1.0"])?;
        assert!(matches!(
            PurpleAirNormalizer::default().normalize(raw),
            Err(NormalizeError::MissingTimeSource { .. })
        ));
        Ok(())
    }
}
