//! How each cleaned source is reduced to hourly value columns before it is
//! joined onto the grid.

use crate::frame::columns::{
    bool_values, datetime_series, drop_null_timestamps, float_values, has_column, keep_first,
    sort_by_timestamp, string_values, timestamp_millis,
};
use crate::frame::timestamp::floor_to_hour;
use crate::frame::TIMESTAMP_COLUMN;
use crate::merge::error::MergeError;
use crate::types::source::Source;
use polars::prelude::*;

/// Type a value column is read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Text,
    Flag,
}

/// One cleaned column carried into the merged table under a new name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueColumn {
    pub cleaned: &'static str,
    pub merged: &'static str,
    pub kind: ValueKind,
    /// Missing required columns are an error, optional ones are skipped.
    pub required: bool,
}

const fn value(
    cleaned: &'static str,
    merged: &'static str,
    kind: ValueKind,
    required: bool,
) -> ValueColumn {
    ValueColumn {
        cleaned,
        merged,
        kind,
        required,
    }
}

/// How several rows falling into the same hour become one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourlyReduction {
    /// Keep the first row of the hour in time order.
    First,
    /// Median of every value column plus, in `count_column`, the number of
    /// readings whose first value column is present.
    Median { count_column: &'static str },
}

/// Merge-time configuration of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeProfile {
    pub source: Source,
    pub columns: &'static [ValueColumn],
    /// Only rows where this column equals this value are kept, when the
    /// column exists.
    pub row_filter: Option<(&'static str, &'static str)>,
    pub reduction: HourlyReduction,
}

const AQS_COLUMNS: [ValueColumn; 1] = [value(
    "sample_measurement",
    "pm25_aqs",
    ValueKind::Float,
    true,
)];

const AIRNOW_COLUMNS: [ValueColumn; 1] = [value("AQI", "aqi_airnow", ValueKind::Float, true)];

const PURPLEAIR_COLUMNS: [ValueColumn; 4] = [
    value("pm2.5_atm", "pm25_purpleair", ValueKind::Float, true),
    value("humidity", "humidity", ValueKind::Float, false),
    value("temperature", "temperature", ValueKind::Float, false),
    value("pressure", "pressure", ValueKind::Float, false),
];

const OPENMETEO_COLUMNS: [ValueColumn; 7] = [
    value("temperature_2m", "temperature_2m", ValueKind::Float, false),
    value("relative_humidity_2m", "relative_humidity_2m", ValueKind::Float, false),
    value("precipitation", "precipitation", ValueKind::Float, false),
    value("rain", "rain", ValueKind::Float, false),
    value("wind_speed_10m", "wind_speed_10m", ValueKind::Float, false),
    value("wind_direction_10m", "wind_direction_10m", ValueKind::Float, false),
    value("wind_gusts_10m", "wind_gusts_10m", ValueKind::Float, false),
];

const HVO_COLUMNS: [ValueColumn; 4] = [
    value("alertLevel", "alert_level_hvo", ValueKind::Text, true),
    value("colorCode", "color_code_hvo", ValueKind::Text, true),
    value("alert_change", "alert_change_hvo", ValueKind::Flag, true),
    value("color_change", "color_change_hvo", ValueKind::Flag, true),
];

impl MergeProfile {
    pub fn for_source(source: Source) -> Self {
        let (columns, row_filter, reduction): (&'static [ValueColumn], _, _) = match source {
            Source::Aqs => (&AQS_COLUMNS, None, HourlyReduction::First),
            Source::AirNow => (
                &AIRNOW_COLUMNS,
                Some(("ParameterName", "PM2.5")),
                HourlyReduction::First,
            ),
            Source::PurpleAir => (
                &PURPLEAIR_COLUMNS,
                None,
                HourlyReduction::Median {
                    count_column: "sensor_count_purpleair",
                },
            ),
            Source::OpenMeteo => (&OPENMETEO_COLUMNS, None, HourlyReduction::First),
            Source::Hvo => (&HVO_COLUMNS, None, HourlyReduction::First),
        };
        Self {
            source,
            columns,
            row_filter,
            reduction,
        }
    }

    /// Shapes a cleaned frame into `timestamp_utc` plus renamed value
    /// columns, one row per hour, sorted. Returns `None` for an empty frame.
    pub fn prepare(&self, cleaned: &DataFrame) -> Result<Option<DataFrame>, MergeError> {
        if cleaned.height() == 0 {
            return Ok(None);
        }
        self.require(cleaned, TIMESTAMP_COLUMN)?;

        let filtered = match self.row_filter {
            Some((column, wanted)) if has_column(cleaned, column) => cleaned
                .clone()
                .lazy()
                .filter(col(column).cast(DataType::String).eq(lit(wanted)))
                .collect()?,
            _ => cleaned.clone(),
        };

        let hours = timestamp_millis(&filtered, TIMESTAMP_COLUMN)?
            .into_iter()
            .map(|ms| ms.map(floor_to_hour));
        let mut columns: Vec<Column> = vec![datetime_series(TIMESTAMP_COLUMN, hours).into()];
        for column in self.columns {
            if !has_column(&filtered, column.cleaned) {
                if column.required {
                    return Err(self.missing(column.cleaned));
                }
                continue;
            }
            let series = match column.kind {
                ValueKind::Float => float_values(&filtered, column.cleaned)?
                    .with_name(column.merged.into())
                    .into_series(),
                ValueKind::Flag => bool_values(&filtered, column.cleaned)?
                    .with_name(column.merged.into())
                    .into_series(),
                ValueKind::Text => Series::new(
                    column.merged.into(),
                    string_values(&filtered, column.cleaned)?,
                ),
            };
            columns.push(series.into());
        }
        let shaped = DataFrame::new(columns)?;
        let shaped = drop_null_timestamps(&shaped, self.source.display_name())?;
        if shaped.height() == 0 {
            return Ok(None);
        }

        let reduced = match self.reduction {
            HourlyReduction::First => {
                keep_first(&sort_by_timestamp(&shaped)?, &[TIMESTAMP_COLUMN])?
            }
            HourlyReduction::Median { count_column } => {
                let mut aggregations: Vec<Expr> = shaped
                    .get_column_names()
                    .into_iter()
                    .filter(|name| name.as_str() != TIMESTAMP_COLUMN)
                    .map(|name| col(name.clone()).median())
                    .collect();
                // Readings with a primary value, not rows.
                let counted = self
                    .columns
                    .first()
                    .map_or(TIMESTAMP_COLUMN, |column| column.merged);
                aggregations.push(col(counted).count().alias(count_column));
                let grouped = shaped
                    .lazy()
                    .group_by([col(TIMESTAMP_COLUMN)])
                    .agg(aggregations)
                    .collect()?;
                sort_by_timestamp(&grouped)?
            }
        };
        Ok(Some(reduced))
    }

    fn require(&self, df: &DataFrame, column: &str) -> Result<(), MergeError> {
        if has_column(df, column) {
            Ok(())
        } else {
            Err(self.missing(column))
        }
    }

    fn missing(&self, column: &str) -> MergeError {
        MergeError::MissingColumn {
            provider: self.source,
            column: column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ms(hour: u32, minute: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 7, 1, hour, minute, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_airnow_keeps_only_pm25() -> Result<(), Box<dyn std::error::Error>> {
        let cleaned = df!(
            "timestamp_utc" => &["2024-07-01T01:00:00Z", "2024-07-01T01:00:00Z", "2024-07-01T02:00:00Z"],
            "ParameterName" => &["OZONE", "PM2.5", "PM2.5"],
            "AQI" => &["55", "21", "25"],
        )?;
        let prepared = MergeProfile::for_source(Source::AirNow)
            .prepare(&cleaned)?
            .ok_or("expected rows")?;
        assert_eq!(prepared.width(), 2);
        let aqi: Vec<Option<f64>> = prepared.column("aqi_airnow")?.f64()?.into_iter().collect();
        assert_eq!(aqi, vec![Some(21.0), Some(25.0)]);
        Ok(())
    }

    #[test]
    fn test_purpleair_hourly_median_and_sensor_count() -> Result<(), Box<dyn std::error::Error>>
    {
        let mut cleaned = df!(
            "sensor_index" => &["1", "2", "3", "1"],
            "pm2.5_atm" => &["2.0", "4.0", "9.0", "5.0"],
            "humidity" => &["60", "70", "NaN", "65"],
        )?;
        cleaned.with_column(datetime_series(
            TIMESTAMP_COLUMN,
            [Some(ms(3, 0)), Some(ms(3, 0)), Some(ms(3, 0)), Some(ms(4, 0))],
        ))?;

        let prepared = MergeProfile::for_source(Source::PurpleAir)
            .prepare(&cleaned)?
            .ok_or("expected rows")?;
        assert_eq!(prepared.height(), 2);
        assert_eq!(
            timestamp_millis(&prepared, TIMESTAMP_COLUMN)?,
            vec![Some(ms(3, 0)), Some(ms(4, 0))]
        );
        let pm: Vec<Option<f64>> = prepared.column("pm25_purpleair")?.f64()?.into_iter().collect();
        assert_eq!(pm, vec![Some(4.0), Some(5.0)]);
        let humidity: Vec<Option<f64>> = prepared.column("humidity")?.f64()?.into_iter().collect();
        assert_eq!(humidity, vec![Some(65.0), Some(65.0)]);
        let counts = prepared
            .column("sensor_count_purpleair")?
            .cast(&DataType::Int64)?;
        let counts: Vec<Option<i64>> = counts.i64()?.into_iter().collect();
        assert_eq!(counts, vec![Some(3), Some(1)]);
        Ok(())
    }

    #[test]
    fn test_sensor_count_skips_missing_readings() -> Result<(), Box<dyn std::error::Error>> {
        let mut cleaned = df!(
            "sensor_index" => &["1", "2", "3"],
            "pm2.5_atm" => &[Some("2.0"), None, Some("NaN")],
        )?;
        cleaned.with_column(datetime_series(
            TIMESTAMP_COLUMN,
            [Some(ms(5, 0)), Some(ms(5, 10)), Some(ms(5, 20))],
        ))?;

        let prepared = MergeProfile::for_source(Source::PurpleAir)
            .prepare(&cleaned)?
            .ok_or("expected rows")?;
        let counts = prepared
            .column("sensor_count_purpleair")?
            .cast(&DataType::Int64)?;
        let counts: Vec<Option<i64>> = counts.i64()?.into_iter().collect();
        assert_eq!(counts, vec![Some(1)]);
        let pm: Vec<Option<f64>> = prepared.column("pm25_purpleair")?.f64()?.into_iter().collect();
        assert_eq!(pm, vec![Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_hvo_pull_times_are_floored() -> Result<(), Box<dyn std::error::Error>> {
        let cleaned = df!(
            "timestamp_utc" => &["2024-07-01T05:07:00Z", "2024-07-01T05:59:00Z", "2024-07-01T06:01:00Z"],
            "alertLevel" => &["WATCH", "WARNING", "WARNING"],
            "colorCode" => &["ORANGE", "RED", "RED"],
            "alert_change" => &[true, true, false],
            "color_change" => &["true", "true", "false"],
        )?;
        let prepared = MergeProfile::for_source(Source::Hvo)
            .prepare(&cleaned)?
            .ok_or("expected rows")?;
        assert_eq!(
            timestamp_millis(&prepared, TIMESTAMP_COLUMN)?,
            vec![Some(ms(5, 0)), Some(ms(6, 0))]
        );
        let levels: Vec<Option<&str>> =
            prepared.column("alert_level_hvo")?.str()?.into_iter().collect();
        assert_eq!(levels, vec![Some("WATCH"), Some("WARNING")]);
        let flags: Vec<Option<bool>> =
            prepared.column("color_change_hvo")?.bool()?.into_iter().collect();
        assert_eq!(flags, vec![Some(true), Some(false)]);
        Ok(())
    }

    #[test]
    fn test_missing_required_value_column() -> Result<(), Box<dyn std::error::Error>> {
        let cleaned = df!("timestamp_utc" => &["2024-07-01T05:00:00Z"], "other" => &[1.0])?;
        let result = MergeProfile::for_source(Source::Aqs).prepare(&cleaned);
        assert!(matches!(
            result,
            Err(MergeError::MissingColumn { ref column, .. }) if column == "sample_measurement"
        ));
        Ok(())
    }

    #[test]
    fn test_empty_frame_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let prepared = MergeProfile::for_source(Source::Aqs).prepare(&DataFrame::empty())?;
        assert!(prepared.is_none());
        Ok(())
    }
}
