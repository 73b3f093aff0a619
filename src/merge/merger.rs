use crate::frame::columns::{keep_first, sort_by_timestamp};
use crate::frame::TIMESTAMP_COLUMN;
use crate::merge::error::MergeError;
use crate::merge::grid::build_hourly_grid;
use crate::merge::profile::MergeProfile;
use crate::types::source::Source;
use log::info;
use polars::prelude::*;
use std::collections::HashMap;

/// Joins cleaned sources onto the hourly grid in a fixed precedence order.
///
/// Every source is first shaped by its [`MergeProfile`] into one row per
/// hour. The grid spans all shaped sources and each source is left-joined
/// on `timestamp_utc`, so the result holds exactly one row per grid hour
/// with missing values where a source has no data.
#[derive(Debug, Clone)]
pub struct SourceMerger {
    profiles: Vec<MergeProfile>,
}

impl Default for SourceMerger {
    fn default() -> Self {
        Self::new(Source::MERGE_ORDER.into_iter().map(MergeProfile::for_source))
    }
}

impl SourceMerger {
    /// Creates a merger that joins sources in the order of `profiles`.
    pub fn new(profiles: impl IntoIterator<Item = MergeProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().collect(),
        }
    }

    /// Merges cleaned frames keyed by source.
    ///
    /// Sources without an entry, or with an empty frame, contribute nothing.
    ///
    /// # Errors
    ///
    /// * [`MergeError::NoObservations`] if no source holds any row.
    /// * [`MergeError::MissingColumn`] if a cleaned frame lacks a required
    ///   value column.
    pub fn merge(&self, cleaned: &HashMap<Source, DataFrame>) -> Result<DataFrame, MergeError> {
        let mut prepared: Vec<(Source, DataFrame)> = Vec::with_capacity(self.profiles.len());
        for profile in &self.profiles {
            let Some(frame) = cleaned.get(&profile.source) else {
                info!("{}: no cleaned data, skipping", profile.source.display_name());
                continue;
            };
            match profile.prepare(frame)? {
                Some(shaped) => prepared.push((profile.source, shaped)),
                None => info!("{}: cleaned data is empty, skipping", profile.source.display_name()),
            }
        }

        let frames: Vec<DataFrame> = prepared.iter().map(|(_, frame)| frame.clone()).collect();
        let grid = build_hourly_grid(&frames)?;
        let expected = grid.height();

        let mut merged = grid.lazy();
        for (source, shaped) in prepared {
            info!(
                "Joining {} ({} hourly rows) onto the grid",
                source.display_name(),
                shaped.height()
            );
            merged = merged.left_join(shaped.lazy(), col(TIMESTAMP_COLUMN), col(TIMESTAMP_COLUMN));
        }
        let merged = merged.collect()?;
        let merged = sort_by_timestamp(&keep_first(&merged, &[TIMESTAMP_COLUMN])?)?;

        if merged.height() != expected {
            return Err(MergeError::RowCountDrift {
                expected,
                found: merged.height(),
            });
        }
        info!(
            "Merged table: {} rows x {} columns",
            merged.height(),
            merged.width()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::columns::{datetime_series, timestamp_millis};
    use crate::frame::timestamp::MILLIS_PER_HOUR;
    use chrono::{TimeZone, Utc};

    fn hour(h: i64) -> i64 {
        Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0)
            .unwrap()
            .timestamp_millis()
            + h * MILLIS_PER_HOUR
    }

    fn with_hours(mut df: DataFrame, hours: &[i64]) -> PolarsResult<DataFrame> {
        df.with_column(datetime_series(
            TIMESTAMP_COLUMN,
            hours.iter().map(|h| Some(hour(*h))),
        ))?;
        Ok(df)
    }

    fn aqs_and_airnow() -> PolarsResult<HashMap<Source, DataFrame>> {
        let aqs = with_hours(
            df!("sample_measurement" => &["5.0", "6.0", "8.0"])?,
            &[0, 1, 3],
        )?;
        let airnow = with_hours(
            df!("ParameterName" => &["PM2.5", "PM2.5"], "AQI" => &["20", "22"])?,
            &[1, 2],
        )?;
        Ok(HashMap::from([(Source::Aqs, aqs), (Source::AirNow, airnow)]))
    }

    #[test]
    fn test_gaps_become_missing_values() -> Result<(), Box<dyn std::error::Error>> {
        let merged = SourceMerger::default().merge(&aqs_and_airnow()?)?;

        assert_eq!(merged.height(), 4);
        assert_eq!(merged.width(), 3);
        assert_eq!(
            timestamp_millis(&merged, TIMESTAMP_COLUMN)?,
            (0..4).map(|h| Some(hour(h))).collect::<Vec<_>>()
        );
        let aqs: Vec<Option<f64>> = merged.column("pm25_aqs")?.f64()?.into_iter().collect();
        assert_eq!(aqs, vec![Some(5.0), Some(6.0), None, Some(8.0)]);
        let airnow: Vec<Option<f64>> = merged.column("aqi_airnow")?.f64()?.into_iter().collect();
        assert_eq!(airnow, vec![None, Some(20.0), Some(22.0), None]);
        Ok(())
    }

    #[test]
    fn test_merge_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let cleaned = aqs_and_airnow()?;
        let first = SourceMerger::default().merge(&cleaned)?;
        let second = SourceMerger::default().merge(&cleaned)?;
        assert!(first.equals_missing(&second));
        Ok(())
    }

    #[test]
    fn test_column_order_follows_precedence() -> Result<(), Box<dyn std::error::Error>> {
        let mut cleaned = aqs_and_airnow()?;
        let hvo = with_hours(
            df!(
                "alertLevel" => &["WATCH"],
                "colorCode" => &["ORANGE"],
                "alert_change" => &[true],
                "color_change" => &[true],
            )?,
            &[2],
        )?;
        cleaned.insert(Source::Hvo, hvo);
        cleaned.insert(Source::PurpleAir, DataFrame::empty());

        let merged = SourceMerger::default().merge(&cleaned)?;
        let names: Vec<&str> = merged
            .get_column_names()
            .into_iter()
            .map(|name| name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                TIMESTAMP_COLUMN,
                "pm25_aqs",
                "aqi_airnow",
                "alert_level_hvo",
                "color_code_hvo",
                "alert_change_hvo",
                "color_change_hvo"
            ]
        );
        assert_eq!(merged.height(), 4);
        Ok(())
    }

    #[test]
    fn test_nothing_to_merge() {
        let result = SourceMerger::default().merge(&HashMap::new());
        assert!(matches!(result, Err(MergeError::NoObservations)));
    }
}
