use crate::frame::columns::{datetime_series, has_column, timestamp_millis};
use crate::frame::timestamp::{floor_to_hour, MILLIS_PER_HOUR};
use crate::frame::TIMESTAMP_COLUMN;
use crate::merge::error::MergeError;
use log::debug;
use polars::prelude::*;

/// Builds the continuous hourly UTC grid spanning every observation.
///
/// The earliest and latest `timestamp_utc` across all frames are floored to
/// the hour and every hour in between is emitted, both ends included. Empty
/// frames and frames without a `timestamp_utc` column are ignored.
///
/// # Errors
///
/// Returns [`MergeError::NoObservations`] when no frame holds a single
/// readable timestamp.
///
/// # Example
///
/// ```
/// use airgrid::build_hourly_grid;
/// use polars::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let a = df!("timestamp_utc" => &["2024-01-01T00:00:00Z", "2024-01-01T03:00:00Z"])?;
/// let b = df!("timestamp_utc" => &["2024-01-01T02:30:00Z"])?;
/// let grid = build_hourly_grid(&[a, b])?;
/// assert_eq!(grid.height(), 4);
/// # Ok(())
/// # }
/// ```
pub fn build_hourly_grid(frames: &[DataFrame]) -> Result<DataFrame, MergeError> {
    let mut bounds: Option<(i64, i64)> = None;
    for frame in frames {
        if frame.height() == 0 || !has_column(frame, TIMESTAMP_COLUMN) {
            continue;
        }
        if let Some((lo, hi)) = millis_bounds(frame)? {
            bounds = Some(match bounds {
                None => (lo, hi),
                Some((start, end)) => (start.min(lo), end.max(hi)),
            });
        }
    }
    let (start, end) = bounds.ok_or(MergeError::NoObservations)?;
    let (start, end) = (floor_to_hour(start), floor_to_hour(end));

    let hours = (start..=end)
        .step_by(MILLIS_PER_HOUR as usize)
        .map(Some);
    let grid = DataFrame::new(vec![datetime_series(TIMESTAMP_COLUMN, hours).into()])?;
    debug!("Hourly grid spans {} hours", grid.height());
    Ok(grid)
}

/// Earliest and latest `timestamp_utc` of one frame in epoch milliseconds.
fn millis_bounds(frame: &DataFrame) -> PolarsResult<Option<(i64, i64)>> {
    let column = frame.column(TIMESTAMP_COLUMN)?;
    let millis = match column.dtype() {
        DataType::Datetime(_, _) => column
            .datetime()?
            .cast_time_unit(TimeUnit::Milliseconds)
            .physical()
            .clone(),
        _ => Int64Chunked::from_iter_options(
            TIMESTAMP_COLUMN.into(),
            timestamp_millis(frame, TIMESTAMP_COLUMN)?.into_iter(),
        ),
    };
    Ok(millis.min().zip(millis.max()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::columns::datetime_series;
    use chrono::{TimeZone, Utc};
    use polars::prelude::*;

    fn at(day: u32, hour: u32, minute: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 6, day, hour, minute, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn frame(millis: &[Option<i64>]) -> PolarsResult<DataFrame> {
        DataFrame::new(vec![
            datetime_series(TIMESTAMP_COLUMN, millis.iter().copied()).into()
        ])
    }

    #[test]
    fn test_grid_is_gap_free_and_inclusive() -> Result<(), Box<dyn std::error::Error>> {
        let a = frame(&[Some(at(1, 5, 0)), Some(at(1, 2, 0))])?;
        let b = frame(&[Some(at(2, 1, 0)), None])?;
        let empty = frame(&[])?;

        let grid = build_hourly_grid(&[a, empty, b])?;
        let values: Vec<i64> = timestamp_millis(&grid, TIMESTAMP_COLUMN)?
            .into_iter()
            .flatten()
            .collect();

        assert_eq!(values.first(), Some(&at(1, 2, 0)));
        assert_eq!(values.last(), Some(&at(2, 1, 0)));
        assert_eq!(values.len(), 24);
        assert!(values.windows(2).all(|w| w[1] - w[0] == MILLIS_PER_HOUR));
        Ok(())
    }

    #[test]
    fn test_endpoints_are_floored() -> Result<(), Box<dyn std::error::Error>> {
        let a = frame(&[Some(at(1, 2, 45)), Some(at(1, 4, 10))])?;
        let grid = build_hourly_grid(&[a])?;
        assert_eq!(
            timestamp_millis(&grid, TIMESTAMP_COLUMN)?,
            vec![Some(at(1, 2, 0)), Some(at(1, 3, 0)), Some(at(1, 4, 0))]
        );
        Ok(())
    }

    #[test]
    fn test_single_observation_gives_single_hour() -> Result<(), Box<dyn std::error::Error>> {
        let grid = build_hourly_grid(&[frame(&[Some(at(3, 7, 0))])?])?;
        assert_eq!(grid.height(), 1);
        Ok(())
    }

    #[test]
    fn test_bounds_from_microsecond_column() -> Result<(), Box<dyn std::error::Error>> {
        let micros = Int64Chunked::from_iter_options(
            TIMESTAMP_COLUMN.into(),
            [Some(at(1, 6, 0) * 1_000), None, Some(at(1, 4, 30) * 1_000)].into_iter(),
        )
        .into_datetime(TimeUnit::Microseconds, Some("UTC".into()))
        .into_series();
        let grid = build_hourly_grid(&[DataFrame::new(vec![micros.into()])?])?;
        assert_eq!(
            timestamp_millis(&grid, TIMESTAMP_COLUMN)?,
            vec![Some(at(1, 4, 0)), Some(at(1, 5, 0)), Some(at(1, 6, 0))]
        );
        Ok(())
    }

    #[test]
    fn test_all_empty_is_an_error() -> Result<(), Box<dyn std::error::Error>> {
        let result = build_hourly_grid(&[frame(&[])?, frame(&[None])?, DataFrame::empty()]);
        assert!(matches!(result, Err(MergeError::NoObservations)));
        Ok(())
    }
}
