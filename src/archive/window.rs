//! Planning which time range the next ingestion run should request.
//!
//! Providers publish on different schedules. Regulatory AQS data is
//! revised for months after the fact, ERA5 reanalysis trails real time by
//! about five days, AirNow is complete two days later and PurpleAir and
//! HVO are read live. The window returned here is what a fetcher should
//! ask for. Overlap with rows already archived is expected and removed by
//! [`crate::append_deduplicated`].

use crate::archive::error::ArchiveError;
use crate::frame::columns::{has_column, string_values, timestamp_millis};
use crate::frame::timestamp::{floor_to_hour, parse_date};
use crate::frame::TIMESTAMP_COLUMN;
use crate::types::into_utc_trait::IntoUtcDateTime;
use crate::types::source::Source;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;

/// An inclusive range of UTC instants to request from a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window covering whole days, from `first` 00:00 to `last` 23:00.
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.into_utc(),
            end: last.into_utc() + Duration::hours(23),
        }
    }

    /// Splits the window into consecutive pieces of at most `days` days.
    ///
    /// Pieces do not overlap; each one starts an hour after the previous
    /// one ends.
    pub fn chunks(&self, days: i64) -> Vec<FetchWindow> {
        let step = Duration::days(days.max(1));
        let mut pieces = Vec::new();
        let mut start = self.start;
        while start <= self.end {
            let end = (start + step - Duration::hours(1)).min(self.end);
            pieces.push(FetchWindow { start, end });
            start = end + Duration::hours(1);
        }
        pieces
    }
}

/// How far back and how far forward a source is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// One whole day, `lag_days` before today.
    SingleDay { lag_days: i64 },
    /// From the latest archived date minus `overlap_days` up to `lag_days`
    /// before today; `backfill_days` back when nothing is archived.
    TrailingOverlap {
        overlap_days: i64,
        lag_days: i64,
        backfill_days: i64,
        chunk_days: i64,
    },
    /// From the hour after the last archived timestamp up to `lag_days`
    /// before now. Needs an existing archive.
    ContinueFromLast { lag_days: i64, chunk_days: i64 },
    /// The trailing `hours` up to now.
    Lookback { hours: i64 },
    /// The current state only.
    Snapshot,
}

impl RefreshPolicy {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::AirNow => RefreshPolicy::SingleDay { lag_days: 2 },
            Source::Aqs => RefreshPolicy::TrailingOverlap {
                overlap_days: 120,
                lag_days: 2,
                backfill_days: 365,
                chunk_days: 30,
            },
            Source::PurpleAir => RefreshPolicy::Lookback { hours: 24 },
            Source::Hvo => RefreshPolicy::Snapshot,
            Source::OpenMeteo => RefreshPolicy::ContinueFromLast {
                lag_days: 5,
                chunk_days: 31,
            },
        }
    }

    /// Size of the pieces a long window should be requested in, if any.
    pub fn chunk_days(&self) -> Option<i64> {
        match self {
            RefreshPolicy::TrailingOverlap { chunk_days, .. }
            | RefreshPolicy::ContinueFromLast { chunk_days, .. } => Some(*chunk_days),
            _ => None,
        }
    }
}

/// Plans the next fetch window for `source` given its current archive.
///
/// Returns `None` when the archive is already up to date, or when the
/// source can only continue an existing archive and there is none.
pub fn plan_fetch_window(
    source: Source,
    archive: Option<&DataFrame>,
    now: DateTime<Utc>,
) -> Result<Option<FetchWindow>, ArchiveError> {
    let today = now.date_naive();
    let window = match RefreshPolicy::for_source(source) {
        RefreshPolicy::SingleDay { lag_days } => {
            let day = today - Duration::days(lag_days);
            Some(FetchWindow::days(day, day))
        }
        RefreshPolicy::TrailingOverlap {
            overlap_days,
            lag_days,
            backfill_days,
            ..
        } => {
            let last = today - Duration::days(lag_days);
            let first = match archive.map(latest_archived_date).transpose()?.flatten() {
                Some(latest) => latest - Duration::days(overlap_days),
                None => {
                    info!("{}: no archived dates, backfilling {} days", source, backfill_days);
                    last - Duration::days(backfill_days)
                }
            };
            (first <= last).then(|| FetchWindow::days(first, last))
        }
        RefreshPolicy::ContinueFromLast { lag_days, .. } => {
            let latest = archive.map(latest_archived_millis).transpose()?.flatten();
            match latest.and_then(DateTime::from_timestamp_millis) {
                None => {
                    warn!("{}: no archived timestamps to continue from", source);
                    None
                }
                Some(latest) => {
                    let start = latest + Duration::hours(1);
                    let end = DateTime::from_timestamp_millis(floor_to_hour(
                        (now - Duration::days(lag_days)).timestamp_millis(),
                    ))
                    .unwrap_or(now);
                    (start < end).then_some(FetchWindow::new(start, end))
                }
            }
        }
        RefreshPolicy::Lookback { hours } => {
            Some(FetchWindow::new(now - Duration::hours(hours), now))
        }
        RefreshPolicy::Snapshot => Some(FetchWindow::new(now, now)),
    };
    match &window {
        Some(w) => info!("{}: fetch window {} .. {}", source, w.start, w.end),
        None => info!("{}: archive is up to date", source),
    }
    Ok(window)
}

/// Latest `date_local` (or `date_gmt`) in an AQS-style archive.
fn latest_archived_date(archive: &DataFrame) -> Result<Option<NaiveDate>, ArchiveError> {
    let Some(column) = ["date_local", "date_gmt"]
        .into_iter()
        .find(|column| has_column(archive, column))
    else {
        return Ok(None);
    };
    Ok(string_values(archive, column)?
        .iter()
        .filter_map(|value| value.as_deref().and_then(parse_date))
        .max())
}

/// Latest `timestamp_utc` in an archive, floored to the hour.
fn latest_archived_millis(archive: &DataFrame) -> Result<Option<i64>, ArchiveError> {
    if !has_column(archive, TIMESTAMP_COLUMN) {
        return Ok(None);
    }
    Ok(timestamp_millis(archive, TIMESTAMP_COLUMN)?
        .into_iter()
        .flatten()
        .max()
        .map(floor_to_hour))
}
