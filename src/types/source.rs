//! Identifies the five upstream data sources and the file names and archive
//! keys that belong to each of them.

use crate::archive::window::RefreshPolicy;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the upstream providers feeding the hourly table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// EPA AirNow crowd-reported AQI observations for a reporting area.
    AirNow,
    /// EPA Air Quality System regulatory monitor samples (PM2.5, parameter 88101).
    Aqs,
    /// PurpleAir low-cost sensor readings.
    PurpleAir,
    /// USGS Hawaiian Volcano Observatory alert level and aviation color code notices.
    Hvo,
    /// Open-Meteo ERA5 hourly reanalysis.
    OpenMeteo,
}

impl Source {
    /// Every source, in the order the cleaning run visits them.
    pub const ALL: [Source; 5] = [
        Source::AirNow,
        Source::Aqs,
        Source::PurpleAir,
        Source::Hvo,
        Source::OpenMeteo,
    ];

    /// Precedence order used when joining cleaned sources onto the grid.
    pub const MERGE_ORDER: [Source; 5] = [
        Source::Aqs,
        Source::AirNow,
        Source::PurpleAir,
        Source::OpenMeteo,
        Source::Hvo,
    ];

    /// Short lowercase name used in file names and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Source::AirNow => "airnow",
            Source::Aqs => "aqs",
            Source::PurpleAir => "purpleair",
            Source::Hvo => "hvo",
            Source::OpenMeteo => "openmeteo",
        }
    }

    /// Human readable provider name for log output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Source::AirNow => "AirNow",
            Source::Aqs => "AQS",
            Source::PurpleAir => "PurpleAir",
            Source::Hvo => "HVO",
            Source::OpenMeteo => "Open-Meteo",
        }
    }

    pub(crate) fn raw_file_name(&self) -> &'static str {
        match self {
            Source::AirNow => "airnow_aqi_all.csv",
            Source::Aqs => "aqs_all.csv",
            Source::PurpleAir => "purpleair_all.csv",
            Source::Hvo => "hvo_status.csv",
            Source::OpenMeteo => "openmeteo_hilo_hourly.csv",
        }
    }

    pub(crate) fn interim_file_name(&self) -> String {
        format!("{}_clean.csv", self.slug())
    }

    /// Raw columns identifying one fetched record in the persisted archive.
    ///
    /// Appending a batch keeps only rows whose key is not archived yet.
    pub fn archive_key(&self) -> &'static [&'static str] {
        match self {
            Source::AirNow => &["ReportingArea", "ParameterName", "DateObserved", "HourObserved"],
            Source::Aqs => &[
                "state_code",
                "county_code",
                "site_number",
                "parameter_code",
                "date_gmt",
                "time_gmt",
            ],
            Source::PurpleAir => &["sensor_index", "time_stamp"],
            Source::Hvo => &["noticeId", "timestamp_utc"],
            Source::OpenMeteo => &["timestamp_utc"],
        }
    }

    /// How far back the next fetch for this source should reach.
    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy::for_source(*self)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[derive(Debug, Error)]
#[error("Unknown source '{0}', expected one of: airnow, aqs, purpleair, hvo, openmeteo")]
pub struct UnknownSourceError(pub String);

impl FromStr for Source {
    type Err = UnknownSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        Source::ALL
            .into_iter()
            .find(|source| source.slug() == wanted)
            .ok_or_else(|| UnknownSourceError(s.to_string()))
    }
}
