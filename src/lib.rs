mod archive;
mod error;
mod frame;
mod merge;
mod normalize;
mod pipeline;
mod store;
mod types;
mod utils;

pub use error::IntegrationError;
pub use pipeline::*;

pub use frame::TIMESTAMP_COLUMN;
pub use types::data_paths::DataPaths;
pub use types::into_utc_trait::IntoUtcDateTime;
pub use types::source::{Source, UnknownSourceError};

pub use normalize::airnow::AIRNOW_HEADER;
pub use normalize::{
    normalizer_for, AirNowNormalizer, AqsNormalizer, HvoNormalizer, Normalizer,
    OpenMeteoNormalizer, PurpleAirNormalizer,
};

pub use merge::coverage::{coverage, ColumnCoverage};
pub use merge::grid::build_hourly_grid;
pub use merge::merger::SourceMerger;
pub use merge::profile::{HourlyReduction, MergeProfile, ValueColumn, ValueKind};

pub use archive::append::{append_deduplicated, AppendOutcome, AppendSummary, NEW_NOTICE_COLUMN};
pub use archive::window::{plan_fetch_window, FetchWindow, RefreshPolicy};

pub use store::csv_store::{read_csv_if_exists, write_csv_atomic, DataStore};

pub use archive::error::ArchiveError;
pub use merge::error::MergeError;
pub use normalize::error::NormalizeError;
pub use store::error::StoreError;
