//! The main entry point tying normalization, merging and archive upkeep to
//! the CSV files below one data root.

use crate::archive::append::{append_deduplicated, AppendSummary};
use crate::archive::window::{plan_fetch_window, FetchWindow};
use crate::error::IntegrationError;
use crate::merge::coverage::coverage;
use crate::merge::merger::SourceMerger;
use crate::normalize::normalizer_for;
use crate::store::csv_store::DataStore;
use crate::types::data_paths::DataPaths;
use crate::types::source::Source;
use crate::utils::{ensure_dir_exists, get_data_dir};
use bon::bon;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// What happened to one source during [`Pipeline::clean_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanStatus {
    Cleaned { rows: usize, columns: usize },
    MissingRaw,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCleanOutcome {
    pub source: Source,
    #[serde(flatten)]
    pub status: CleanStatus,
}

/// Per-source results of a cleaning run, in [`Source::ALL`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub outcomes: Vec<SourceCleanOutcome>,
}

impl CleanReport {
    pub fn failures(&self) -> impl Iterator<Item = &SourceCleanOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, CleanStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Cleans raw provider archives, merges them onto the hourly grid and keeps
/// the raw archives up to date.
///
/// Create one with [`Pipeline::new()`] to use the per-user data folder, or
/// with [`Pipeline::with_data_folder()`] to point it at a specific root.
///
/// # Examples
///
/// ```no_run
/// # use airgrid::{IntegrationError, Pipeline};
/// # fn run() -> Result<(), IntegrationError> {
/// let pipeline = Pipeline::with_data_folder("data".into())?;
/// let report = pipeline.clean_all();
/// let merged = pipeline.merge_all()?;
/// println!("{} sources failed, {} hours merged", report.failures().count(), merged.height());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    store: DataStore,
    merger: SourceMerger,
}

#[bon]
impl Pipeline {
    /// Creates a pipeline rooted at `data_folder`.
    ///
    /// The `raw`, `interim` and `processed` folders are created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::DataDirCreation`] if one of the folders
    /// cannot be created.
    pub fn with_data_folder(data_folder: PathBuf) -> Result<Self, IntegrationError> {
        let paths = DataPaths::new(data_folder);
        for dir in [
            paths.root().to_path_buf(),
            paths.raw_dir(),
            paths.interim_dir(),
            paths.processed_dir(),
        ] {
            ensure_dir_exists(&dir).map_err(|e| IntegrationError::DataDirCreation(dir.clone(), e))?;
        }
        Ok(Self {
            store: DataStore::new(paths),
            merger: SourceMerger::default(),
        })
    }

    /// Creates a pipeline in the per-user data folder
    /// (e.g. `~/.local/share/airgrid` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::DataDirResolution`] if the platform has
    /// no such folder.
    pub fn new() -> Result<Self, IntegrationError> {
        let data_folder = get_data_dir().ok_or(IntegrationError::DataDirResolution)?;
        Self::with_data_folder(data_folder)
    }

    /// Replaces the merge precedence and shaping rules.
    pub fn with_merger(mut self, merger: SourceMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn paths(&self) -> &DataPaths {
        self.store.paths()
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Normalizes one source's raw archive and writes its interim table.
    ///
    /// Returns `None` without writing anything when the raw archive does
    /// not exist.
    pub fn clean_source(&self, source: Source) -> Result<Option<DataFrame>, IntegrationError> {
        let Some(raw) = self.store.read_raw(source)? else {
            warn!(
                "{}: raw archive {} not found",
                source.display_name(),
                self.paths().raw_file(source).display()
            );
            return Ok(None);
        };
        let cleaned = normalizer_for(source).normalize(raw)?;
        self.store.write_interim(source, &cleaned)?;
        Ok(Some(cleaned))
    }

    /// Cleans every source. A failing source is logged and reported but
    /// does not stop the others.
    pub fn clean_all(&self) -> CleanReport {
        let outcomes = Source::ALL
            .into_iter()
            .map(|source| {
                let status = match self.clean_source(source) {
                    Ok(Some(df)) => CleanStatus::Cleaned {
                        rows: df.height(),
                        columns: df.width(),
                    },
                    Ok(None) => CleanStatus::MissingRaw,
                    Err(e) => {
                        error!("{}: cleaning failed: {}", source.display_name(), e);
                        CleanStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                SourceCleanOutcome { source, status }
            })
            .collect();
        CleanReport { outcomes }
    }

    /// Merges every interim table onto the hourly grid and writes the
    /// merged table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MergeError::NoObservations`] (wrapped) if no interim
    /// table holds any row.
    pub fn merge_all(&self) -> Result<DataFrame, IntegrationError> {
        let mut cleaned = HashMap::new();
        for source in Source::ALL {
            cleaned.insert(source, self.store.read_interim(source)?);
        }
        let merged = self.merger.merge(&cleaned)?;
        self.store.write_merged(&merged)?;

        for entry in coverage(&merged) {
            info!(
                "coverage {:<28} {:>6.1}% ({} of {})",
                entry.column,
                entry.fraction * 100.0,
                entry.non_null,
                merged.height()
            );
        }
        Ok(merged)
    }

    /// Cleans every source, then merges whatever was cleaned.
    pub fn run(&self) -> Result<(CleanReport, DataFrame), IntegrationError> {
        let report = self.clean_all();
        let merged = self.merge_all()?;
        Ok((report, merged))
    }

    /// Appends a freshly fetched batch to a source's raw archive, skipping
    /// rows whose archive key is already present.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use airgrid::{Pipeline, Source};
    /// # use polars::prelude::*;
    /// # fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pipeline = Pipeline::new()?;
    /// let batch = df!(
    ///     "sensor_index" => &["1234"],
    ///     "time_stamp" => &["1704067200"],
    ///     "pm2.5_atm" => &["4.1"],
    /// )?;
    /// let summary = pipeline
    ///     .append()
    ///     .source(Source::PurpleAir)
    ///     .batch(batch)
    ///     .call()?;
    /// println!("added {} rows", summary.added_rows);
    /// # Ok(())
    /// # }
    /// ```
    #[builder]
    pub fn append(
        &self,
        source: Source,
        batch: DataFrame,
    ) -> Result<AppendSummary, IntegrationError> {
        let existing = self.store.read_raw(source)?;
        let outcome = append_deduplicated(existing.as_ref(), &batch, source)?;
        if outcome.summary.added_rows > 0 {
            self.store.write_raw(source, &outcome.frame)?;
        } else {
            info!("{}: nothing new to append", source.display_name());
        }
        Ok(outcome.summary)
    }

    /// Plans the next fetch for `source` from its raw archive.
    ///
    /// `now` defaults to the current time.
    #[builder]
    pub fn fetch_window(
        &self,
        source: Source,
        now: Option<DateTime<Utc>>,
    ) -> Result<Option<FetchWindow>, IntegrationError> {
        let now = now.unwrap_or_else(Utc::now);
        let archive = self.store.read_raw(source)?;
        Ok(plan_fetch_window(source, archive.as_ref(), now)?)
    }
}
