use crate::frame::columns::{datetime_series, format_timestamps, has_column, timestamp_millis};
use crate::frame::TIMESTAMP_COLUMN;
use crate::store::error::StoreError;
use crate::types::data_paths::DataPaths;
use crate::types::source::Source;
use log::{debug, info};
use polars::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads and writes the CSV artifacts below a [`DataPaths`] root.
///
/// Every file is read with all columns as text so no provider value is
/// reinterpreted on the way in. Writes go to a temporary file next to the
/// target which then replaces it in one rename.
#[derive(Debug, Clone)]
pub struct DataStore {
    paths: DataPaths,
}

impl DataStore {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &DataPaths {
        &self.paths
    }

    /// Reads a source's raw archive, `None` if it has not been created yet.
    pub fn read_raw(&self, source: Source) -> Result<Option<DataFrame>, StoreError> {
        read_csv_if_exists(&self.paths.raw_file(source))
    }

    pub fn write_raw(&self, source: Source, df: &DataFrame) -> Result<(), StoreError> {
        write_csv_atomic(&self.paths.raw_file(source), df)
    }

    /// Reads a source's cleaned table with `timestamp_utc` parsed back into
    /// a UTC datetime column. A missing file reads as an empty frame.
    pub fn read_interim(&self, source: Source) -> Result<DataFrame, StoreError> {
        let Some(mut df) = read_csv_if_exists(&self.paths.interim_file(source))? else {
            return Ok(DataFrame::empty());
        };
        if has_column(&df, TIMESTAMP_COLUMN) {
            let millis = timestamp_millis(&df, TIMESTAMP_COLUMN)?;
            df.with_column(datetime_series(TIMESTAMP_COLUMN, millis))?;
        }
        Ok(df)
    }

    pub fn write_interim(&self, source: Source, df: &DataFrame) -> Result<(), StoreError> {
        write_csv_atomic(&self.paths.interim_file(source), df)
    }

    pub fn read_merged(&self) -> Result<Option<DataFrame>, StoreError> {
        read_csv_if_exists(&self.paths.merged_file())
    }

    pub fn write_merged(&self, df: &DataFrame) -> Result<(), StoreError> {
        write_csv_atomic(&self.paths.merged_file(), df)
    }
}

/// Reads a CSV file with a header row, every column as `String`.
///
/// Returns `None` if the file does not exist and an empty frame if it has
/// no content at all.
pub fn read_csv_if_exists(path: &Path) -> Result<Option<DataFrame>, StoreError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No file at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(StoreError::Metadata(path.to_path_buf(), e)),
    };
    if metadata.len() == 0 {
        return Ok(Some(DataFrame::empty()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| StoreError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| StoreError::CsvRead(path.to_path_buf(), e))?;
    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(Some(df))
}

/// Writes `df` as CSV to `path`, replacing any previous file atomically.
///
/// Datetime columns are written as ISO-8601 UTC (`2024-01-01T00:00:00Z`).
/// Parent directories are created as needed.
pub fn write_csv_atomic(path: &Path, df: &DataFrame) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::DirCreation(dir.to_path_buf(), e))?;

    let mut rendered = format_timestamps(df)?;
    let mut temp_file =
        NamedTempFile::new_in(dir).map_err(|e| StoreError::WriteIo(path.to_path_buf(), e))?;
    CsvWriter::new(&mut temp_file)
        .include_header(true)
        .finish(&mut rendered)
        .map_err(|e| StoreError::CsvWrite(path.to_path_buf(), e))?;
    temp_file
        .flush()
        .map_err(|e| StoreError::WriteIo(path.to_path_buf(), e))?;
    temp_file
        .persist(path)
        .map_err(|e| StoreError::Persist(path.to_path_buf(), e.error))?;

    info!(
        "Saved {} rows x {} columns to {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(())
}
