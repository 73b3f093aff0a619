//! File layout of the persisted artifacts below a data root.

use crate::types::source::Source;
use std::path::{Path, PathBuf};

/// Locations of the raw archives, interim cleaned tables and the processed
/// merged table.
///
/// ```text
/// <root>/raw/<source>/<archive>.csv
/// <root>/interim/<source>_clean.csv
/// <root>/processed/merged_all.csv
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn interim_dir(&self) -> PathBuf {
        self.root.join("interim")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn raw_file(&self, source: Source) -> PathBuf {
        self.raw_dir()
            .join(source.slug())
            .join(source.raw_file_name())
    }

    pub fn interim_file(&self, source: Source) -> PathBuf {
        self.interim_dir().join(source.interim_file_name())
    }

    pub fn merged_file(&self) -> PathBuf {
        self.processed_dir().join("merged_all.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let paths = DataPaths::new("/srv/air");
        assert_eq!(
            paths.raw_file(Source::Aqs),
            PathBuf::from("/srv/air/raw/aqs/aqs_all.csv")
        );
        assert_eq!(
            paths.raw_file(Source::Hvo),
            PathBuf::from("/srv/air/raw/hvo/hvo_status.csv")
        );
        assert_eq!(
            paths.interim_file(Source::AirNow),
            PathBuf::from("/srv/air/interim/airnow_clean.csv")
        );
        assert_eq!(
            paths.merged_file(),
            PathBuf::from("/srv/air/processed/merged_all.csv")
        );
    }
}
