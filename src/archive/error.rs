use crate::types::source::Source;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Missing key column '{column}' in the {side} for the {provider} archive")]
    MissingKeyColumn {
        provider: Source,
        column: String,
        side: &'static str,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
