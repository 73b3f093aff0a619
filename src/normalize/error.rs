use crate::types::source::Source;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Missing required column '{column}' for {provider} data")]
    MissingColumn { provider: Source, column: String },

    #[error("No timestamp field for {provider} data, expected one of {candidates:?}")]
    MissingTimeSource {
        provider: Source,
        candidates: Vec<String>,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
