use crate::types::source::Source;
use polars::error::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No observations in any source, cannot build an hourly grid")]
    NoObservations,

    #[error("Missing value column '{column}' in cleaned {provider} data")]
    MissingColumn { provider: Source, column: String },

    #[error("Merged table has {found} rows but the hourly grid has {expected}")]
    RowCountDrift { expected: usize, found: usize },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
