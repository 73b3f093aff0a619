pub mod columns;
pub mod timestamp;

/// Name of the canonical UTC timestamp column shared by every cleaned,
/// merged and archived table.
pub const TIMESTAMP_COLUMN: &str = "timestamp_utc";
