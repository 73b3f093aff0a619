pub mod data_paths;
pub mod into_utc_trait;
pub mod source;
