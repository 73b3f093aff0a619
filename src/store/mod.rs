pub mod csv_store;
pub mod error;
