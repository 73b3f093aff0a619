pub mod coverage;
pub mod error;
pub mod grid;
pub mod merger;
pub mod profile;
