pub mod append;
pub mod error;
pub mod window;
