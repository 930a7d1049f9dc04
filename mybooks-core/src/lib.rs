//! mybooks-core: Shared infrastructure for the MyBooks client crates.
pub mod config;
pub mod error;
pub mod observability;

pub use error::ApiError;
