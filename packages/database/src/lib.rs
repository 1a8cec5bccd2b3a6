#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Durable earthquake storage for the quake map.
//!
//! Events live in a single `DuckDB` file inside the data directory (see
//! [`paths::DataDir`]). The [`store::EarthquakeStore`] owns that file: it
//! suppresses duplicates on the full six-field identity tuple and answers
//! ranked top-K queries.

pub mod paths;
pub mod store;

pub use store::EarthquakeStore;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error (e.g. creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be converted back into a record.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
