//! Dataset Module - Timeseries loading
//!
//! Reads `timestamp,value` CSV files, either from disk or downloaded once
//! into a local cache directory.

pub mod fetch;
pub mod loader;
pub mod record;


pub use loader::{load_series, DataSource};
pub use record::{Series, SeriesSummary};
