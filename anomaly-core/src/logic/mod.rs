//! Logic Module - Business Logic & Engines
//!
//! - `dataset/` - CSV loading and download cache
//! - `features/` - normalization and sliding windows
//! - `model/` - autoencoder, training, threshold, persistence, streaming
//! - `detection/` - window flags, point mask, anomalous runs
//! - `report/` - JSON report and plot-ready exports

pub mod config;
pub mod error;

pub mod dataset;
pub mod detection;
pub mod features;
pub mod model;
pub mod report;
