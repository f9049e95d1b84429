//! Report Module - summaries and plot-ready exports
//!
//! Nothing is drawn here: the CSV files are shaped for any plotting tool, and
//! the JSON report carries the numbers the CLI logs.

pub mod export;

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::dataset::SeriesSummary;
use crate::logic::detection::{DetectionResult, TimedRun};
use crate::logic::error::Result;
use crate::logic::model::{ModelMetadata, ThresholdStats};

pub use export::{
    export_errors_csv, export_history_csv, export_reconstruction_csv, export_series_csv,
};

/// One histogram bucket `[lower, upper)`, the last bucket is closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f32,
    pub upper: f32,
    pub count: usize,
}

/// Equal-width histogram over the value range
pub fn histogram(values: &[f32], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let width = if max > min { (max - min) / bins as f32 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f32,
            upper: min + width * (i + 1) as f32,
            count,
        })
        .collect()
}

/// Log a histogram as text bars
pub fn log_histogram(title: &str, bins: &[HistogramBin]) {
    let peak = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    log::info!("{}", title);
    for bin in bins {
        let bar = "#".repeat(bin.count * 40 / peak);
        log::info!("  [{:>8.4}, {:>8.4}) {:>6} {}", bin.lower, bin.upper, bin.count, bar);
    }
}

/// JSON report of one detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub generated_at: DateTime<Utc>,
    pub model_run_id: Uuid,
    pub train_series: String,
    pub test_series: SeriesSummary,
    pub time_steps: usize,
    pub threshold: ThresholdStats,
    pub windows: usize,
    pub anomalous_windows: usize,
    pub anomalous_points: usize,
    pub runs: Vec<TimedRun>,
    pub error_histogram: Vec<HistogramBin>,
}

impl DetectionReport {
    pub fn new(metadata: &ModelMetadata, test: SeriesSummary, result: &DetectionResult) -> Self {
        Self {
            generated_at: Utc::now(),
            model_run_id: metadata.run_id,
            train_series: metadata.train_series.clone(),
            test_series: test,
            time_steps: metadata.model.time_steps,
            threshold: metadata.threshold.clone(),
            windows: result.window_errors.len(),
            anomalous_windows: result.anomalous_windows(),
            anomalous_points: result.anomalous_points().len(),
            runs: result.runs.clone(),
            error_histogram: histogram(&result.window_errors, 50),
        }
    }
}

/// Pretty-printed JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
