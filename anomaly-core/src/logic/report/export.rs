//! Plot-ready CSV exports
//!
//! Each file maps to one of the usual plots: raw series with anomalies
//! highlighted, loss curves, error distribution, first window vs reconstruction.

use std::fs;
use std::path::Path;

use ndarray::{Array3, Axis};

use crate::constants::TIMESTAMP_FORMAT;
use crate::logic::dataset::Series;
use crate::logic::error::{Error, Result};
use crate::logic::model::TrainingHistory;

fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(csv::Writer::from_path(path)?)
}

/// `timestamp,value,anomaly`
pub fn export_series_csv(path: &Path, series: &Series, mask: &[bool]) -> Result<usize> {
    if mask.len() != series.len() {
        return Err(Error::Config(format!(
            "mask has {} entries, series has {}",
            mask.len(),
            series.len()
        )));
    }

    let mut w = writer(path)?;
    w.write_record(["timestamp", "value", "anomaly"])?;
    for (sample, &flag) in series.samples.iter().zip(mask) {
        w.write_record([
            sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            sample.value.to_string(),
            (flag as u8).to_string(),
        ])?;
    }
    w.flush()?;

    log::debug!("Exported {} rows to {}", series.len(), path.display());
    Ok(series.len())
}

/// `epoch,train_loss,val_loss`
pub fn export_history_csv(path: &Path, history: &TrainingHistory) -> Result<usize> {
    let mut w = writer(path)?;
    w.write_record(["epoch", "train_loss", "val_loss"])?;
    for epoch in &history.epochs {
        w.write_record([
            epoch.epoch.to_string(),
            epoch.train_loss.to_string(),
            epoch.val_loss.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(history.epochs.len())
}

/// `window,mae,anomaly`
pub fn export_errors_csv(path: &Path, errors: &[f32], threshold: f32) -> Result<usize> {
    let mut w = writer(path)?;
    w.write_record(["window", "mae", "anomaly"])?;
    for (i, &e) in errors.iter().enumerate() {
        w.write_record([
            i.to_string(),
            e.to_string(),
            ((e > threshold) as u8).to_string(),
        ])?;
    }
    w.flush()?;
    Ok(errors.len())
}

/// `step,original,reconstructed` for one window
pub fn export_reconstruction_csv(
    path: &Path,
    original: &Array3<f32>,
    reconstructed: &Array3<f32>,
    window: usize,
) -> Result<usize> {
    if original.dim() != reconstructed.dim() {
        return Err(Error::Config(format!(
            "shape mismatch: {:?} vs {:?}",
            original.dim(),
            reconstructed.dim()
        )));
    }
    if window >= original.len_of(Axis(0)) {
        return Err(Error::Config(format!("window {} out of range", window)));
    }

    let a = original.index_axis(Axis(0), window);
    let b = reconstructed.index_axis(Axis(0), window);

    let mut w = writer(path)?;
    w.write_record(["step", "original", "reconstructed"])?;
    for (step, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        w.write_record([step.to_string(), x.to_string(), y.to_string()])?;
    }
    w.flush()?;
    Ok(a.len())
}
