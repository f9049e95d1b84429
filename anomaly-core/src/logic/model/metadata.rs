//! Model artifact on disk
//!
//! `<dir>/model.safetensors` holds the weights, `<dir>/metadata.json` everything
//! needed to score a new series: window length, normalizer, threshold and the
//! SHA-256 of the weights file, checked on load.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::autoencoder::ModelConfig;
use super::threshold::{ThresholdConfig, ThresholdStats};
use super::trainer::{TrainingConfig, TrainingHistory};
use crate::logic::error::{Error, Result};
use crate::logic::features::Normalizer;

pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const METADATA_FILE: &str = "metadata.json";

/// Bump when the metadata layout changes
pub const METADATA_VERSION: u32 = 1;

/// Condensed training outcome kept with the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_loss: f32,
    pub final_train_loss: Option<f32>,
    pub stopped_early: bool,
    pub train_windows: usize,
    pub val_windows: usize,
}

impl From<&TrainingHistory> for TrainingSummary {
    fn from(history: &TrainingHistory) -> Self {
        Self {
            epochs_run: history.epochs.len(),
            best_epoch: history.best_epoch,
            best_loss: history.best_loss,
            final_train_loss: history.final_train_loss(),
            stopped_early: history.stopped_early,
            train_windows: history.train_windows,
            val_windows: history.val_windows,
        }
    }
}

/// Model metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub train_series: String,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub summary: TrainingSummary,
    pub normalizer: Normalizer,
    pub threshold_config: ThresholdConfig,
    pub threshold: ThresholdStats,
    pub weights_sha256: String,
}

pub fn weights_path(dir: &Path) -> PathBuf {
    dir.join(WEIGHTS_FILE)
}

pub fn metadata_path(dir: &Path) -> PathBuf {
    dir.join(METADATA_FILE)
}

/// Hex SHA-256 of a file
pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

impl ModelMetadata {
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(metadata_path(dir), json)?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = metadata_path(dir);
        if !path.exists() {
            return Err(Error::Model(format!("Model not found: {}", path.display())));
        }

        let content = fs::read_to_string(&path)?;
        let metadata: ModelMetadata = serde_json::from_str(&content)?;
        if metadata.version != METADATA_VERSION {
            return Err(Error::Model(format!(
                "unsupported metadata version {} (expected {})",
                metadata.version, METADATA_VERSION
            )));
        }
        Ok(metadata)
    }

    /// Compare the weights file against the recorded digest
    pub fn verify_weights(&self, dir: &Path) -> Result<()> {
        let actual = file_sha256(&weights_path(dir))?;
        if actual != self.weights_sha256 {
            return Err(Error::Integrity {
                expected: self.weights_sha256.clone(),
                actual,
            });
        }
        Ok(())
    }
}
