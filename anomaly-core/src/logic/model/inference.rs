//! Detector - a trained autoencoder plus everything needed to score a series
//!
//! Training, persistence and batch scoring live here; streaming scoring of
//! single windows goes through `score_window` (see `buffer.rs`).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use candle_core::{Device, ModuleT, Tensor};
use chrono::Utc;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::autoencoder::{ConvAutoencoder, ModelConfig};
use super::metadata::{self, ModelMetadata, TrainingSummary, METADATA_VERSION};
use super::threshold::ThresholdConfig;
use super::trainer::{Trainer, TrainingConfig, TrainingHistory};
use crate::logic::dataset::Series;
use crate::logic::detection::DetectionResult;
use crate::logic::error::{Error, Result};
use crate::logic::features::{create_sequences, Normalizer};

/// Engine Status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub run_id: Uuid,
    pub time_steps: usize,
    pub threshold: f32,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

/// Everything produced by a training run
pub struct TrainingOutcome {
    pub detector: Detector,
    pub history: TrainingHistory,
    /// Normalized training windows
    pub windows: Array3<f32>,
    /// Per-window training MAE the threshold was derived from
    pub train_errors: Vec<f32>,
}

pub struct Detector {
    model: ConvAutoencoder,
    metadata: ModelMetadata,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl Detector {
    fn from_parts(model: ConvAutoencoder, metadata: ModelMetadata) -> Self {
        Self {
            model,
            metadata,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Normalize, window, fit the autoencoder and derive the threshold
    pub fn train(
        series: &Series,
        model_config: ModelConfig,
        training: TrainingConfig,
        threshold_config: ThresholdConfig,
        device: &Device,
    ) -> Result<TrainingOutcome> {
        let values = series.values();
        let normalizer = Normalizer::fit(&values)?;
        let windows = create_sequences(&normalizer.transform(&values), model_config.time_steps)?;
        log::info!("Training input shape: {:?}", windows.shape());

        let model = ConvAutoencoder::new(model_config.clone(), device)?;
        log::info!("Autoencoder has {} parameters", model.parameter_count());

        let history = Trainer::new(training.clone()).fit(&model, &windows)?;

        let train_errors = model.reconstruction_mae(&windows, training.batch_size)?;
        let threshold = threshold_config.compute(&train_errors)?;
        log::info!(
            "Reconstruction error threshold: {:.4} ({}, max train MAE {:.4})",
            threshold.threshold,
            threshold.strategy,
            threshold.max
        );

        let metadata = ModelMetadata {
            version: METADATA_VERSION,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            train_series: series.name.clone(),
            model: model_config,
            training,
            summary: TrainingSummary::from(&history),
            normalizer,
            threshold_config,
            threshold,
            weights_sha256: String::new(),
        };

        Ok(TrainingOutcome {
            detector: Self::from_parts(model, metadata),
            history,
            windows,
            train_errors,
        })
    }

    /// Write weights and metadata into `dir`
    pub fn save(&mut self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let weights = metadata::weights_path(dir);
        self.model.save_weights(&weights)?;

        self.metadata.weights_sha256 = metadata::file_sha256(&weights)?;
        self.metadata.write(dir)?;

        log::info!("Model saved to {} (run {})", dir.display(), self.metadata.run_id);
        Ok(())
    }

    /// Load a model saved with `save`, verifying the weights digest
    pub fn load(dir: &Path, device: &Device) -> Result<Self> {
        log::info!("Loading model from: {}", dir.display());

        let metadata = ModelMetadata::read(dir)?;
        metadata.verify_weights(dir)?;

        let mut model = ConvAutoencoder::new(metadata.model.clone(), device)?;
        model.load_weights(&metadata::weights_path(dir))?;

        log::info!(
            "Model loaded successfully (run {}, trained {})",
            metadata.run_id,
            metadata.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(Self::from_parts(model, metadata))
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model(&self) -> &ConvAutoencoder {
        &self.model
    }

    pub fn time_steps(&self) -> usize {
        self.metadata.model.time_steps
    }

    pub fn threshold(&self) -> f32 {
        self.metadata.threshold.threshold
    }

    fn batch_size(&self) -> usize {
        self.metadata.training.batch_size
    }

    /// Normalize with the training statistics, window, and compute per-window MAE
    pub fn score(&self, series: &Series) -> Result<Vec<f32>> {
        let normalized = self.metadata.normalizer.transform(&series.values());
        let windows = create_sequences(&normalized, self.time_steps())?;
        self.model.reconstruction_mae(&windows, self.batch_size())
    }

    /// Full detection over a series
    pub fn detect(&self, series: &Series) -> Result<DetectionResult> {
        let start = Instant::now();
        let errors = self.score(series)?;
        let count = errors.len();
        let result = DetectionResult::evaluate(
            series,
            errors,
            &self.metadata.threshold,
            self.time_steps(),
        );

        log::info!(
            "Scored {} windows of '{}' in {} ms: {} anomalous windows, {} anomalous points",
            count,
            series.name,
            start.elapsed().as_millis(),
            result.anomalous_windows(),
            result.anomalous_points().len()
        );
        Ok(result)
    }

    /// MAE of one already-normalized window
    pub fn score_window(&self, window: &[f32]) -> Result<f32> {
        let t = self.time_steps();
        if window.len() != t {
            return Err(Error::Config(format!(
                "window has {} values, model expects {}",
                window.len(),
                t
            )));
        }

        let start = Instant::now();
        let xs = Tensor::from_slice(window, (1, 1, t), self.model.device())?;
        let ys = self.model.forward_t(&xs, false)?;
        let mae = ys.sub(&xs)?.abs()?.mean_all()?.to_scalar::<f32>()?;

        self.latency_sum_us
            .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        Ok(mae)
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            run_id: self.metadata.run_id,
            time_steps: self.time_steps(),
            threshold: self.threshold(),
            inference_device: format!("{:?}", self.model.device()),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}
