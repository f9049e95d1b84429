//! Training loop for the autoencoder
//!
//! - Input equals target (reconstruction)
//! - MSE loss, Adam (AdamW with zero weight decay)
//! - Last `validation_split` fraction of windows held out, taken before shuffling
//! - Training windows reshuffled every epoch with a seeded RNG
//! - Early stopping on validation loss (`min` mode, weights not restored)

use std::time::Instant;

use candle_core::{ModuleT, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use ndarray::{Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::autoencoder::ConvAutoencoder;
use crate::constants;
use crate::logic::error::{Error, Result};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of windows (from the end) used for validation, 0 disables it
    pub validation_split: f64,
    /// Epochs without improvement before stopping, 0 disables early stopping
    pub patience: usize,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: constants::DEFAULT_EPOCHS,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            validation_split: constants::DEFAULT_VALIDATION_SPLIT,
            patience: constants::DEFAULT_PATIENCE,
            seed: constants::DEFAULT_SEED,
        }
    }
}

/// Result of a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochResult {
    /// 1-indexed
    pub epoch: usize,
    pub train_loss: f32,
    pub val_loss: Option<f32>,
    pub duration_ms: u64,
}

/// Metrics accumulated across all epochs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochResult>,
    pub best_epoch: usize,
    pub best_loss: f32,
    pub stopped_early: bool,
    pub train_windows: usize,
    pub val_windows: usize,
}

impl TrainingHistory {
    pub fn final_train_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.train_loss)
    }
}

// ============================================================================
// EARLY STOPPING
// ============================================================================

/// Stops once the monitored loss has not improved for `patience` epochs
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best: f32,
    best_epoch: usize,
    wait: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best: f32::INFINITY,
            best_epoch: 0,
            wait: 0,
        }
    }

    /// Record the loss of `epoch`, returns true when training should stop
    pub fn update(&mut self, epoch: usize, loss: f32) -> bool {
        if loss < self.best {
            self.best = loss;
            self.best_epoch = epoch;
            self.wait = 0;
            return false;
        }

        self.wait += 1;
        self.patience > 0 && self.wait >= self.patience
    }

    pub fn best(&self) -> (usize, f32) {
        (self.best_epoch, self.best)
    }
}

// ============================================================================
// TRAINER
// ============================================================================

pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Split point between training and validation windows
    pub fn split(&self, count: usize) -> Result<(usize, usize)> {
        let split = self.config.validation_split;
        if !(0.0..1.0).contains(&split) {
            return Err(Error::Config(format!(
                "validation_split must be in [0, 1), got {}",
                split
            )));
        }

        let train = (count as f64 * (1.0 - split)).floor() as usize;
        let val = count - train;

        if train == 0 || (split > 0.0 && val == 0) {
            return Err(Error::InsufficientData(format!(
                "{} windows cannot be split with validation_split={}",
                count, split
            )));
        }
        Ok((train, val))
    }

    /// Fit `model` to reconstruct `windows`
    pub fn fit(&self, model: &ConvAutoencoder, windows: &Array3<f32>) -> Result<TrainingHistory> {
        let count = windows.len_of(Axis(0));
        let (n_train, n_val) = self.split(count)?;
        let batch_size = self.config.batch_size.max(1);

        log::info!(
            "Training on {} windows, validating on {} (epochs={}, batch={}, lr={})",
            n_train,
            n_val,
            self.config.epochs,
            batch_size,
            self.config.learning_rate
        );

        let all = model.batch_tensor(windows, 0, count)?;
        let train_x = all.narrow(0, 0, n_train)?;
        let val_x = if n_val > 0 {
            Some(all.narrow(0, n_train, n_val)?)
        } else {
            None
        };

        let params = ParamsAdamW {
            lr: self.config.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let mut optimizer = AdamW::new(model.varmap().all_vars(), params)?;

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut indices: Vec<u32> = (0..n_train as u32).collect();
        let mut stopper = EarlyStopping::new(self.config.patience);
        let mut history = TrainingHistory {
            train_windows: n_train,
            val_windows: n_val,
            ..Default::default()
        };

        for epoch in 1..=self.config.epochs {
            let start = Instant::now();
            indices.shuffle(&mut rng);

            let mut loss_sum = 0.0f64;
            for chunk in indices.chunks(batch_size) {
                let ids = Tensor::from_slice(chunk, chunk.len(), model.device())?;
                let batch = train_x.index_select(&ids, 0)?;

                let reconstructed = model.forward_t(&batch, true)?;
                let loss = candle_nn::loss::mse(&reconstructed, &batch)?;
                optimizer.backward_step(&loss)?;

                let value = loss.to_scalar::<f32>()?;
                if !value.is_finite() {
                    return Err(Error::Training(format!(
                        "loss became {} at epoch {}",
                        value, epoch
                    )));
                }
                loss_sum += value as f64 * chunk.len() as f64;
            }
            let train_loss = (loss_sum / n_train as f64) as f32;

            let val_loss = match &val_x {
                Some(val) => Some(evaluate(model, val, batch_size)?),
                None => None,
            };
            if let Some(v) = val_loss.filter(|v| !v.is_finite()) {
                return Err(Error::Training(format!(
                    "val_loss became {} at epoch {}",
                    v, epoch
                )));
            }

            let result = EpochResult {
                epoch,
                train_loss,
                val_loss,
                duration_ms: start.elapsed().as_millis() as u64,
            };

            match result.val_loss {
                Some(v) => log::info!(
                    "Epoch {}/{} - loss: {:.4} - val_loss: {:.4} ({} ms)",
                    epoch,
                    self.config.epochs,
                    train_loss,
                    v,
                    result.duration_ms
                ),
                None => log::info!(
                    "Epoch {}/{} - loss: {:.4} ({} ms)",
                    epoch,
                    self.config.epochs,
                    train_loss,
                    result.duration_ms
                ),
            }

            let monitored = result.val_loss.unwrap_or(train_loss);
            history.epochs.push(result);

            if stopper.update(epoch, monitored) {
                log::info!("Early stopping at epoch {}", epoch);
                history.stopped_early = true;
                break;
            }
        }

        let (best_epoch, best_loss) = stopper.best();
        history.best_epoch = best_epoch;
        history.best_loss = best_loss;

        Ok(history)
    }
}

/// Mean squared error over `xs` in inference mode
pub fn evaluate(model: &ConvAutoencoder, xs: &Tensor, batch_size: usize) -> Result<f32> {
    let n = xs.dim(0)?;
    if n == 0 {
        return Err(Error::InsufficientData("no windows to evaluate".to_string()));
    }

    let mut sum = 0.0f64;
    let mut start = 0;
    while start < n {
        let len = batch_size.min(n - start);
        let batch = xs.narrow(0, start, len)?;
        let reconstructed = model.forward_t(&batch, false)?;
        let loss = candle_nn::loss::mse(&reconstructed, &batch)?.to_scalar::<f32>()?;
        sum += loss as f64 * len as f64;
        start += len;
    }

    Ok((sum / n as f64) as f32)
}
