//! Configuration module
//!
//! Defaults come from `constants.rs`, the environment (and `.env`) overrides them,
//! CLI flags override the environment.

use std::path::PathBuf;

use crate::constants::{self, env_parse, env_string};
use crate::logic::error::{Error, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Training series (URL or local path)
    pub train_source: String,

    /// Test series (URL or local path)
    pub test_source: String,

    /// Where downloaded CSV files are cached
    pub data_dir: PathBuf,

    /// Where the trained model and its metadata live
    pub model_dir: PathBuf,

    /// Where exports and the JSON report are written
    pub output_dir: PathBuf,

    /// Window length
    pub time_steps: usize,

    pub epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
}

/// Base directory for everything this tool writes
pub fn get_base_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(constants::APP_NAME)
}

impl Default for Config {
    fn default() -> Self {
        let base = get_base_dir();
        Self {
            train_source: constants::DEFAULT_TRAIN_URL.to_string(),
            test_source: constants::DEFAULT_TEST_URL.to_string(),
            data_dir: base.join("data"),
            model_dir: base.join("model"),
            output_dir: base.join("output"),
            time_steps: constants::DEFAULT_TIME_STEPS,
            epochs: constants::DEFAULT_EPOCHS,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            seed: constants::DEFAULT_SEED,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            train_source: env_string("TSAD_TRAIN_URL", &defaults.train_source),
            test_source: env_string("TSAD_TEST_URL", &defaults.test_source),

            data_dir: std::env::var("TSAD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            model_dir: std::env::var("TSAD_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),

            output_dir: std::env::var("TSAD_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),

            time_steps: env_parse("TSAD_TIME_STEPS", defaults.time_steps),
            epochs: env_parse("TSAD_EPOCHS", defaults.epochs),
            batch_size: env_parse("TSAD_BATCH_SIZE", defaults.batch_size),
            seed: env_parse("TSAD_SEED", defaults.seed),
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.time_steps == 0 || self.time_steps % 4 != 0 {
            return Err(Error::Config(format!(
                "time_steps must be a positive multiple of 4, got {}",
                self.time_steps
            )));
        }
        if self.epochs == 0 {
            return Err(Error::Config("epochs must be > 0".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".to_string()));
        }
        Ok(())
    }
}
