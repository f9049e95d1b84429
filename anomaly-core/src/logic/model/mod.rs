//! Model Module - Convolutional autoencoder
//!
//! - `autoencoder` - network definition
//! - `trainer` - fitting loop with early stopping
//! - `threshold` - static reconstruction-error threshold
//! - `metadata` - on-disk artifact
//! - `inference` - trained detector (train / save / load / score)
//! - `buffer` - streaming scoring

pub mod autoencoder;
pub mod buffer;
pub mod inference;
pub mod metadata;
pub mod threshold;
pub mod trainer;

// Re-export common types
pub use autoencoder::ModelConfig;
pub use buffer::{StreamScore, StreamingDetector};
pub use inference::Detector;
pub use metadata::ModelMetadata;
pub use threshold::{ThresholdConfig, ThresholdStats, ThresholdStrategy};
pub use trainer::{TrainingConfig, TrainingHistory};
