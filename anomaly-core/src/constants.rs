//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value here can be overridden through the environment (see `logic::config`)
//! and most of them again through CLI flags.

/// Training series: NAB artificial data without anomalies
pub const DEFAULT_TRAIN_URL: &str =
    "https://raw.githubusercontent.com/numenta/NAB/master/data/artificialNoAnomaly/art_daily_small_noise.csv";

/// Test series: NAB artificial data with a jump-up anomaly
pub const DEFAULT_TEST_URL: &str =
    "https://raw.githubusercontent.com/numenta/NAB/master/data/artificialWithAnomaly/art_daily_jumpsup.csv";

/// Window length. 288 samples = one day of 5-minute readings.
pub const DEFAULT_TIME_STEPS: usize = 288;

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 50;

/// Default mini-batch size
pub const DEFAULT_BATCH_SIZE: usize = 128;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;

/// Fraction of windows held out for validation
pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.1;

/// Epochs without val_loss improvement before stopping
pub const DEFAULT_PATIENCE: usize = 5;

/// Seed for epoch shuffling
pub const DEFAULT_SEED: u64 = 42;

/// HTTP timeout for dataset downloads (seconds)
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Timestamp format used by the NAB CSV files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ts-anomaly";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a string from the environment or use the default
pub fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse a value from the environment or use the default
pub fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
