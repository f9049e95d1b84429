//! Command handlers behind the CLI
//!
//! Each handler is one pipeline: load → normalize → window → train/score →
//! threshold → classify → runs → exports.

use std::path::Path;

use candle_core::Device;

use crate::logic::config::Config;
use crate::logic::dataset::{load_series, DataSource, Series};
use crate::logic::error::Result;
use crate::logic::model::{
    Detector, ModelConfig, ModelMetadata, StreamScore, StreamingDetector, ThresholdConfig,
    TrainingConfig,
};
use crate::logic::report::{self, DetectionReport};

// ============================================================================
// OPTIONS
// ============================================================================

/// Training knobs not carried by `Config`
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub threshold: ThresholdConfig,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub patience: usize,
    pub refresh: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        let training = TrainingConfig::default();
        Self {
            threshold: ThresholdConfig::default(),
            learning_rate: training.learning_rate,
            validation_split: training.validation_split,
            patience: training.patience,
            refresh: false,
        }
    }
}

/// Output file names inside `Config::output_dir`
pub mod files {
    pub const TRAIN_HISTORY: &str = "train_history.csv";
    pub const TRAIN_ERRORS: &str = "train_errors.csv";
    pub const TRAIN_RECONSTRUCTION: &str = "train_reconstruction.csv";
    pub const TEST_SERIES: &str = "test_series.csv";
    pub const TEST_ERRORS: &str = "test_errors.csv";
    pub const REPORT: &str = "report.json";
}

fn device() -> Device {
    Device::Cpu
}

fn load(source: &str, config: &Config, refresh: bool) -> Result<Series> {
    let series = load_series(&DataSource::parse(source), &config.data_dir, refresh)?;
    let summary = series.describe();
    log::info!(
        "'{}': {} samples, mean={:.3}, std={:.3}, min={:.3}, max={:.3}",
        summary.name,
        summary.count,
        summary.mean,
        summary.std,
        summary.min,
        summary.max
    );
    Ok(series)
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Train on `config.train_source`, save the model and training exports
pub fn train(config: &Config, opts: &TrainOptions) -> Result<Detector> {
    config.validate()?;
    let series = load(&config.train_source, config, opts.refresh)?;

    let training = TrainingConfig {
        epochs: config.epochs,
        batch_size: config.batch_size,
        learning_rate: opts.learning_rate,
        validation_split: opts.validation_split,
        patience: opts.patience,
        seed: config.seed,
    };

    let mut outcome = Detector::train(
        &series,
        ModelConfig::with_time_steps(config.time_steps),
        training,
        opts.threshold.clone(),
        &device(),
    )?;
    outcome.detector.save(&config.model_dir)?;

    let out = &config.output_dir;
    report::export_history_csv(&out.join(files::TRAIN_HISTORY), &outcome.history)?;
    report::export_errors_csv(
        &out.join(files::TRAIN_ERRORS),
        &outcome.train_errors,
        outcome.detector.threshold(),
    )?;

    // First window vs its reconstruction
    let reconstructed = outcome
        .detector
        .model()
        .reconstruct(&outcome.windows, config.batch_size)?;
    report::export_reconstruction_csv(
        &out.join(files::TRAIN_RECONSTRUCTION),
        &outcome.windows,
        &reconstructed,
        0,
    )?;

    report::log_histogram(
        "Train MAE distribution",
        &report::histogram(&outcome.train_errors, 20),
    );

    Ok(outcome.detector)
}

/// Score `config.test_source` with an already trained detector
pub fn detect_with(detector: &Detector, config: &Config, refresh: bool) -> Result<DetectionReport> {
    let series = load(&config.test_source, config, refresh)?;
    let result = detector.detect(&series)?;

    let out = &config.output_dir;
    report::export_series_csv(&out.join(files::TEST_SERIES), &series, &result.point_mask)?;
    report::export_errors_csv(
        &out.join(files::TEST_ERRORS),
        &result.window_errors,
        result.threshold,
    )?;

    report::log_histogram(
        "Test MAE distribution",
        &report::histogram(&result.window_errors, 20),
    );

    let detection = DetectionReport::new(detector.metadata(), series.describe(), &result);
    report::write_json(&out.join(files::REPORT), &detection)?;

    if !result.has_anomalies() {
        log::info!("No anomalous points in '{}'", series.name);
    }
    log::info!(
        "Anomalous windows: {}/{}, anomalous points: {}, runs: {}",
        detection.anomalous_windows,
        detection.windows,
        detection.anomalous_points,
        detection.runs.len()
    );
    for run in &detection.runs {
        log::info!(
            "  {} .. {} ({} points, peak {:.3})",
            run.from,
            run.to,
            run.len,
            run.peak_value
        );
    }
    log::info!("Outputs written to {}", out.display());

    Ok(detection)
}

/// Load the model from `config.model_dir` and score the test series
pub fn detect(config: &Config, refresh: bool) -> Result<DetectionReport> {
    let detector = Detector::load(&config.model_dir, &device())?;
    detect_with(&detector, config, refresh)
}

/// Train then detect in one go
pub fn run(config: &Config, opts: &TrainOptions) -> Result<DetectionReport> {
    let detector = train(config, opts)?;
    detect_with(&detector, config, opts.refresh)
}

/// Stored metadata of a trained model
pub fn inspect(model_dir: &Path) -> Result<ModelMetadata> {
    let metadata = ModelMetadata::read(model_dir)?;
    metadata.verify_weights(model_dir)?;
    Ok(metadata)
}

/// Feed `input` point by point through the streaming detector, return flagged windows
pub fn stream(config: &Config, input: &str, refresh: bool) -> Result<Vec<StreamScore>> {
    let detector = Detector::load(&config.model_dir, &device())?;
    let series = load(input, config, refresh)?;

    let mut streaming = StreamingDetector::new(&detector);
    let mut flagged = Vec::new();
    for value in series.values() {
        if let Some(score) = streaming.push(value)? {
            if score.is_anomaly {
                log::debug!(
                    "window ending at {} anomalous: mae={:.4} score={:.2}",
                    score.index,
                    score.mae,
                    score.score
                );
                flagged.push(score);
            }
        }
    }

    let buffer = streaming.buffer_status();
    if !buffer.is_ready {
        log::warn!(
            "Input ended before the first full window ({}/{} values, {:.0}%)",
            buffer.current_size,
            buffer.required_size,
            buffer.fill_percent
        );
    }

    let status = detector.status();
    log::info!(
        "Streamed {} values, {} anomalous windows, avg latency {:.3} ms",
        series.len(),
        flagged.len(),
        status.avg_latency_ms
    );
    Ok(flagged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;
    use std::fs;

    fn write_series(path: &Path, days: usize, spike_day: Option<usize>) {
        let mut csv = String::from("timestamp,value\n");
        let start = chrono::NaiveDate::from_ymd_opt(2014, 4, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        for i in 0..days * 16 {
            let ts = start + chrono::Duration::minutes(5 * i as i64);
            let mut v = 20.0 + 10.0 * ((i % 16) as f32 / 16.0 * std::f32::consts::TAU).sin();
            if spike_day == Some(i / 16) {
                v += 100.0;
            }
            writeln!(csv, "{},{}", ts.format("%Y-%m-%d %H:%M:%S"), v).unwrap();
        }
        fs::write(path, csv).unwrap();
    }

    fn test_config(dir: &Path) -> Config {
        let train = dir.join("train.csv");
        let test = dir.join("test.csv");
        write_series(&train, 10, None);
        write_series(&test, 10, Some(5));

        Config {
            train_source: train.display().to_string(),
            test_source: test.display().to_string(),
            data_dir: dir.join("data"),
            model_dir: dir.join("model"),
            output_dir: dir.join("output"),
            time_steps: 16,
            epochs: 3,
            batch_size: 32,
            seed: 7,
        }
    }

    #[test]
    fn test_run_writes_model_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let report = run(&config, &TrainOptions::default()).unwrap();
        assert_eq!(report.windows, 10 * 16 - 16 + 1);
        assert_eq!(report.time_steps, 16);
        assert_eq!(report.test_series.count, 160);

        for name in [
            files::TRAIN_HISTORY,
            files::TRAIN_ERRORS,
            files::TRAIN_RECONSTRUCTION,
            files::TEST_SERIES,
            files::TEST_ERRORS,
            files::REPORT,
        ] {
            assert!(config.output_dir.join(name).exists(), "missing {}", name);
        }

        let metadata = inspect(&config.model_dir).unwrap();
        assert_eq!(metadata.run_id, report.model_run_id);
        assert_eq!(metadata.summary.epochs_run, 3);
    }

    #[test]
    fn test_detect_reuses_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let trained = train(&config, &TrainOptions::default()).unwrap();

        let report = detect(&config, false).unwrap();
        assert_eq!(report.model_run_id, trained.metadata().run_id);
        assert_eq!(report.threshold.threshold, trained.threshold());
    }

    #[test]
    fn test_stream_uses_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        // Threshold at twice the max training error
        let opts = TrainOptions {
            threshold: ThresholdConfig {
                sensitivity: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };
        train(&config, &opts).unwrap();

        let flagged = stream(&config, &config.test_source, false).unwrap();
        assert!(!flagged.is_empty());
        // Day 5 spans points 80..96; a window ending at `i` covers i-15..=i
        for score in &flagged {
            assert!(
                (80..=110).contains(&score.index),
                "window ending at {} flagged outside the spike",
                score.index
            );
            assert!(score.score > 1.0);
        }

        // The train series has no spike: nothing is flagged
        let train_source = config.train_source.clone();
        assert!(stream(&config, &train_source, false).unwrap().is_empty());
    }

    #[test]
    fn test_train_rejects_bad_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            time_steps: 10,
            ..test_config(dir.path())
        };
        assert!(train(&config, &TrainOptions::default()).is_err());
    }

    #[test]
    fn test_detect_without_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        assert!(detect(&config, false).is_err());
    }
}
