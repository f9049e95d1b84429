//! Detection Module - from reconstruction errors to anomalous points
//!
//! 1. Window is anomalous if its MAE > threshold
//! 2. Point is anomalous if all windows covering it are anomalous
//! 3. Consecutive anomalous points are grouped into runs

pub mod mask;
pub mod runs;

use serde::{Deserialize, Serialize};

pub use mask::{anomalous_indices, classify_windows, point_mask};
pub use runs::{find_runs, runs_with_timestamps, TimedRun};

use crate::logic::dataset::Series;
use crate::logic::model::ThresholdStats;

/// Outcome of scoring one series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub threshold: f32,
    pub window_errors: Vec<f32>,
    pub window_flags: Vec<bool>,
    pub point_mask: Vec<bool>,
    pub runs: Vec<TimedRun>,
}

impl DetectionResult {
    /// Classify `errors` against `threshold` and reduce to points / runs of `series`
    pub fn evaluate(
        series: &Series,
        errors: Vec<f32>,
        threshold: &ThresholdStats,
        time_steps: usize,
    ) -> Self {
        let window_flags = classify_windows(&errors, threshold);
        let mask = point_mask(&window_flags, series.len(), time_steps);
        let runs = runs_with_timestamps(series, &find_runs(&mask));

        Self {
            threshold: threshold.threshold,
            window_errors: errors,
            window_flags,
            point_mask: mask,
            runs,
        }
    }

    pub fn anomalous_windows(&self) -> usize {
        self.window_flags.iter().filter(|&&f| f).count()
    }

    pub fn anomalous_points(&self) -> Vec<usize> {
        anomalous_indices(&self.point_mask)
    }

    pub fn has_anomalies(&self) -> bool {
        self.point_mask.iter().any(|&f| f)
    }
}

#[cfg(test)]
mod tests {
    use super::runs::AnomalyRun;
    use super::*;
    use crate::logic::dataset::record::Sample;
    use crate::logic::model::ThresholdStrategy;
    use chrono::NaiveDate;

    fn series(len: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2014, 4, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let samples = (0..len)
            .map(|i| Sample {
                timestamp: start + chrono::Duration::minutes(5 * i as i64),
                value: if (8..12).contains(&i) { 10.0 } else { 0.0 },
            })
            .collect();
        Series::new("test", samples)
    }

    fn threshold(value: f32) -> ThresholdStats {
        ThresholdStats {
            threshold: value,
            strategy: ThresholdStrategy::Max,
            mean: value,
            std: 0.0,
            max: value,
            count: 1,
        }
    }

    #[test]
    fn test_evaluate_end_to_end() {
        // 20 points, T = 4 -> 17 windows; windows 6..=11 overlap the spike at 8..12
        let s = series(20);
        let errors: Vec<f32> = (0..17)
            .map(|w| if (6..=11).contains(&w) { 1.0 } else { 0.1 })
            .collect();

        let result = DetectionResult::evaluate(&s, errors, &threshold(0.5), 4);

        assert_eq!(result.anomalous_windows(), 6);
        // point p needs windows p-3..=p all flagged -> p in 9..=11
        assert_eq!(result.anomalous_points(), vec![9, 10, 11]);
        assert_eq!(result.runs.len(), 1);
        assert_eq!(result.runs[0].run, AnomalyRun { start: 9, end: 11 });
        assert_eq!(result.runs[0].from.format("%H:%M").to_string(), "00:45");
        assert!(result.has_anomalies());
    }

    #[test]
    fn test_nothing_above_threshold() {
        let s = series(10);
        let result = DetectionResult::evaluate(&s, vec![0.1; 7], &threshold(0.5), 4);
        assert_eq!(result.anomalous_windows(), 0);
        assert!(!result.has_anomalies());
        assert!(result.runs.is_empty());
    }
}
