//! Contiguous anomalous stretches

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::{record::timestamp_format, Series};

/// Inclusive index range of consecutive anomalous points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRun {
    pub start: usize,
    pub end: usize,
}

impl AnomalyRun {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// A run with the timestamps it spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedRun {
    #[serde(flatten)]
    pub run: AnomalyRun,
    pub len: usize,
    #[serde(with = "timestamp_format")]
    pub from: NaiveDateTime,
    #[serde(with = "timestamp_format")]
    pub to: NaiveDateTime,
    /// Largest absolute deviation from the series mean inside the run
    pub peak_value: f32,
}

pub fn find_runs(mask: &[bool]) -> Vec<AnomalyRun> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;

    for (i, &flag) in mask.iter().enumerate() {
        match (flag, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                runs.push(AnomalyRun { start, end: i - 1 });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        runs.push(AnomalyRun {
            start,
            end: mask.len() - 1,
        });
    }

    runs
}

/// Attach timestamps; runs outside the series are dropped
pub fn runs_with_timestamps(series: &Series, runs: &[AnomalyRun]) -> Vec<TimedRun> {
    let mean = series.describe().mean;

    runs.iter()
        .filter_map(|run| {
            let from = series.timestamp_at(run.start)?;
            let to = series.timestamp_at(run.end)?;
            let peak_value = series.samples[run.start..=run.end]
                .iter()
                .map(|s| s.value)
                .fold(mean, |peak, v| {
                    if (v - mean).abs() > (peak - mean).abs() {
                        v
                    } else {
                        peak
                    }
                });

            Some(TimedRun {
                run: *run,
                len: run.len(),
                from,
                to,
                peak_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::dataset::loader::parse_csv;

    #[test]
    fn test_find_runs() {
        let mask = [false, true, true, false, true, false, false, true];
        assert_eq!(
            find_runs(&mask),
            vec![
                AnomalyRun { start: 1, end: 2 },
                AnomalyRun { start: 4, end: 4 },
                AnomalyRun { start: 7, end: 7 },
            ]
        );
        assert_eq!(find_runs(&[true, true]), vec![AnomalyRun { start: 0, end: 1 }]);
        assert!(find_runs(&[false, false]).is_empty());
        assert!(find_runs(&[]).is_empty());
    }

    #[test]
    fn test_run_len() {
        assert_eq!(AnomalyRun { start: 3, end: 3 }.len(), 1);
        assert_eq!(AnomalyRun { start: 3, end: 9 }.len(), 7);
    }

    #[test]
    fn test_runs_with_timestamps() {
        let csv = "timestamp,value
2014-04-01 00:00:00,1.0
2014-04-01 00:05:00,1.0
2014-04-01 00:10:00,9.0
2014-04-01 00:15:00,8.0
2014-04-01 00:20:00,1.0
";
        let series = parse_csv(csv.as_bytes(), "s").unwrap();
        let timed = runs_with_timestamps(&series, &[AnomalyRun { start: 2, end: 3 }]);

        assert_eq!(timed.len(), 1);
        assert_eq!(timed[0].len, 2);
        assert_eq!(timed[0].from.format("%H:%M").to_string(), "00:10");
        assert_eq!(timed[0].to.format("%H:%M").to_string(), "00:15");
        assert_eq!(timed[0].peak_value, 9.0);

        // Out of range run is skipped
        assert!(runs_with_timestamps(&series, &[AnomalyRun { start: 4, end: 8 }]).is_empty());
    }
}
