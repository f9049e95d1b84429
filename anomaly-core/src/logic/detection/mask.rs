//! Window and point classification

use crate::logic::features::covering_windows;
use crate::logic::model::ThresholdStats;

/// A window is anomalous when its error is strictly above the threshold
pub fn classify_windows(errors: &[f32], threshold: &ThresholdStats) -> Vec<bool> {
    errors.iter().map(|&e| threshold.is_anomaly(e)).collect()
}

/// Reduce window flags to point flags.
///
/// Point `i` is anomalous when every window covering it is anomalous. Only
/// points covered by a full set of `time_steps` windows are eligible
/// (`time_steps - 1 <= i <= len - time_steps`); edge points stay normal.
pub fn point_mask(window_flags: &[bool], series_len: usize, time_steps: usize) -> Vec<bool> {
    let mut mask = vec![false; series_len];
    if time_steps == 0 || series_len < time_steps {
        return mask;
    }
    debug_assert_eq!(window_flags.len(), series_len - time_steps + 1);

    // prefix[j] = anomalous windows among 0..j
    let mut prefix = Vec::with_capacity(window_flags.len() + 1);
    prefix.push(0usize);
    for &flag in window_flags {
        let last = *prefix.last().unwrap_or(&0);
        prefix.push(last + flag as usize);
    }

    for (point, flag) in mask.iter_mut().enumerate() {
        let covering = covering_windows(point, series_len, time_steps);
        if covering.len() < time_steps || covering.end >= prefix.len() {
            continue;
        }
        *flag = prefix[covering.end] - prefix[covering.start] == time_steps;
    }

    mask
}

/// Indices of flagged points
pub fn anomalous_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter_map(|(i, &flag)| flag.then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::ThresholdConfig;

    #[test]
    fn test_classify_is_strict() {
        let stats = ThresholdConfig::default().compute(&[0.1, 0.5]).unwrap();
        assert_eq!(
            classify_windows(&[0.1, 0.5, 0.6], &stats),
            vec![false, false, true]
        );
    }

    #[test]
    fn test_point_needs_all_covering_windows() {
        // 12 points, T = 3 -> 10 windows
        let mut flags = vec![false; 10];
        for f in flags.iter_mut().take(7).skip(3) {
            *f = true;
        }
        // windows 3..=6 anomalous; point p covered by p-2..=p
        let mask = point_mask(&flags, 12, 3);
        assert_eq!(anomalous_indices(&mask), vec![5, 6]);
    }

    #[test]
    fn test_edges_are_never_flagged() {
        let flags = vec![true; 7];
        // 10 points, T = 4: eligible 3..=6
        let mask = point_mask(&flags, 10, 4);
        assert_eq!(anomalous_indices(&mask), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_single_normal_window_clears_its_points() {
        let mut flags = vec![true; 7];
        flags[4] = false;
        let mask = point_mask(&flags, 10, 4);
        // window 4 covers points 4..=7
        assert_eq!(anomalous_indices(&mask), vec![3]);
    }

    #[test]
    fn test_short_series() {
        assert_eq!(point_mask(&[], 2, 4), vec![false, false]);
        assert!(point_mask(&[true], 0, 0).is_empty());
    }
}
