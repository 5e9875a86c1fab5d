// Interquartile-range outlier detection
use shared::models::{FenceReport, OutlierReport};

use super::clean::to_finite_array;

pub const MIN_POINTS: usize = 10;
pub const FENCE_MULTIPLIER: f64 = 1.5;

/// Flags the positions (into the cleaned series) whose value lies strictly
/// outside `[q1 - 1.5 * iqr, q3 + 1.5 * iqr]`.
pub fn detect_outliers_iqr(series: &[f64]) -> OutlierReport {
    let x = to_finite_array(series);
    if x.len() < MIN_POINTS {
        tracing::warn!(points = x.len(), "Too few points for outlier detection");
        return OutlierReport::insufficient(format!(
            "too few points for outlier detection (minimum: {})",
            MIN_POINTS
        ));
    }

    let mut sorted = x.clone();
    sorted.sort_by(f64::total_cmp);
    let q1 = percentile_sorted(&sorted, 25.0);
    let q3 = percentile_sorted(&sorted, 75.0);
    let iqr = q3 - q1;

    if iqr == 0.0 {
        tracing::debug!(q1, q3, "Zero interquartile range, skipping outlier flags");
        return OutlierReport::Fenced(FenceReport {
            q1,
            q3,
            iqr,
            lower_fence: q1,
            upper_fence: q3,
            outlier_indices: Vec::new(),
            outlier_count: 0,
            reason: Some("not enough variation to detect outliers (zero interquartile range)".to_string()),
        });
    }

    let lower_fence = q1 - FENCE_MULTIPLIER * iqr;
    let upper_fence = q3 + FENCE_MULTIPLIER * iqr;
    let outlier_indices: Vec<usize> = x
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < lower_fence || **v > upper_fence)
        .map(|(i, _)| i)
        .collect();

    OutlierReport::Fenced(FenceReport {
        q1,
        q3,
        iqr,
        lower_fence,
        upper_fence,
        outlier_count: outlier_indices.len(),
        outlier_indices,
        reason: None,
    })
}

/// Percentile of an ascending, non-empty slice with linear interpolation
/// between the two closest ranks (rank = p / 100 * (n - 1)).
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn fences(report: &OutlierReport) -> &FenceReport {
        match report {
            OutlierReport::Fenced(f) => f,
            other => panic!("expected fences, got {:?}", other),
        }
    }

    #[test]
    fn test_spike_is_flagged() {
        let prices = [100.0, 105.0, 98.0, 250.0, 102.0, 99.0, 101.0, 97.0, 103.0, 100.0];
        let report = detect_outliers_iqr(&prices);
        let f = fences(&report);
        // sorted: 97 98 99 100 100 101 102 103 105 250
        assert_close(f.q1, 99.25);
        assert_close(f.q3, 102.75);
        assert_close(f.iqr, 3.5);
        assert_close(f.lower_fence, 94.0);
        assert_close(f.upper_fence, 108.0);
        assert_eq!(f.outlier_indices, vec![3]);
        assert_eq!(f.outlier_count, 1);
        assert!(f.reason.is_none());
    }

    #[test]
    fn test_constant_series_has_no_outliers() {
        let report = detect_outliers_iqr(&[7.0; 12]);
        let f = fences(&report);
        assert_eq!(f.iqr, 0.0);
        assert!(f.outlier_indices.is_empty());
        assert!(report.reason().is_some());
    }

    #[test]
    fn test_too_few_points() {
        let report = detect_outliers_iqr(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 900.0]);
        assert!(report.outlier_indices().is_empty());
        assert!(report.reason().unwrap().contains("too few points"));
    }

    #[test]
    fn test_every_length_below_minimum_is_insufficient() {
        for len in 0..MIN_POINTS {
            let mut prices: Vec<f64> = (0..len).map(|i| i as f64).collect();
            if len > 0 {
                prices[len - 1] = 1e6;
            }
            let report = detect_outliers_iqr(&prices);
            assert!(matches!(report, OutlierReport::Insufficient { .. }), "length {}", len);
            assert!(report.outlier_indices().is_empty());
        }
    }

    #[test]
    fn test_minimum_length_is_fenced() {
        let mut prices: Vec<f64> = (0..MIN_POINTS).map(|i| i as f64).collect();
        prices[MIN_POINTS - 1] = 1e6;
        let report = detect_outliers_iqr(&prices);
        assert_eq!(fences(&report).outlier_indices, vec![MIN_POINTS - 1]);
    }

    #[test]
    fn test_constant_series_at_minimum_length() {
        let report = detect_outliers_iqr(&[3.0; MIN_POINTS]);
        let f = fences(&report);
        assert_eq!(f.iqr, 0.0);
        assert_eq!(f.outlier_count, 0);
        assert!(f.reason.as_deref().unwrap().contains("zero interquartile range"));
    }

    #[test]
    fn test_indices_refer_to_cleaned_series() {
        let mut prices = vec![f64::NAN, f64::NAN];
        prices.extend([10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 11.0, 10.0, -80.0, 500.0]);
        let report = detect_outliers_iqr(&prices);
        assert_eq!(report.outlier_indices(), &[9, 10]);
    }

    #[test]
    fn test_values_on_fence_not_flagged() {
        // q1 = 2.25, q3 = 6.75, iqr = 4.5 -> fences -4.5 and 13.5
        let prices = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 13.5];
        let report = detect_outliers_iqr(&prices);
        let f = fences(&report);
        assert_close(f.upper_fence, 13.5);
        assert!(f.outlier_indices.is_empty());
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_close(percentile_sorted(&sorted, 0.0), 1.0);
        assert_close(percentile_sorted(&sorted, 25.0), 1.75);
        assert_close(percentile_sorted(&sorted, 50.0), 2.5);
        assert_close(percentile_sorted(&sorted, 100.0), 4.0);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }
}
