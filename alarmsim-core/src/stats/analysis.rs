//! Statistical analysis (extrema, mean, median, percentiles)

use super::ValueSummary;
use crate::error::{Error, Result};

/// Nearest-rank percentile from sorted values
///
/// The index is `round_half_to_even(len * fraction)`, 0-based, clamped to the
/// last element. With 100 values `fraction = 0.99` selects index 99, the
/// largest value. Returns `None` for an empty slice.
pub fn percentile(sorted: &[f64], fraction: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let rank = (sorted.len() as f64 * fraction).round_ties_even();
    // `as usize` saturates: negative and NaN ranks land on 0
    let index = (rank as usize).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Median of sorted values, averaging the two middle elements for even counts
pub fn median(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(0.5 * (sorted[n / 2 - 1] + sorted[n / 2])),
    }
}

/// Summarize a set of values
///
/// Fails with [`Error::EmptyInput`] when `values` is empty, since extrema of
/// nothing are undefined.
pub fn summarize(values: &[f64]) -> Result<ValueSummary> {
    if values.is_empty() {
        return Err(Error::EmptyInput("cannot summarize zero values"));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let sum: f64 = values.iter().sum();
    let mean = sum / values.len() as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    // Non-empty from here on, so every lookup below is Some
    let at = |fraction: f64| percentile(&sorted, fraction).unwrap_or(f64::NAN);

    Ok(ValueSummary {
        count: values.len(),
        min,
        max,
        mean,
        median: median(&sorted).unwrap_or(f64::NAN),
        p99: at(0.99),
        p999: at(0.999),
        p9999: at(0.9999),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 0.99), None);
    }

    #[test]
    fn test_percentile_single() {
        let values = [42.0];
        assert_eq!(percentile(&values, 0.99), Some(42.0));
        assert_eq!(percentile(&values, 0.9999), Some(42.0));
    }

    #[test]
    fn test_percentile_one_to_hundred_is_zero_based() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();

        // index round(100 * 0.99) = 99, the last element
        assert_eq!(percentile(&values, 0.99), Some(100.0));
        // index 100 and 1000 would overrun; both clamp to the last element
        assert_eq!(percentile(&values, 0.999), Some(100.0));
        assert_eq!(percentile(&values, 0.9999), Some(100.0));
        assert_eq!(percentile(&values, 0.5), Some(51.0));
    }

    #[test]
    fn test_percentile_rounds_half_to_even() {
        let five = [10.0, 20.0, 30.0, 40.0, 50.0];
        // 2.5 rounds down to 2
        assert_eq!(percentile(&five, 0.5), Some(30.0));

        let seven = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        // 3.5 rounds up to 4
        assert_eq!(percentile(&seven, 0.5), Some(5.0));
    }

    #[test]
    fn test_percentile_clamps_small_counts() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 0.99), Some(3.0));
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, -1.0), Some(1.0));
        assert_eq!(percentile(&values, 2.0), Some(3.0));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[7.0]), Some(7.0));
        assert_eq!(median(&[1.0, 3.0]), Some(2.0));
        assert_eq!(median(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
    }

    #[test]
    fn test_summarize_empty() {
        assert!(matches!(summarize(&[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_summarize_unsorted_input() {
        let summary = summarize(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.mean, 2.5);
        assert_eq!(summary.median, 2.5);
        assert_eq!(summary.p99, 4.0);
        assert_eq!(summary.p999, 4.0);
        assert_eq!(summary.p9999, 4.0);
    }

    #[test]
    fn test_summarize_does_not_mutate_input() {
        let values = vec![3.0, 1.0, 2.0];
        let _ = summarize(&values).unwrap();
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_summarize_tail_percentiles() {
        let values: Vec<f64> = (0..10_000).map(f64::from).collect();
        let summary = summarize(&values).unwrap();
        assert_eq!(summary.p99, 9900.0);
        assert_eq!(summary.p999, 9990.0);
        assert_eq!(summary.p9999, 9999.0);
        assert_eq!(summary.median, 4999.5);
    }
}
