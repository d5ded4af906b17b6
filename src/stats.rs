use serde::Serialize;

use crate::config::Thresholds;

/// Summary statistics over a set of elapsed-time samples (seconds).
#[derive(Debug, Clone, Serialize)]
pub struct TimingStats {
	pub min_time: f64,
	pub max_time: f64,
	pub avg_time: f64,
	pub median_time: f64,
	/// Sample standard deviation; absent with fewer than two samples
	#[serde(skip_serializing_if = "Option::is_none")]
	pub std_dev: Option<f64>,
}

/// Qualitative latency rating derived from the mean response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceRating {
	Excellent,
	Good,
	Moderate,
	Poor,
	VeryPoor,
	Unknown,
}

impl PerformanceRating {
	pub fn as_str(self) -> &'static str {
		match self {
			PerformanceRating::Excellent => "EXCELLENT",
			PerformanceRating::Good => "GOOD",
			PerformanceRating::Moderate => "MODERATE",
			PerformanceRating::Poor => "POOR",
			PerformanceRating::VeryPoor => "VERY_POOR",
			PerformanceRating::Unknown => "UNKNOWN",
		}
	}
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}

/// Calculate the median of a slice of values.
pub fn median(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let mut sorted = values.to_vec();
	sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
	let n = sorted.len();
	if n % 2 == 1 {
		Some(sorted[n / 2])
	} else {
		Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
	}
}

/// Calculate the sample (n-1) standard deviation of a slice of values.
///
/// Returns None for fewer than two samples.
pub fn stddev(values: &[f64]) -> Option<f64> {
	if values.len() < 2 {
		return None;
	}
	let avg = mean(values)?;
	let variance = values.iter()
		.map(|v| (v - avg).powi(2))
		.sum::<f64>() / (values.len() - 1) as f64;
	Some(variance.sqrt())
}

/// Round a seconds value to 0.1 millisecond precision for reporting.
pub fn round_secs(value: f64) -> f64 {
	(value * 10_000.0).round() / 10_000.0
}

/// Compute summary statistics over elapsed-time samples.
///
/// Returns None when there are no samples at all.
pub fn compute_stats(samples: &[f64]) -> Option<TimingStats> {
	if samples.is_empty() {
		return None;
	}
	let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
	let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
	Some(TimingStats {
		min_time: round_secs(min),
		max_time: round_secs(max),
		avg_time: round_secs(mean(samples).unwrap_or(0.0)),
		median_time: round_secs(median(samples).unwrap_or(0.0)),
		std_dev: stddev(samples).map(round_secs),
	})
}

/// Samples strictly above mean + multiplier * stddev.
///
/// Returns the threshold alongside the offending samples; None when a
/// deviation cannot be computed (fewer than two samples).
pub fn detect_outliers(samples: &[f64], multiplier: f64) -> Option<(f64, Vec<f64>)> {
	let avg = mean(samples)?;
	let sd = stddev(samples)?;
	let threshold = avg + multiplier * sd;
	let outliers = samples.iter()
		.filter(|&&s| s > threshold)
		.map(|&s| round_secs(s))
		.collect();
	Some((round_secs(threshold), outliers))
}

/// Map a mean response time (seconds) to a qualitative rating.
pub fn rate_performance(avg_time: f64, thresholds: &Thresholds) -> PerformanceRating {
	if avg_time < thresholds.excellent {
		PerformanceRating::Excellent
	} else if avg_time < thresholds.good {
		PerformanceRating::Good
	} else if avg_time < thresholds.moderate {
		PerformanceRating::Moderate
	} else if avg_time < thresholds.poor {
		PerformanceRating::Poor
	} else {
		PerformanceRating::VeryPoor
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mean() {
		let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
		assert_eq!(mean(&values), Some(3.0));
		assert_eq!(mean(&[]), None);
	}

	#[test]
	fn test_median_odd_and_even() {
		assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
		assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
		assert_eq!(median(&[]), None);
	}

	#[test]
	fn test_sample_stddev() {
		// Sample stddev of [2,4,4,4,5,5,7,9] is ~2.138 (population would be 2.0)
		let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
		let sd = stddev(&values).unwrap();
		assert!((sd - 2.138).abs() < 0.01);
	}

	#[test]
	fn test_stddev_needs_two_samples() {
		assert_eq!(stddev(&[42.0]), None);
		assert_eq!(stddev(&[]), None);
	}

	#[test]
	fn test_compute_stats() {
		let samples = vec![0.010, 0.020, 0.030];
		let stats = compute_stats(&samples).unwrap();
		assert_eq!(stats.min_time, 0.010);
		assert_eq!(stats.max_time, 0.030);
		assert_eq!(stats.avg_time, 0.020);
		assert_eq!(stats.median_time, 0.020);
		assert!(stats.std_dev.unwrap() > 0.0);
	}

	#[test]
	fn test_compute_stats_empty() {
		assert!(compute_stats(&[]).is_none());
	}

	#[test]
	fn test_outlier_detection() {
		// One sample far above the rest
		let samples = vec![0.01, 0.011, 0.012, 0.009, 0.01, 0.25];
		let (threshold, outliers) = detect_outliers(&samples, 2.0).unwrap();
		assert!(threshold > 0.0);
		assert_eq!(outliers, vec![0.25]);
	}

	#[test]
	fn test_no_outliers_in_uniform_samples() {
		let samples = vec![0.02, 0.02, 0.02, 0.02];
		let (_, outliers) = detect_outliers(&samples, 2.0).unwrap();
		assert!(outliers.is_empty());
	}

	#[test]
	fn test_performance_rating_cutoffs() {
		let t = Thresholds::default();
		assert_eq!(rate_performance(0.05, &t), PerformanceRating::Excellent);
		assert_eq!(rate_performance(0.2, &t), PerformanceRating::Good);
		assert_eq!(rate_performance(0.4, &t), PerformanceRating::Moderate);
		assert_eq!(rate_performance(0.7, &t), PerformanceRating::Poor);
		assert_eq!(rate_performance(2.0, &t), PerformanceRating::VeryPoor);
	}

	#[test]
	fn test_round_secs() {
		assert_eq!(round_secs(0.12345678), 0.1235);
		assert_eq!(round_secs(0.00004), 0.0);
	}
}
