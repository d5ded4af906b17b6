use std::time::Duration;

/// Substrings that mark a record value as CDN/hosting infrastructure.
///
/// Wildcard targets pointing at these are usually legitimate catch-all
/// setups rather than phishing infrastructure.
pub const CDN_INDICATORS: &[&str] = &[
	"cloudflare", "amazonaws", "cloudfront", "fastly",
	"cdn", "akamai", "edgecast", "maxcdn", "keycdn",
];

/// Classification thresholds for the analysis layer.
///
/// These are tuning knobs, not protocol constants; the defaults below are
/// starting points that callers may override.
#[derive(Debug, Clone)]
pub struct Thresholds {
	/// Consistent answers from at least this many resolvers rate "high" trust
	pub high_trust_agreement: usize,
	/// Consistent answers from at least this many resolvers rate "medium" trust
	pub medium_trust_agreement: usize,
	/// Samples above mean + multiplier * stddev count as timing outliers
	pub anomaly_stddev_multiplier: f64,
	/// Stddev above this multiple of the mean flags unstable performance
	pub high_variance_ratio: f64,
	/// Latency cutoffs (seconds) for the qualitative performance rating
	pub excellent: f64,
	pub good: f64,
	pub moderate: f64,
	pub poor: f64,
}

impl Default for Thresholds {
	fn default() -> Self {
		Thresholds {
			high_trust_agreement: 3,
			medium_trust_agreement: 2,
			anomaly_stddev_multiplier: 2.0,
			high_variance_ratio: 1.0,
			excellent: 0.1,
			good: 0.3,
			moderate: 0.5,
			poor: 1.0,
		}
	}
}

/// Engine-wide configuration: rate limiting, timeouts, concurrency ceilings,
/// and analysis defaults.
#[derive(Debug, Clone)]
pub struct Config {
	/// Queries per second allowed against each individual nameserver
	pub rate_limit: f64,
	/// Caller-supplied timeouts are clamped into [min_timeout, max_timeout]
	pub min_timeout: Duration,
	pub max_timeout: Duration,
	/// Default concurrent workers for bulk operations
	pub default_max_workers: usize,
	/// Hard ceiling on concurrent workers regardless of caller input
	pub max_workers_limit: usize,
	/// Concurrent in-flight queries against one resolver during query_all
	pub query_all_concurrency: usize,
	/// Delay between sequential iterations in response analysis
	pub iteration_delay: Duration,
	/// Default iteration count for response analysis
	pub default_iterations: usize,
	/// Default random-subdomain probe count for wildcard detection
	pub default_wildcard_probes: usize,
	/// Hard ceiling on wildcard probes
	pub max_wildcard_probes: usize,
	/// Length of generated random subdomain labels
	pub wildcard_label_length: usize,
	pub thresholds: Thresholds,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			rate_limit: 30.0,
			min_timeout: Duration::from_secs(1),
			max_timeout: Duration::from_secs(60),
			default_max_workers: 10,
			max_workers_limit: 50,
			query_all_concurrency: 3,
			iteration_delay: Duration::from_millis(100),
			default_iterations: 10,
			default_wildcard_probes: 5,
			max_wildcard_probes: 10,
			wildcard_label_length: 32,
			thresholds: Thresholds::default(),
		}
	}
}

impl Config {
	/// Clamp a caller-supplied timeout into the allowed range.
	pub fn clamp_timeout(&self, timeout: Duration) -> Duration {
		timeout.clamp(self.min_timeout, self.max_timeout)
	}

	/// Clamp a caller-supplied worker count into [1, max_workers_limit].
	pub fn clamp_workers(&self, workers: usize) -> usize {
		workers.clamp(1, self.max_workers_limit)
	}

	/// Clamp a wildcard probe count into [1, max_wildcard_probes].
	pub fn clamp_probes(&self, count: usize) -> usize {
		count.clamp(1, self.max_wildcard_probes)
	}
}

/// Check whether a record value points at known CDN/hosting infrastructure.
pub fn is_cdn_related(record: &str) -> bool {
	let lower = record.to_lowercase();
	CDN_INDICATORS.iter().any(|indicator| lower.contains(indicator))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_timeout_clamping() {
		let config = Config::default();
		assert_eq!(config.clamp_timeout(Duration::from_millis(10)), Duration::from_secs(1));
		assert_eq!(config.clamp_timeout(Duration::from_secs(10)), Duration::from_secs(10));
		assert_eq!(config.clamp_timeout(Duration::from_secs(600)), Duration::from_secs(60));
	}

	#[test]
	fn test_worker_clamping() {
		let config = Config::default();
		assert_eq!(config.clamp_workers(0), 1);
		assert_eq!(config.clamp_workers(10), 10);
		assert_eq!(config.clamp_workers(500), 50);
	}

	#[test]
	fn test_probe_clamping() {
		let config = Config::default();
		assert_eq!(config.clamp_probes(0), 1);
		assert_eq!(config.clamp_probes(5), 5);
		assert_eq!(config.clamp_probes(100), 10);
	}

	#[test]
	fn test_cdn_detection() {
		assert!(is_cdn_related("d111111abcdef8.cloudfront.net."));
		assert!(is_cdn_related("ec2-1-2-3-4.compute-1.AMAZONAWS.com"));
		assert!(!is_cdn_related("mail.example.com."));
	}

	#[test]
	fn test_default_sanity() {
		let config = Config::default();
		assert!(config.rate_limit > 0.0);
		assert!(config.min_timeout <= config.max_timeout);
		assert!(config.default_max_workers <= config.max_workers_limit);
		assert!(config.thresholds.medium_trust_agreement <= config.thresholds.high_trust_agreement);
	}
}
