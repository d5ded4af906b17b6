use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use rand::Rng;
use tokio::sync::Semaphore;

use crate::config::{is_cdn_related, Thresholds};
use crate::engine::QueryEngine;
use crate::resolver::{default_propagation_resolvers, ResolverProfile};
use crate::stats;
use crate::types::{
	ConsistencyReport, QueryResult, RecordKind, ResolverObservation, ResponseGroup, RiskLevel,
	TimingProfile, TrustLevel, WildcardReport,
};

/// Check DNS propagation by querying the same name across many resolvers.
///
/// Answers are compared as sets (DNS answer ordering is not significant).
/// Each resolver is wrapped in its own single-nameserver profile so the
/// per-nameserver rate limiter applies individually.
pub async fn propagation_check(
	engine: &Arc<QueryEngine>,
	domain: &str,
	kind: RecordKind,
	resolvers: Option<Vec<(String, SocketAddr)>>,
	timeout: Duration,
) -> ConsistencyReport {
	let resolvers = resolvers.unwrap_or_else(default_propagation_resolvers);
	let start = Instant::now();

	let mut handles = Vec::with_capacity(resolvers.len());
	for (name, addr) in &resolvers {
		let engine = engine.clone();
		let domain = domain.to_string();
		let name = name.clone();
		let addr = *addr;
		handles.push(tokio::spawn(async move {
			let profile = ResolverProfile::named(name.clone(), addr);
			let result = engine.query(&domain, kind, &profile, timeout).await;
			(name, addr, result)
		}));
	}

	let mut resolver_results = BTreeMap::new();
	for handle in handles {
		match handle.await {
			Ok((name, addr, result)) => {
				resolver_results.insert(name, observe(addr, result));
			}
			Err(e) => {
				warn!("propagation task failed: {}", e);
			}
		}
	}

	let response_groups = group_responses(&resolver_results);
	let successful_queries = resolver_results.values().filter(|o| o.success).count();
	let failed_queries = resolver_results.len() - successful_queries;
	let is_consistent = response_groups.len() <= 1;
	let trust_level = classify_trust(
		is_consistent,
		successful_queries,
		&engine.config().thresholds,
	);

	let sample_times: Vec<f64> = resolver_results
		.values()
		.filter(|o| o.success)
		.map(|o| o.query_time_seconds)
		.collect();

	ConsistencyReport {
		domain: domain.to_string(),
		record_type: kind,
		resolvers_queried: resolvers.len(),
		successful_queries,
		failed_queries,
		is_consistent,
		unique_response_count: response_groups.len(),
		trust_level,
		resolver_results,
		response_groups,
		time_stats: stats::compute_stats(&sample_times),
		total_query_time_seconds: stats::round_secs(start.elapsed().as_secs_f64()),
	}
}

/// Detect wildcard DNS by probing random subdomains that cannot exist.
///
/// Each generated label is probed for both A and CNAME records; a wildcard
/// zone resolves any of them.
pub async fn wildcard_check(
	engine: &Arc<QueryEngine>,
	domain: &str,
	test_count: Option<usize>,
	profile: &ResolverProfile,
	timeout: Duration,
) -> WildcardReport {
	let config = engine.config();
	let count = config.clamp_probes(test_count.unwrap_or(config.default_wildcard_probes));
	let label_length = config.wildcard_label_length;
	let start = Instant::now();

	let subdomains: Vec<String> = (0..count)
		.map(|_| format!("{}.{}", random_label(label_length), domain))
		.collect();

	let semaphore = Arc::new(Semaphore::new(config.default_max_workers));
	let mut handles = Vec::with_capacity(count * 2);
	for subdomain in &subdomains {
		for kind in [RecordKind::A, RecordKind::Cname] {
			let engine = engine.clone();
			let profile = profile.clone();
			let subdomain = subdomain.clone();
			let sem = semaphore.clone();
			handles.push(tokio::spawn(async move {
				let _permit = sem.acquire().await.unwrap();
				engine.query(&subdomain, kind, &profile, timeout).await
			}));
		}
	}

	let mut probes = Vec::with_capacity(count * 2);
	for handle in handles {
		match handle.await {
			Ok(result) => probes.push(result),
			Err(e) => warn!("wildcard probe task failed: {}", e),
		}
	}

	let wildcard_records = collect_wildcard_records(&probes);
	let has_wildcard = !wildcard_records.is_empty();
	let single_target = wildcard_records.len() == 1;
	let cdn_related = wildcard_records.iter().any(|r| is_cdn_related(r));
	let risk_level = assess_wildcard_risk(&wildcard_records);

	WildcardReport {
		domain: domain.to_string(),
		test_count: count,
		nameserver: profile.id().to_string(),
		has_wildcard,
		wildcard_records: wildcard_records.into_iter().collect(),
		single_target,
		cdn_related,
		risk_level,
		probes,
		total_query_time_seconds: stats::round_secs(start.elapsed().as_secs_f64()),
	}
}

/// Profile response times with repeated queries for one name and type.
///
/// Iterations run sequentially with a short delay so the samples measure
/// the resolver, not our own burst behavior.
pub async fn response_analysis(
	engine: &Arc<QueryEngine>,
	domain: &str,
	kind: RecordKind,
	iterations: Option<usize>,
	profile: &ResolverProfile,
	timeout: Duration,
) -> TimingProfile {
	let config = engine.config();
	let iterations = iterations.unwrap_or(config.default_iterations).max(1);
	let delay = config.iteration_delay;
	let thresholds = config.thresholds.clone();
	let start = Instant::now();

	let mut samples = Vec::with_capacity(iterations);
	let mut errors = Vec::new();
	for i in 0..iterations {
		let result = engine.query(domain, kind, profile, timeout).await;
		if result.is_success() {
			samples.push(result.query_time_seconds);
		} else if let Some(error) = result.error {
			errors.push(error);
		}
		if i + 1 < iterations && !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}
	}

	let timing_stats = stats::compute_stats(&samples);
	let (anomaly_threshold, anomalous_times) =
		match stats::detect_outliers(&samples, thresholds.anomaly_stddev_multiplier) {
			Some((threshold, outliers)) => (Some(threshold), outliers),
			None => (None, Vec::new()),
		};

	let high_variance = timing_stats
		.as_ref()
		.and_then(|s| s.std_dev.map(|sd| sd > thresholds.high_variance_ratio * s.avg_time))
		.unwrap_or(false);

	let performance_rating = match &timing_stats {
		Some(s) => stats::rate_performance(s.avg_time, &thresholds),
		None => stats::PerformanceRating::Unknown,
	};

	let failed_queries = errors.len();
	TimingProfile {
		domain: domain.to_string(),
		record_type: kind,
		nameserver: profile.id().to_string(),
		iterations,
		successful_queries: samples.len(),
		failed_queries,
		failure_rate: stats::round_secs(failed_queries as f64 / iterations as f64),
		samples,
		stats: timing_stats,
		anomaly_threshold,
		anomalous_times,
		high_variance,
		performance_rating,
		errors,
		total_query_time_seconds: stats::round_secs(start.elapsed().as_secs_f64()),
	}
}

fn observe(addr: SocketAddr, result: QueryResult) -> ResolverObservation {
	ResolverObservation {
		nameserver: addr.ip().to_string(),
		success: result.is_success(),
		query_time_seconds: result.query_time_seconds,
		records: result.records,
		error: result.error,
	}
}

/// Group non-erroring resolvers by their answer set, order-insensitively.
fn group_responses(results: &BTreeMap<String, ResolverObservation>) -> Vec<ResponseGroup> {
	let mut groups: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
	for (resolver, observation) in results {
		if !observation.success {
			continue;
		}
		let mut key = observation.records.clone().unwrap_or_default();
		key.sort();
		key.dedup();
		groups.entry(key).or_default().push(resolver.clone());
	}
	groups
		.into_iter()
		.map(|(records, resolvers)| ResponseGroup { records, resolvers })
		.collect()
}

/// Map cross-resolver agreement onto a trust tier.
fn classify_trust(is_consistent: bool, successes: usize, thresholds: &Thresholds) -> TrustLevel {
	if !is_consistent {
		TrustLevel::Inconsistent
	} else if successes >= thresholds.high_trust_agreement {
		TrustLevel::High
	} else if successes >= thresholds.medium_trust_agreement {
		TrustLevel::Medium
	} else {
		TrustLevel::Low
	}
}

/// Distinct record values across all probes that resolved.
fn collect_wildcard_records(probes: &[QueryResult]) -> BTreeSet<String> {
	let mut values = BTreeSet::new();
	for probe in probes {
		if !probe.is_success() {
			continue;
		}
		if let Some(records) = &probe.records {
			for record in records {
				values.insert(record.clone());
			}
		}
	}
	values
}

/// Deterministic risk tier from probe agreement.
///
/// One catch-all target is ordinary shared hosting; several distinct
/// targets on random subdomains is an unusual configuration worth a closer
/// look. A single CDN target is the most benign shape of all.
fn assess_wildcard_risk(values: &BTreeSet<String>) -> RiskLevel {
	if values.is_empty() {
		RiskLevel::Low
	} else if values.len() > 1 {
		RiskLevel::High
	} else if values.iter().any(|r| is_cdn_related(r)) {
		RiskLevel::Low
	} else {
		RiskLevel::Medium
	}
}

/// Generate a random lowercase-alphanumeric label unlikely to exist.
fn random_label(length: usize) -> String {
	const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
	let mut rng = rand::thread_rng();
	(0..length)
		.map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{ErrorDescriptor, ErrorKind};

	fn observation(success: bool, records: &[&str]) -> ResolverObservation {
		ResolverObservation {
			nameserver: "192.0.2.53".to_string(),
			success,
			query_time_seconds: 0.02,
			records: if success {
				Some(records.iter().map(|s| s.to_string()).collect())
			} else {
				None
			},
			error: if success {
				None
			} else {
				Some(ErrorDescriptor::new(ErrorKind::Timeout, "test"))
			},
		}
	}

	#[test]
	fn test_grouping_identical_answers() {
		let mut results = BTreeMap::new();
		results.insert("google".to_string(), observation(true, &["1.2.3.4", "5.6.7.8"]));
		// Same set, different order
		results.insert("quad9".to_string(), observation(true, &["5.6.7.8", "1.2.3.4"]));
		let groups = group_responses(&results);
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].resolvers.len(), 2);
	}

	#[test]
	fn test_grouping_divergent_answers() {
		let mut results = BTreeMap::new();
		results.insert("google".to_string(), observation(true, &["1.2.3.4"]));
		results.insert("quad9".to_string(), observation(true, &["9.9.9.100"]));
		let groups = group_responses(&results);
		assert_eq!(groups.len(), 2);
	}

	#[test]
	fn test_grouping_skips_errors() {
		let mut results = BTreeMap::new();
		results.insert("google".to_string(), observation(true, &["1.2.3.4"]));
		results.insert("opendns".to_string(), observation(false, &[]));
		let groups = group_responses(&results);
		assert_eq!(groups.len(), 1);
	}

	#[test]
	fn test_trust_classification() {
		let t = Thresholds::default();
		assert_eq!(classify_trust(true, 6, &t), TrustLevel::High);
		assert_eq!(classify_trust(true, 3, &t), TrustLevel::High);
		assert_eq!(classify_trust(true, 2, &t), TrustLevel::Medium);
		assert_eq!(classify_trust(true, 1, &t), TrustLevel::Low);
		assert_eq!(classify_trust(true, 0, &t), TrustLevel::Low);
		assert_eq!(classify_trust(false, 6, &t), TrustLevel::Inconsistent);
	}

	#[test]
	fn test_wildcard_risk_no_records() {
		assert_eq!(assess_wildcard_risk(&BTreeSet::new()), RiskLevel::Low);
	}

	#[test]
	fn test_wildcard_risk_single_target() {
		let values: BTreeSet<String> = ["203.0.113.10".to_string()].into_iter().collect();
		assert_eq!(assess_wildcard_risk(&values), RiskLevel::Medium);
	}

	#[test]
	fn test_wildcard_risk_multiple_targets() {
		let values: BTreeSet<String> =
			["203.0.113.10".to_string(), "203.0.113.11".to_string()].into_iter().collect();
		assert_eq!(assess_wildcard_risk(&values), RiskLevel::High);
	}

	#[test]
	fn test_wildcard_risk_cdn_downgrade() {
		let values: BTreeSet<String> =
			["abc123.cloudfront.net.".to_string()].into_iter().collect();
		assert_eq!(assess_wildcard_risk(&values), RiskLevel::Low);
	}

	#[test]
	fn test_collect_wildcard_records_ignores_failures() {
		let probes = vec![
			QueryResult::success("x.example.com", RecordKind::A, "system", 0.01,
				vec!["203.0.113.10".to_string()]),
			QueryResult::failure("y.example.com", RecordKind::A, "system", 0.01,
				ErrorDescriptor::new(ErrorKind::DomainNotFound, "NXDOMAIN")),
			QueryResult::success("z.example.com", RecordKind::Cname, "system", 0.01,
				vec!["203.0.113.10".to_string()]),
		];
		let values = collect_wildcard_records(&probes);
		assert_eq!(values.len(), 1);
	}

	#[test]
	fn test_random_labels_are_distinct_and_well_formed() {
		let a = random_label(32);
		let b = random_label(32);
		assert_eq!(a.len(), 32);
		assert_ne!(a, b);
		assert!(a.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
	}
}
