use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::Semaphore;

use crate::engine::QueryEngine;
use crate::resolver::ResolverProfile;
use crate::stats::round_secs;
use crate::types::{
	BulkResult, ErrorDescriptor, ErrorKind, QueryAllReport, QueryResult, RecordKind,
	QUERY_ALL_KINDS,
};

/// Query one record type for many domains concurrently.
///
/// At most `max_workers` queries are in flight at once (clamped to the
/// configured ceiling and the batch size). A single item's failure becomes
/// that item's entry; it never aborts the batch.
pub async fn bulk_query(
	engine: &Arc<QueryEngine>,
	domains: &[String],
	kind: RecordKind,
	profile: &ResolverProfile,
	max_workers: usize,
	timeout: Duration,
) -> BulkResult {
	let start = Instant::now();
	if domains.is_empty() {
		return aggregate(profile.id(), Some(kind), Vec::new(), 0.0);
	}

	let workers = engine.config().clamp_workers(max_workers).min(domains.len());
	let semaphore = Arc::new(Semaphore::new(workers));

	let mut handles = Vec::with_capacity(domains.len());
	for domain in domains {
		let engine = engine.clone();
		let profile = profile.clone();
		let domain = domain.clone();
		let sem = semaphore.clone();
		handles.push(tokio::spawn(async move {
			let _permit = sem.acquire().await.unwrap();
			engine.query(&domain, kind, &profile, timeout).await
		}));
	}

	let mut results = Vec::with_capacity(domains.len());
	for (i, handle) in handles.into_iter().enumerate() {
		match handle.await {
			Ok(result) => results.push(result),
			Err(e) => {
				warn!("bulk query task for '{}' failed: {}", domains[i], e);
				results.push(QueryResult::failure(
					domains[i].clone(),
					kind,
					profile.id(),
					0.0,
					ErrorDescriptor::new(
						ErrorKind::ResolverError,
						format!("query task failed: {}", e),
					),
				));
			}
		}
	}

	aggregate(profile.id(), Some(kind), results, start.elapsed().as_secs_f64())
}

/// Reverse-lookup many IP addresses concurrently.
///
/// Mirrors [`bulk_query`] for PTR; invalid IPs fail fast per item without
/// any network traffic.
pub async fn bulk_reverse_lookup(
	engine: &Arc<QueryEngine>,
	ips: &[String],
	profile: &ResolverProfile,
	max_workers: usize,
	timeout: Duration,
) -> BulkResult {
	let start = Instant::now();
	if ips.is_empty() {
		return aggregate(profile.id(), Some(RecordKind::Ptr), Vec::new(), 0.0);
	}

	let workers = engine.config().clamp_workers(max_workers).min(ips.len());
	let semaphore = Arc::new(Semaphore::new(workers));

	let mut handles = Vec::with_capacity(ips.len());
	for ip in ips {
		let engine = engine.clone();
		let profile = profile.clone();
		let ip = ip.clone();
		let sem = semaphore.clone();
		handles.push(tokio::spawn(async move {
			let _permit = sem.acquire().await.unwrap();
			engine.reverse(&ip, &profile, timeout).await
		}));
	}

	let mut results = Vec::with_capacity(ips.len());
	for (i, handle) in handles.into_iter().enumerate() {
		match handle.await {
			Ok(result) => results.push(result),
			Err(e) => {
				warn!("bulk reverse task for '{}' failed: {}", ips[i], e);
				results.push(QueryResult::failure(
					ips[i].clone(),
					RecordKind::Ptr,
					profile.id(),
					0.0,
					ErrorDescriptor::new(
						ErrorKind::ResolverError,
						format!("reverse lookup task failed: {}", e),
					),
				));
			}
		}
	}

	aggregate(profile.id(), Some(RecordKind::Ptr), results, start.elapsed().as_secs_f64())
}

/// Query every supported record type for one domain concurrently.
///
/// The fan-out is bounded by a small same-resolver ceiling so a full
/// profile does not hammer a single nameserver. Every type lands in exactly
/// one of the returned `records`/`errors` maps. Total time is wall-clock
/// across the fan-out, not the sum of individual queries.
pub async fn query_all(
	engine: &Arc<QueryEngine>,
	domain: &str,
	profile: &ResolverProfile,
	timeout: Duration,
) -> QueryAllReport {
	let start = Instant::now();
	let semaphore = Arc::new(Semaphore::new(engine.config().query_all_concurrency));

	let mut handles = Vec::with_capacity(QUERY_ALL_KINDS.len());
	for kind in QUERY_ALL_KINDS {
		let engine = engine.clone();
		let profile = profile.clone();
		let domain = domain.to_string();
		let sem = semaphore.clone();
		let handle = tokio::spawn(async move {
			let _permit = sem.acquire().await.unwrap();
			engine.query(&domain, kind, &profile, timeout).await
		});
		handles.push((kind, handle));
	}

	let mut records = BTreeMap::new();
	let mut errors = BTreeMap::new();
	for (kind, handle) in handles {
		match handle.await {
			Ok(result) => match (result.records, result.error) {
				(Some(values), None) => {
					records.insert(kind, values);
				}
				(_, Some(error)) => {
					errors.insert(kind, error);
				}
				// Legitimately empty answer: success with zero records
				(None, None) => {
					records.insert(kind, Vec::new());
				}
			},
			Err(e) => {
				warn!("query_all task for {} failed: {}", kind, e);
				errors.insert(
					kind,
					ErrorDescriptor::new(
						ErrorKind::ResolverError,
						format!("query task failed: {}", e),
					),
				);
			}
		}
	}

	let record_types_found = records.values().filter(|v| !v.is_empty()).count();
	let total_records = records.values().map(|v| v.len()).sum();

	QueryAllReport {
		domain: domain.to_string(),
		nameserver: profile.id().to_string(),
		records,
		errors,
		record_types_found,
		total_records,
		total_query_time_seconds: round_secs(start.elapsed().as_secs_f64()),
	}
}

/// Fold per-item results into the aggregate bulk shape.
fn aggregate(
	nameserver: &str,
	record_type: Option<RecordKind>,
	results: Vec<QueryResult>,
	total_seconds: f64,
) -> BulkResult {
	let attempted = results.len();
	let succeeded = results.iter().filter(|r| r.is_success()).count();
	let average = if attempted > 0 {
		total_seconds / attempted as f64
	} else {
		0.0
	};
	BulkResult {
		nameserver: nameserver.to_string(),
		record_type,
		attempted,
		succeeded,
		failed: attempted - succeeded,
		total_query_time_seconds: round_secs(total_seconds),
		average_query_time_seconds: round_secs(average),
		results,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ok(domain: &str) -> QueryResult {
		QueryResult::success(domain, RecordKind::A, "public", 0.02, vec!["192.0.2.1".to_string()])
	}

	fn err(domain: &str, kind: ErrorKind) -> QueryResult {
		QueryResult::failure(domain, RecordKind::A, "public", 0.02,
			ErrorDescriptor::new(kind, "test failure"))
	}

	#[test]
	fn test_aggregate_counts() {
		let results = vec![
			ok("good.com"),
			err("bad.invalid-tld", ErrorKind::InvalidInput),
			ok("other.com"),
			err("slow.com", ErrorKind::Timeout),
		];
		let bulk = aggregate("public", Some(RecordKind::A), results, 0.4);
		assert_eq!(bulk.attempted, 4);
		assert_eq!(bulk.succeeded, 2);
		assert_eq!(bulk.failed, 2);
		assert_eq!(bulk.succeeded + bulk.failed, bulk.attempted);
		assert_eq!(bulk.total_query_time_seconds, 0.4);
		assert_eq!(bulk.average_query_time_seconds, 0.1);
	}

	#[test]
	fn test_aggregate_empty_batch() {
		let bulk = aggregate("public", Some(RecordKind::A), Vec::new(), 0.0);
		assert_eq!(bulk.attempted, 0);
		assert_eq!(bulk.succeeded, 0);
		assert_eq!(bulk.failed, 0);
		assert_eq!(bulk.average_query_time_seconds, 0.0);
	}

	#[test]
	fn test_aggregate_preserves_item_keys() {
		let results = vec![ok("a.com"), err("b.com", ErrorKind::DomainNotFound)];
		let bulk = aggregate("google", Some(RecordKind::A), results, 0.1);
		let domains: Vec<&str> = bulk.results.iter().map(|r| r.domain.as_str()).collect();
		assert_eq!(domains, vec!["a.com", "b.com"]);
		assert!(bulk.results[1].error.as_ref().unwrap().kind == ErrorKind::DomainNotFound);
	}
}
