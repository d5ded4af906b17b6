use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::analysis;
use crate::bulk;
use crate::engine::QueryEngine;
use crate::resolver::{parse_nameserver, resolve_profile, ConfigError};
use crate::types::{
	BulkResult, ConsistencyReport, QueryAllReport, QueryResult, RecordKind, TimingProfile,
	WildcardReport,
};

/// Names of every operation on the registry surface, in a stable order.
#[allow(dead_code)]
pub const OPERATION_NAMES: [&str; 8] = [
	"query",
	"reverse_lookup",
	"bulk_query",
	"bulk_reverse_lookup",
	"query_all",
	"propagation_check",
	"wildcard_check",
	"response_analysis",
];

/// A typed request for one registry operation.
///
/// The transport shell (CLI here) builds one of these and hands it to
/// [`dispatch`]; nothing else reaches into the engine directly.
#[derive(Debug)]
pub enum Operation {
	Query {
		domain: String,
		record_type: RecordKind,
		resolver_type: String,
		custom_nameserver: Option<String>,
		timeout_secs: u64,
	},
	ReverseLookup {
		ip: String,
		resolver_type: String,
		custom_nameserver: Option<String>,
		timeout_secs: u64,
	},
	BulkQuery {
		domains: Vec<String>,
		record_type: RecordKind,
		resolver_type: String,
		custom_nameserver: Option<String>,
		max_workers: usize,
		timeout_secs: u64,
	},
	BulkReverseLookup {
		ips: Vec<String>,
		resolver_type: String,
		custom_nameserver: Option<String>,
		max_workers: usize,
		timeout_secs: u64,
	},
	QueryAll {
		domain: String,
		resolver_type: String,
		custom_nameserver: Option<String>,
		timeout_secs: u64,
	},
	PropagationCheck {
		domain: String,
		record_type: RecordKind,
		/// Caller-supplied (name, address) pairs; None uses the default set
		resolvers: Option<Vec<(String, String)>>,
		timeout_secs: u64,
	},
	WildcardCheck {
		domain: String,
		test_count: Option<usize>,
		resolver_type: String,
		custom_nameserver: Option<String>,
		timeout_secs: u64,
	},
	ResponseAnalysis {
		domain: String,
		record_type: RecordKind,
		iterations: Option<usize>,
		resolver_type: String,
		custom_nameserver: Option<String>,
		timeout_secs: u64,
	},
}

impl Operation {
	pub fn name(&self) -> &'static str {
		match self {
			Operation::Query { .. } => "query",
			Operation::ReverseLookup { .. } => "reverse_lookup",
			Operation::BulkQuery { .. } => "bulk_query",
			Operation::BulkReverseLookup { .. } => "bulk_reverse_lookup",
			Operation::QueryAll { .. } => "query_all",
			Operation::PropagationCheck { .. } => "propagation_check",
			Operation::WildcardCheck { .. } => "wildcard_check",
			Operation::ResponseAnalysis { .. } => "response_analysis",
		}
	}
}

/// The response shape of each operation, serialized as-is for callers.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
	Query(QueryResult),
	Bulk(BulkResult),
	QueryAll(QueryAllReport),
	Consistency(ConsistencyReport),
	Wildcard(WildcardReport),
	Timing(TimingProfile),
}

/// Run one operation to completion.
///
/// Only configuration mistakes (unknown resolver type, missing or invalid
/// custom nameserver) fail the whole operation; every other error is
/// embedded in the report next to the item it belongs to.
pub async fn dispatch(
	engine: &Arc<QueryEngine>,
	operation: Operation,
) -> Result<Report, ConfigError> {
	match operation {
		Operation::Query {
			domain,
			record_type,
			resolver_type,
			custom_nameserver,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Query(
				engine.query(&domain, record_type, &profile, timeout).await,
			))
		}
		Operation::ReverseLookup {
			ip,
			resolver_type,
			custom_nameserver,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Query(engine.reverse(&ip, &profile, timeout).await))
		}
		Operation::BulkQuery {
			domains,
			record_type,
			resolver_type,
			custom_nameserver,
			max_workers,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Bulk(
				bulk::bulk_query(engine, &domains, record_type, &profile, max_workers, timeout)
					.await,
			))
		}
		Operation::BulkReverseLookup {
			ips,
			resolver_type,
			custom_nameserver,
			max_workers,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Bulk(
				bulk::bulk_reverse_lookup(engine, &ips, &profile, max_workers, timeout).await,
			))
		}
		Operation::QueryAll {
			domain,
			resolver_type,
			custom_nameserver,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::QueryAll(
				bulk::query_all(engine, &domain, &profile, timeout).await,
			))
		}
		Operation::PropagationCheck {
			domain,
			record_type,
			resolvers,
			timeout_secs,
		} => {
			let resolvers = match resolvers {
				Some(pairs) => Some(parse_resolver_pairs(pairs)?),
				None => None,
			};
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Consistency(
				analysis::propagation_check(engine, &domain, record_type, resolvers, timeout)
					.await,
			))
		}
		Operation::WildcardCheck {
			domain,
			test_count,
			resolver_type,
			custom_nameserver,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Wildcard(
				analysis::wildcard_check(engine, &domain, test_count, &profile, timeout).await,
			))
		}
		Operation::ResponseAnalysis {
			domain,
			record_type,
			iterations,
			resolver_type,
			custom_nameserver,
			timeout_secs,
		} => {
			let profile = resolve_profile(&resolver_type, custom_nameserver.as_deref())?;
			let timeout = Duration::from_secs(timeout_secs);
			Ok(Report::Timing(
				analysis::response_analysis(engine, &domain, record_type, iterations, &profile, timeout)
					.await,
			))
		}
	}
}

fn parse_resolver_pairs(
	pairs: Vec<(String, String)>,
) -> Result<Vec<(String, SocketAddr)>, ConfigError> {
	pairs
		.into_iter()
		.map(|(name, addr)| Ok((name, parse_nameserver(&addr)?)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::Config;
	use crate::limiter::RateLimiterSet;

	fn test_engine() -> Arc<QueryEngine> {
		let config = Config::default();
		let limiter = Arc::new(RateLimiterSet::new(config.rate_limit, config.rate_limit));
		Arc::new(QueryEngine::new(config, limiter))
	}

	#[test]
	fn test_operation_names_match_registry() {
		let op = Operation::Query {
			domain: "example.com".to_string(),
			record_type: RecordKind::A,
			resolver_type: "system".to_string(),
			custom_nameserver: None,
			timeout_secs: 10,
		};
		assert!(OPERATION_NAMES.contains(&op.name()));
		assert_eq!(OPERATION_NAMES.len(), 8);
	}

	#[tokio::test]
	async fn test_unknown_resolver_type_fails_whole_operation() {
		let engine = test_engine();
		let op = Operation::Query {
			domain: "example.com".to_string(),
			record_type: RecordKind::A,
			resolver_type: "nonexistent".to_string(),
			custom_nameserver: None,
			timeout_secs: 10,
		};
		assert!(matches!(
			dispatch(&engine, op).await,
			Err(ConfigError::UnknownResolverType(_))
		));
	}

	#[tokio::test]
	async fn test_custom_without_nameserver_fails_whole_operation() {
		let engine = test_engine();
		let op = Operation::QueryAll {
			domain: "example.com".to_string(),
			resolver_type: "custom".to_string(),
			custom_nameserver: None,
			timeout_secs: 10,
		};
		assert!(matches!(
			dispatch(&engine, op).await,
			Err(ConfigError::MissingCustomNameserver)
		));
	}

	#[tokio::test]
	async fn test_bad_propagation_resolver_address_fails() {
		let engine = test_engine();
		let op = Operation::PropagationCheck {
			domain: "example.com".to_string(),
			record_type: RecordKind::A,
			resolvers: Some(vec![("corp".to_string(), "not-an-ip".to_string())]),
			timeout_secs: 10,
		};
		assert!(matches!(
			dispatch(&engine, op).await,
			Err(ConfigError::InvalidNameserver { .. })
		));
	}
}
