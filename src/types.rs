use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use hickory_proto::rr::RecordType;
use serde::Serialize;

use crate::stats::TimingStats;

/// DNS record types accepted by the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordKind {
	A,
	Aaaa,
	Mx,
	Txt,
	Ns,
	Soa,
	Cname,
	Caa,
	Srv,
	Ptr,
}

/// Record types queried by the query_all fan-out (PTR is reverse-only).
pub const QUERY_ALL_KINDS: [RecordKind; 9] = [
	RecordKind::A,
	RecordKind::Aaaa,
	RecordKind::Mx,
	RecordKind::Txt,
	RecordKind::Ns,
	RecordKind::Soa,
	RecordKind::Cname,
	RecordKind::Caa,
	RecordKind::Srv,
];

impl RecordKind {
	pub fn as_str(self) -> &'static str {
		match self {
			RecordKind::A => "A",
			RecordKind::Aaaa => "AAAA",
			RecordKind::Mx => "MX",
			RecordKind::Txt => "TXT",
			RecordKind::Ns => "NS",
			RecordKind::Soa => "SOA",
			RecordKind::Cname => "CNAME",
			RecordKind::Caa => "CAA",
			RecordKind::Srv => "SRV",
			RecordKind::Ptr => "PTR",
		}
	}

	pub fn to_record_type(self) -> RecordType {
		match self {
			RecordKind::A => RecordType::A,
			RecordKind::Aaaa => RecordType::AAAA,
			RecordKind::Mx => RecordType::MX,
			RecordKind::Txt => RecordType::TXT,
			RecordKind::Ns => RecordType::NS,
			RecordKind::Soa => RecordType::SOA,
			RecordKind::Cname => RecordType::CNAME,
			RecordKind::Caa => RecordType::CAA,
			RecordKind::Srv => RecordType::SRV,
			RecordKind::Ptr => RecordType::PTR,
		}
	}
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported record type '{0}' (supported: A, AAAA, MX, TXT, NS, SOA, CNAME, CAA, SRV, PTR)")]
pub struct UnknownRecordType(pub String);

impl FromStr for RecordKind {
	type Err = UnknownRecordType;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"A" => Ok(RecordKind::A),
			"AAAA" => Ok(RecordKind::Aaaa),
			"MX" => Ok(RecordKind::Mx),
			"TXT" => Ok(RecordKind::Txt),
			"NS" => Ok(RecordKind::Ns),
			"SOA" => Ok(RecordKind::Soa),
			"CNAME" => Ok(RecordKind::Cname),
			"CAA" => Ok(RecordKind::Caa),
			"SRV" => Ok(RecordKind::Srv),
			"PTR" => Ok(RecordKind::Ptr),
			_ => Err(UnknownRecordType(s.to_string())),
		}
	}
}

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	InvalidInput,
	DomainNotFound,
	NoRecords,
	Timeout,
	ResolverError,
	InvalidConfiguration,
}

impl ErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			ErrorKind::InvalidInput => "invalid_input",
			ErrorKind::DomainNotFound => "domain_not_found",
			ErrorKind::NoRecords => "no_records",
			ErrorKind::Timeout => "timeout",
			ErrorKind::ResolverError => "resolver_error",
			ErrorKind::InvalidConfiguration => "invalid_configuration",
		}
	}

	/// Investigative hint attached to every failure of this kind.
	pub fn hint(self) -> &'static str {
		match self {
			ErrorKind::InvalidInput => {
				"the input never reached the network; check for typos or unsupported syntax"
			}
			ErrorKind::DomainNotFound => {
				"NXDOMAIN can mean the domain never existed, expired, or was taken down; \
				 check historical DNS and similar name variations"
			}
			ErrorKind::NoRecords => {
				"absence of a record type is often benign (e.g. many domains configure no CAA); \
				 try other record types or resolvers before drawing conclusions"
			}
			ErrorKind::Timeout => {
				"slow or filtered nameserver; retry with a longer timeout or an alternative resolver"
			}
			ErrorKind::ResolverError => {
				"network or protocol level failure; compare against other resolvers to rule out \
				 a single unhealthy nameserver"
			}
			ErrorKind::InvalidConfiguration => {
				"the request itself is misconfigured; fix the resolver selection and retry"
			}
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A classified failure with a human-readable message and an OSINT hint.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDescriptor {
	pub kind: ErrorKind,
	pub message: String,
	pub hint: &'static str,
}

impl ErrorDescriptor {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		ErrorDescriptor {
			kind,
			message: message.into(),
			hint: kind.hint(),
		}
	}
}

/// Outcome of a single lookup against one resolver profile.
///
/// Exactly one of `records` and `error` is populated. For reverse lookups
/// `domain` holds the IP as given and `reverse_domain` the generated
/// `.arpa` name.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
	pub domain: String,
	pub record_type: RecordKind,
	pub nameserver: String,
	pub query_time_seconds: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reverse_domain: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub records: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub record_count: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorDescriptor>,
}

impl QueryResult {
	pub fn success(
		domain: impl Into<String>,
		record_type: RecordKind,
		nameserver: impl Into<String>,
		query_time_seconds: f64,
		records: Vec<String>,
	) -> Self {
		QueryResult {
			domain: domain.into(),
			record_type,
			nameserver: nameserver.into(),
			query_time_seconds,
			reverse_domain: None,
			record_count: Some(records.len()),
			records: Some(records),
			error: None,
		}
	}

	pub fn failure(
		domain: impl Into<String>,
		record_type: RecordKind,
		nameserver: impl Into<String>,
		query_time_seconds: f64,
		error: ErrorDescriptor,
	) -> Self {
		QueryResult {
			domain: domain.into(),
			record_type,
			nameserver: nameserver.into(),
			query_time_seconds,
			reverse_domain: None,
			records: None,
			record_count: None,
			error: Some(error),
		}
	}

	pub fn is_success(&self) -> bool {
		self.error.is_none()
	}

	/// True when the lookup succeeded with at least one record.
	pub fn has_records(&self) -> bool {
		self.records.as_ref().map(|r| !r.is_empty()).unwrap_or(false)
	}
}

/// Aggregated outcome of a bulk fan-out over many domains or IPs.
///
/// Each entry in `results` carries its own input key; a failed item is an
/// entry with an error descriptor, never a missing entry.
#[derive(Debug, Serialize)]
pub struct BulkResult {
	pub nameserver: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub record_type: Option<RecordKind>,
	pub attempted: usize,
	pub succeeded: usize,
	pub failed: usize,
	pub total_query_time_seconds: f64,
	pub average_query_time_seconds: f64,
	pub results: Vec<QueryResult>,
}

/// Full record profile of one domain across all supported record types.
///
/// Every type in [`QUERY_ALL_KINDS`] appears in exactly one of `records`
/// and `errors`.
#[derive(Debug, Serialize)]
pub struct QueryAllReport {
	pub domain: String,
	pub nameserver: String,
	pub records: BTreeMap<RecordKind, Vec<String>>,
	pub errors: BTreeMap<RecordKind, ErrorDescriptor>,
	pub record_types_found: usize,
	pub total_records: usize,
	pub total_query_time_seconds: f64,
}

/// Trust classification derived from cross-resolver agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
	High,
	Medium,
	Low,
	Inconsistent,
}

impl fmt::Display for TrustLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TrustLevel::High => "high",
			TrustLevel::Medium => "medium",
			TrustLevel::Low => "low",
			TrustLevel::Inconsistent => "inconsistent",
		};
		f.write_str(s)
	}
}

/// What one resolver answered during a propagation check.
#[derive(Debug, Clone, Serialize)]
pub struct ResolverObservation {
	pub nameserver: String,
	pub success: bool,
	pub query_time_seconds: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub records: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorDescriptor>,
}

/// Resolvers that agreed on one particular record set.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseGroup {
	pub records: Vec<String>,
	pub resolvers: Vec<String>,
}

/// Cross-resolver consistency report for one domain and record type.
#[derive(Debug, Serialize)]
pub struct ConsistencyReport {
	pub domain: String,
	pub record_type: RecordKind,
	pub resolvers_queried: usize,
	pub successful_queries: usize,
	pub failed_queries: usize,
	pub is_consistent: bool,
	pub unique_response_count: usize,
	pub trust_level: TrustLevel,
	pub resolver_results: BTreeMap<String, ResolverObservation>,
	pub response_groups: Vec<ResponseGroup>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub time_stats: Option<TimingStats>,
	pub total_query_time_seconds: f64,
}

/// Risk classification for wildcard DNS findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
	Low,
	Medium,
	High,
}

impl fmt::Display for RiskLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RiskLevel::Low => "low",
			RiskLevel::Medium => "medium",
			RiskLevel::High => "high",
		};
		f.write_str(s)
	}
}

/// Wildcard DNS detection report.
#[derive(Debug, Serialize)]
pub struct WildcardReport {
	pub domain: String,
	pub test_count: usize,
	pub nameserver: String,
	pub has_wildcard: bool,
	/// Distinct record values observed across resolving probes
	pub wildcard_records: Vec<String>,
	pub single_target: bool,
	pub cdn_related: bool,
	pub risk_level: RiskLevel,
	pub probes: Vec<QueryResult>,
	pub total_query_time_seconds: f64,
}

/// Response-time profile of repeated queries against one name and type.
#[derive(Debug, Serialize)]
pub struct TimingProfile {
	pub domain: String,
	pub record_type: RecordKind,
	pub nameserver: String,
	pub iterations: usize,
	pub successful_queries: usize,
	pub failed_queries: usize,
	pub failure_rate: f64,
	pub samples: Vec<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stats: Option<TimingStats>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub anomaly_threshold: Option<f64>,
	pub anomalous_times: Vec<f64>,
	pub high_variance: bool,
	pub performance_rating: crate::stats::PerformanceRating,
	pub errors: Vec<ErrorDescriptor>,
	pub total_query_time_seconds: f64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_record_kind_roundtrip() {
		for kind in QUERY_ALL_KINDS {
			let parsed: RecordKind = kind.as_str().parse().unwrap();
			assert_eq!(parsed, kind);
		}
		assert_eq!("ptr".parse::<RecordKind>().unwrap(), RecordKind::Ptr);
		assert_eq!("aaaa".parse::<RecordKind>().unwrap(), RecordKind::Aaaa);
	}

	#[test]
	fn test_record_kind_rejects_unknown() {
		assert!("AXFR".parse::<RecordKind>().is_err());
		assert!("".parse::<RecordKind>().is_err());
	}

	#[test]
	fn test_query_all_kinds_excludes_ptr() {
		assert!(!QUERY_ALL_KINDS.contains(&RecordKind::Ptr));
		assert_eq!(QUERY_ALL_KINDS.len(), 9);
	}

	#[test]
	fn test_result_exclusivity() {
		let ok = QueryResult::success("example.com", RecordKind::A, "google", 0.05,
			vec!["93.184.216.34".to_string()]);
		assert!(ok.is_success());
		assert!(ok.has_records());
		assert!(ok.error.is_none());

		let err = QueryResult::failure("example.com", RecordKind::A, "google", 0.05,
			ErrorDescriptor::new(ErrorKind::Timeout, "query timed out"));
		assert!(!err.is_success());
		assert!(err.records.is_none());
		assert!(err.record_count.is_none());
	}

	#[test]
	fn test_error_serialization_uses_snake_case_kinds() {
		let desc = ErrorDescriptor::new(ErrorKind::DomainNotFound, "NXDOMAIN");
		let json = serde_json::to_value(&desc).unwrap();
		assert_eq!(json["kind"], "domain_not_found");
		assert!(!json["hint"].as_str().unwrap().is_empty());
	}

	#[test]
	fn test_record_kind_serializes_as_map_key() {
		let mut records = BTreeMap::new();
		records.insert(RecordKind::Aaaa, vec!["::1".to_string()]);
		let json = serde_json::to_value(&records).unwrap();
		assert!(json.get("AAAA").is_some());
	}
}
