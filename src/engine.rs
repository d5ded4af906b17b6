use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{Name, RData};
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::config::Config;
use crate::limiter::RateLimiterSet;
use crate::resolver::ResolverProfile;
use crate::stats::round_secs;
use crate::types::{ErrorDescriptor, ErrorKind, QueryResult, RecordKind};

/// Issues rate-limited lookups against a resolver profile and normalizes
/// the outcome into a [`QueryResult`].
///
/// The limiter set is shared process-wide; the engine itself is stateless
/// and cheap to share via Arc across concurrent fan-outs.
pub struct QueryEngine {
	config: Config,
	limiter: Arc<RateLimiterSet>,
}

impl QueryEngine {
	pub fn new(config: Config, limiter: Arc<RateLimiterSet>) -> Self {
		QueryEngine { config, limiter }
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Look up one record type for a domain against a resolver profile.
	///
	/// Malformed domains are rejected before any network traffic and before
	/// any rate-limit token is consumed.
	pub async fn query(
		&self,
		domain: &str,
		kind: RecordKind,
		profile: &ResolverProfile,
		timeout: Duration,
	) -> QueryResult {
		if let Err(error) = validate_domain(domain) {
			return QueryResult::failure(domain, kind, profile.id(), 0.0, error);
		}
		let (elapsed, outcome) = self.lookup_profile(domain, kind, profile, timeout).await;
		match outcome {
			Ok(records) => QueryResult::success(domain, kind, profile.id(), elapsed, records),
			Err(error) => QueryResult::failure(domain, kind, profile.id(), elapsed, error),
		}
	}

	/// Reverse (PTR) lookup for an IP address.
	///
	/// The IP is validated and converted to its `.arpa` name before dispatch.
	pub async fn reverse(
		&self,
		ip: &str,
		profile: &ResolverProfile,
		timeout: Duration,
	) -> QueryResult {
		let parsed: IpAddr = match ip.trim().parse() {
			Ok(addr) => addr,
			Err(_) => {
				let error = ErrorDescriptor::new(
					ErrorKind::InvalidInput,
					format!("invalid IP address '{}'", ip),
				);
				return QueryResult::failure(ip, RecordKind::Ptr, profile.id(), 0.0, error);
			}
		};
		let reverse_domain = reverse_name(parsed);
		let (elapsed, outcome) = self
			.lookup_profile(&reverse_domain, RecordKind::Ptr, profile, timeout)
			.await;
		let mut result = match outcome {
			Ok(records) => QueryResult::success(ip, RecordKind::Ptr, profile.id(), elapsed, records),
			Err(error) => QueryResult::failure(ip, RecordKind::Ptr, profile.id(), elapsed, error),
		};
		result.reverse_domain = Some(reverse_domain);
		result
	}

	/// Try the profile's nameservers in order: first success wins; if every
	/// nameserver fails only the final one's error is surfaced.
	///
	/// The reported elapsed time covers network attempts only; time spent
	/// waiting on the rate limiter is excluded.
	async fn lookup_profile(
		&self,
		name: &str,
		kind: RecordKind,
		profile: &ResolverProfile,
		timeout: Duration,
	) -> (f64, Result<Vec<String>, ErrorDescriptor>) {
		let timeout = self.config.clamp_timeout(timeout);
		let mut network_time = 0.0;
		let mut last_error =
			ErrorDescriptor::new(ErrorKind::ResolverError, "resolver profile has no nameservers");

		for &nameserver in profile.nameservers() {
			self.limiter.acquire(nameserver).await;
			debug!("querying {} {} against {}", name, kind, nameserver);

			let resolver = build_resolver(nameserver, timeout);
			let start = Instant::now();
			let outcome =
				tokio::time::timeout(timeout, resolver.lookup(name, kind.to_record_type())).await;
			network_time += start.elapsed().as_secs_f64();

			match outcome {
				Ok(Ok(lookup)) => {
					let records: Vec<String> = lookup.iter().map(format_rdata).collect();
					return (round_secs(network_time), Ok(records));
				}
				Ok(Err(err)) => {
					last_error = classify_error(&err);
				}
				Err(_) => {
					last_error = ErrorDescriptor::new(
						ErrorKind::Timeout,
						format!(
							"no response from {} within {} ms",
							nameserver,
							timeout.as_millis()
						),
					);
				}
			}
			debug!("{} {} via {} failed: {}", name, kind, nameserver, last_error.message);
		}

		(round_secs(network_time), Err(last_error))
	}
}

/// Syntactic domain validation, applied before any network attempt.
pub fn validate_domain(domain: &str) -> Result<(), ErrorDescriptor> {
	let invalid = |reason: String| {
		ErrorDescriptor::new(
			ErrorKind::InvalidInput,
			format!("invalid domain name '{}': {}", domain, reason),
		)
	};

	let trimmed = domain.trim();
	if trimmed.is_empty() {
		return Err(invalid("empty name".to_string()));
	}
	if trimmed.len() > 253 {
		return Err(invalid("name exceeds 253 characters".to_string()));
	}
	for label in trimmed.trim_end_matches('.').split('.') {
		if label.is_empty() {
			return Err(invalid("empty label".to_string()));
		}
		if label.len() > 63 {
			return Err(invalid(format!("label '{}' exceeds 63 characters", label)));
		}
		if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
			return Err(invalid(format!("label '{}' contains invalid characters", label)));
		}
	}
	// Name parsing catches anything the label checks missed
	Name::from_ascii(trimmed)
		.map(|_| ())
		.map_err(|e| invalid(e.to_string()))
}

/// Map a resolver failure onto the closed error-kind set.
pub fn classify_error(err: &ResolveError) -> ErrorDescriptor {
	match err.kind() {
		ResolveErrorKind::NoRecordsFound { response_code, .. } => {
			if *response_code == ResponseCode::NXDomain {
				ErrorDescriptor::new(
					ErrorKind::DomainNotFound,
					format!("domain does not exist: {}", err),
				)
			} else {
				ErrorDescriptor::new(
					ErrorKind::NoRecords,
					format!("no records of the requested type: {}", err),
				)
			}
		}
		ResolveErrorKind::Timeout => {
			ErrorDescriptor::new(ErrorKind::Timeout, format!("query timed out: {}", err))
		}
		_ => ErrorDescriptor::new(ErrorKind::ResolverError, err.to_string()),
	}
}

/// Build a single-nameserver UDP resolver for one attempt.
fn build_resolver(nameserver: SocketAddr, timeout: Duration) -> TokioAsyncResolver {
	let mut resolver_config = ResolverConfig::new();
	let mut ns = NameServerConfig::new(nameserver, Protocol::Udp);
	ns.trust_negative_responses = true;
	resolver_config.add_name_server(ns);

	let mut opts = ResolverOpts::default();
	opts.timeout = timeout;
	opts.attempts = 1;
	opts.edns0 = true;
	opts.use_hosts_file = false;
	opts.validate = false;
	// Cache disabled: repeated timing samples must hit the network
	opts.cache_size = 0;

	TokioAsyncResolver::tokio(resolver_config, opts)
}

/// Format one resource record value the way investigators expect to read it.
pub fn format_rdata(rdata: &RData) -> String {
	match rdata {
		RData::A(a) => a.to_string(),
		RData::AAAA(aaaa) => aaaa.to_string(),
		RData::CNAME(cname) => cname.to_string(),
		RData::NS(ns) => ns.to_string(),
		RData::PTR(ptr) => ptr.to_string(),
		RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
		RData::SOA(soa) => format!(
			"{} {} {} {} {} {} {}",
			soa.mname(),
			soa.rname(),
			soa.serial(),
			soa.refresh(),
			soa.retry(),
			soa.expire(),
			soa.minimum(),
		),
		RData::SRV(srv) => format!(
			"{} {} {} {}",
			srv.priority(),
			srv.weight(),
			srv.port(),
			srv.target(),
		),
		RData::TXT(txt) => txt.iter().map(|part| String::from_utf8_lossy(part)).collect(),
		other => other.to_string(),
	}
}

/// Build the `.arpa` reverse-lookup name for an IP address.
pub fn reverse_name(ip: IpAddr) -> String {
	match ip {
		IpAddr::V4(v4) => {
			let o = v4.octets();
			format!("{}.{}.{}.{}.in-addr.arpa.", o[3], o[2], o[1], o[0])
		}
		IpAddr::V6(v6) => {
			let mut labels = Vec::with_capacity(32);
			for byte in v6.octets().iter().rev() {
				labels.push(format!("{:x}", byte & 0x0f));
				labels.push(format!("{:x}", byte >> 4));
			}
			format!("{}.ip6.arpa.", labels.join("."))
		}
	}
}
