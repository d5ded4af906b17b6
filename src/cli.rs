use clap::{Args, Parser, Subcommand};

use crate::ops::Operation;
use crate::types::RecordKind;

/// DNS reconnaissance tool for OSINT investigations
#[derive(Parser, Debug)]
#[command(name = "dns-recon")]
#[command(about = "DNS reconnaissance: rate-limited queries, propagation checks, wildcard detection, timing analysis")]
pub struct Cli {
	/// Print the full report as pretty JSON instead of summary tables
	#[arg(long, global = true)]
	pub json: bool,

	/// Per-nameserver rate limit in queries per second
	#[arg(long = "rate-limit", default_value = "30", global = true)]
	pub rate_limit: f64,

	#[command(subcommand)]
	pub command: Command,
}

/// Resolver selection shared by most subcommands.
#[derive(Args, Debug)]
pub struct ResolverArgs {
	/// Resolver profile (system, public, google, cloudflare, quad9, opendns, custom)
	#[arg(short = 'r', long = "resolver", default_value = "system")]
	pub resolver_type: String,

	/// Custom nameserver address (overrides the resolver profile)
	#[arg(short = 'n', long = "nameserver")]
	pub nameserver: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Query one record type for a domain
	Query {
		domain: String,

		/// DNS record type (A, AAAA, MX, TXT, NS, SOA, CNAME, CAA, SRV, PTR)
		#[arg(short = 't', long = "type", default_value = "A")]
		record_type: RecordKind,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},

	/// Reverse (PTR) lookup for an IP address
	Reverse {
		ip: String,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},

	/// Query one record type for many domains concurrently
	Bulk {
		/// Domains to query
		#[arg(required = true)]
		domains: Vec<String>,

		/// DNS record type for all queries
		#[arg(short = 't', long = "type", default_value = "A")]
		record_type: RecordKind,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Maximum concurrent queries
		#[arg(short = 'w', long = "max-workers", default_value = "10")]
		max_workers: usize,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,

		/// Write per-item results to a CSV file
		#[arg(short = 'o', long = "output")]
		output: Option<String>,
	},

	/// Reverse-lookup many IP addresses concurrently
	BulkReverse {
		/// IP addresses to reverse-lookup
		#[arg(required = true)]
		ips: Vec<String>,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Maximum concurrent queries
		#[arg(short = 'w', long = "max-workers", default_value = "10")]
		max_workers: usize,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,

		/// Write per-item results to a CSV file
		#[arg(short = 'o', long = "output")]
		output: Option<String>,
	},

	/// Query all supported record types for a domain
	QueryAll {
		domain: String,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},

	/// Compare answers for one domain across many resolvers
	Propagation {
		domain: String,

		/// DNS record type to compare
		#[arg(short = 't', long = "type", default_value = "A")]
		record_type: RecordKind,

		/// Resolver to query as name=address (repeatable; replaces the default set)
		#[arg(long = "resolver-at", value_name = "NAME=ADDR")]
		resolver_at: Vec<String>,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},

	/// Probe random subdomains to detect wildcard DNS
	Wildcard {
		domain: String,

		/// Number of random subdomains to probe
		#[arg(long = "probes")]
		probes: Option<usize>,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},

	/// Profile response times with repeated queries
	Timing {
		domain: String,

		/// DNS record type to query
		#[arg(short = 't', long = "type", default_value = "A")]
		record_type: RecordKind,

		/// Number of query iterations
		#[arg(long = "iterations")]
		iterations: Option<usize>,

		#[command(flatten)]
		resolver: ResolverArgs,

		/// Query timeout in seconds
		#[arg(long = "timeout", default_value = "10")]
		timeout: u64,
	},
}

impl Command {
	/// CSV export path, where the subcommand supports one.
	pub fn csv_output(&self) -> Option<&str> {
		match self {
			Command::Bulk { output, .. } | Command::BulkReverse { output, .. } => {
				output.as_deref()
			}
			_ => None,
		}
	}

	/// Translate the parsed subcommand into a registry operation.
	pub fn into_operation(self) -> Operation {
		match self {
			Command::Query { domain, record_type, resolver, timeout } => Operation::Query {
				domain,
				record_type,
				resolver_type: resolver.resolver_type,
				custom_nameserver: resolver.nameserver,
				timeout_secs: timeout,
			},
			Command::Reverse { ip, resolver, timeout } => Operation::ReverseLookup {
				ip,
				resolver_type: resolver.resolver_type,
				custom_nameserver: resolver.nameserver,
				timeout_secs: timeout,
			},
			Command::Bulk { domains, record_type, resolver, max_workers, timeout, .. } => {
				Operation::BulkQuery {
					domains,
					record_type,
					resolver_type: resolver.resolver_type,
					custom_nameserver: resolver.nameserver,
					max_workers,
					timeout_secs: timeout,
				}
			}
			Command::BulkReverse { ips, resolver, max_workers, timeout, .. } => {
				Operation::BulkReverseLookup {
					ips,
					resolver_type: resolver.resolver_type,
					custom_nameserver: resolver.nameserver,
					max_workers,
					timeout_secs: timeout,
				}
			}
			Command::QueryAll { domain, resolver, timeout } => Operation::QueryAll {
				domain,
				resolver_type: resolver.resolver_type,
				custom_nameserver: resolver.nameserver,
				timeout_secs: timeout,
			},
			Command::Propagation { domain, record_type, resolver_at, timeout } => {
				let resolvers = if resolver_at.is_empty() {
					None
				} else {
					Some(resolver_at.iter().map(|spec| parse_resolver_spec(spec)).collect())
				};
				Operation::PropagationCheck {
					domain,
					record_type,
					resolvers,
					timeout_secs: timeout,
				}
			}
			Command::Wildcard { domain, probes, resolver, timeout } => Operation::WildcardCheck {
				domain,
				test_count: probes,
				resolver_type: resolver.resolver_type,
				custom_nameserver: resolver.nameserver,
				timeout_secs: timeout,
			},
			Command::Timing { domain, record_type, iterations, resolver, timeout } => {
				Operation::ResponseAnalysis {
					domain,
					record_type,
					iterations,
					resolver_type: resolver.resolver_type,
					custom_nameserver: resolver.nameserver,
					timeout_secs: timeout,
				}
			}
		}
	}
}

/// Split a "name=address" resolver spec; a bare address names itself.
fn parse_resolver_spec(spec: &str) -> (String, String) {
	match spec.split_once('=') {
		Some((name, addr)) => (name.trim().to_string(), addr.trim().to_string()),
		None => (spec.trim().to_string(), spec.trim().to_string()),
	}
}
