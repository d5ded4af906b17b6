use std::net::SocketAddr;

/// Resolver type identifiers accepted by the registry.
#[allow(dead_code)]
pub const RESOLVER_TYPES: [&str; 7] = [
	"system", "public", "google", "cloudflare", "quad9", "opendns", "custom",
];

/// A caller mistake in resolver selection; fails the whole operation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("unknown resolver type '{0}' (expected one of: system, public, google, cloudflare, quad9, opendns, custom)")]
	UnknownResolverType(String),
	#[error("resolver type 'custom' requires a nameserver address")]
	MissingCustomNameserver,
	#[error("invalid nameserver address '{addr}': {reason}")]
	InvalidNameserver { addr: String, reason: String },
}

/// A named, ordered set of nameserver addresses to query against.
///
/// Immutable once constructed; built-ins always carry at least one address.
#[derive(Debug, Clone)]
pub struct ResolverProfile {
	id: String,
	nameservers: Vec<SocketAddr>,
}

impl ResolverProfile {
	pub fn new(id: impl Into<String>, nameservers: Vec<SocketAddr>) -> Self {
		ResolverProfile { id: id.into(), nameservers }
	}

	/// Single-nameserver profile with a "custom-<ip>" identifier.
	pub fn custom(addr: SocketAddr) -> Self {
		ResolverProfile {
			id: format!("custom-{}", addr.ip()),
			nameservers: vec![addr],
		}
	}

	/// Single-nameserver profile under a caller-chosen name (propagation checks).
	pub fn named(name: impl Into<String>, addr: SocketAddr) -> Self {
		ResolverProfile {
			id: name.into(),
			nameservers: vec![addr],
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn nameservers(&self) -> &[SocketAddr] {
		&self.nameservers
	}
}

/// Look up the nameserver list for a resolver type identifier.
///
/// A supplied custom nameserver always wins over the type. `custom` without
/// an address and unknown identifiers are configuration errors; nothing in
/// here touches the network.
pub fn resolve_profile(
	resolver_type: &str,
	custom_nameserver: Option<&str>,
) -> Result<ResolverProfile, ConfigError> {
	if let Some(addr) = custom_nameserver {
		return Ok(ResolverProfile::custom(parse_nameserver(addr)?));
	}

	let nameservers = match resolver_type {
		"public" => known_nameservers(&["8.8.8.8", "1.1.1.1", "9.9.9.9"]),
		"google" => known_nameservers(&["8.8.8.8", "8.8.4.4"]),
		"cloudflare" => known_nameservers(&["1.1.1.1", "1.0.0.1"]),
		"quad9" => known_nameservers(&["9.9.9.9", "149.112.112.112"]),
		"opendns" => known_nameservers(&["208.67.222.222", "208.67.220.220"]),
		"system" => {
			let mut ns = system_nameservers();
			if ns.is_empty() {
				// No readable resolv.conf; fall back to the public set
				ns = known_nameservers(&["8.8.8.8", "1.1.1.1", "9.9.9.9"]);
			}
			ns
		}
		"custom" => return Err(ConfigError::MissingCustomNameserver),
		other => return Err(ConfigError::UnknownResolverType(other.to_string())),
	};

	Ok(ResolverProfile::new(resolver_type, nameservers))
}

/// Default resolver set for propagation checks: one address per operator.
pub fn default_propagation_resolvers() -> Vec<(String, SocketAddr)> {
	[
		("google", "8.8.8.8"),
		("cloudflare", "1.1.1.1"),
		("quad9", "9.9.9.9"),
		("opendns", "208.67.222.222"),
		("level3", "4.2.2.1"),
		("verisign", "64.6.64.6"),
	]
	.iter()
	.map(|(name, ip)| {
		let addr: SocketAddr = format!("{}:53", ip).parse().unwrap();
		(name.to_string(), addr)
	})
	.collect()
}

fn known_nameservers(ips: &[&str]) -> Vec<SocketAddr> {
	ips.iter()
		.map(|ip| format!("{}:53", ip).parse().unwrap())
		.collect()
}

/// Parse a nameserver address string into a SocketAddr.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_nameserver(input: &str) -> Result<SocketAddr, ConfigError> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(ConfigError::InvalidNameserver {
			addr: input.to_string(),
			reason: "empty address".to_string(),
		});
	}

	let invalid = |reason: String| ConfigError::InvalidNameserver {
		addr: trimmed.to_string(),
		reason,
	};

	if trimmed.starts_with('[') {
		// Bracketed IPv6 with port: [::1]:53
		trimmed.parse().map_err(|e| invalid(format!("{}", e)))
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		// Bare IPv6 address without port
		let ip = trimmed.parse::<std::net::IpAddr>()
			.map_err(|e| invalid(format!("{}", e)))?;
		Ok(SocketAddr::new(ip, 53))
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port (e.g. "8.8.8.8:5353")
		Ok(addr)
	} else {
		// Plain IPv4 without port
		let ip = trimmed.parse::<std::net::IpAddr>()
			.map_err(|e| invalid(format!("{}", e)))?;
		Ok(SocketAddr::new(ip, 53))
	}
}

/// Read system nameservers from /etc/resolv.conf (Unix only).
///
/// Returns an empty vec on non-Unix platforms or if the file cannot be read.
pub fn system_nameservers() -> Vec<SocketAddr> {
	let content = match std::fs::read_to_string("/etc/resolv.conf") {
		Ok(c) => c,
		Err(_) => return Vec::new(),
	};
	let mut nameservers = Vec::new();
	for line in content.lines() {
		let trimmed = line.trim();
		if !trimmed.starts_with("nameserver") {
			continue;
		}
		// Extract the address after "nameserver"
		let parts: Vec<&str> = trimmed.split_whitespace().collect();
		if parts.len() >= 2 {
			if let Ok(addr) = parse_nameserver(parts[1]) {
				nameservers.push(addr);
			}
		}
	}
	nameservers
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builtin_profiles_non_empty() {
		for resolver_type in RESOLVER_TYPES.iter().filter(|t| **t != "custom") {
			let profile = resolve_profile(resolver_type, None).unwrap();
			assert!(!profile.nameservers().is_empty(), "{} has no nameservers", resolver_type);
			assert_eq!(profile.id(), *resolver_type);
		}
	}

	#[test]
	fn test_public_profile_order() {
		let profile = resolve_profile("public", None).unwrap();
		let ips: Vec<String> = profile.nameservers().iter()
			.map(|a| a.ip().to_string())
			.collect();
		assert_eq!(ips, vec!["8.8.8.8", "1.1.1.1", "9.9.9.9"]);
	}

	#[test]
	fn test_custom_without_address_fails() {
		assert!(matches!(
			resolve_profile("custom", None),
			Err(ConfigError::MissingCustomNameserver)
		));
	}

	#[test]
	fn test_unknown_type_fails() {
		assert!(matches!(
			resolve_profile("dnssec-validating", None),
			Err(ConfigError::UnknownResolverType(_))
		));
	}

	#[test]
	fn test_custom_nameserver_overrides_type() {
		let profile = resolve_profile("google", Some("203.0.113.53")).unwrap();
		assert_eq!(profile.id(), "custom-203.0.113.53");
		assert_eq!(profile.nameservers().len(), 1);
		assert_eq!(profile.nameservers()[0].port(), 53);
	}

	#[test]
	fn test_ipv4_no_port() {
		let addr = parse_nameserver("1.1.1.1").unwrap();
		assert_eq!(addr.port(), 53);
		assert_eq!(addr.ip().to_string(), "1.1.1.1");
	}

	#[test]
	fn test_ipv4_with_port() {
		let addr = parse_nameserver("8.8.8.8:5353").unwrap();
		assert_eq!(addr.port(), 5353);
	}

	#[test]
	fn test_ipv6_bare() {
		let addr = parse_nameserver("2606:4700::1111").unwrap();
		assert_eq!(addr.port(), 53);
	}

	#[test]
	fn test_ipv6_bracketed() {
		let addr = parse_nameserver("[2606:4700::1111]:53").unwrap();
		assert_eq!(addr.port(), 53);
	}

	#[test]
	fn test_invalid_nameserver() {
		assert!(parse_nameserver("not-an-ip").is_err());
		assert!(parse_nameserver("").is_err());
	}

	#[test]
	fn test_propagation_defaults() {
		let resolvers = default_propagation_resolvers();
		assert_eq!(resolvers.len(), 6);
		let names: Vec<&str> = resolvers.iter().map(|(n, _)| n.as_str()).collect();
		assert!(names.contains(&"google"));
		assert!(names.contains(&"verisign"));
	}
}
