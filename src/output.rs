use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use anyhow::Result;

use crate::ops::Report;
use crate::types::{
	BulkResult, ConsistencyReport, QueryAllReport, QueryResult, TimingProfile, WildcardReport,
};

/// Print a report as pretty JSON (the full structured shape).
pub fn print_json(report: &Report) -> Result<()> {
	println!("{}", serde_json::to_string_pretty(report)?);
	Ok(())
}

/// Print a human-readable summary of a report.
pub fn print_report(report: &Report) {
	match report {
		Report::Query(result) => print_query(result),
		Report::Bulk(bulk) => print_bulk(bulk),
		Report::QueryAll(profile) => print_query_all(profile),
		Report::Consistency(consistency) => print_consistency(consistency),
		Report::Wildcard(wildcard) => print_wildcard(wildcard),
		Report::Timing(timing) => print_timing(timing),
	}
}

fn new_table(header: Vec<&str>) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(header);
	table
}

fn error_summary(result: &QueryResult) -> String {
	match &result.error {
		Some(error) => format!("{}: {}", error.kind, error.message),
		None => String::new(),
	}
}

fn print_query(result: &QueryResult) {
	println!("\n{} {} via {}", result.domain, result.record_type, result.nameserver);
	if let Some(reverse) = &result.reverse_domain {
		println!("Reverse name:  {}", reverse);
	}
	println!("Query time:    {:.4} s", result.query_time_seconds);

	if let Some(records) = &result.records {
		if records.is_empty() {
			println!("No records returned");
			return;
		}
		let mut table = new_table(vec!["#", "Record"]);
		for (i, record) in records.iter().enumerate() {
			table.add_row(vec![format!("{}", i + 1), record.clone()]);
		}
		println!("{table}");
	} else if let Some(error) = &result.error {
		println!("Error:         {} ({})", error.message, error.kind);
		println!("Hint:          {}", error.hint);
	}
}

fn print_bulk(bulk: &BulkResult) {
	println!("\nBulk lookup via {}", bulk.nameserver);
	println!(
		"Items: {}   ok: {}   failed: {}   total: {:.3} s   avg: {:.4} s",
		bulk.attempted,
		bulk.succeeded,
		bulk.failed,
		bulk.total_query_time_seconds,
		bulk.average_query_time_seconds,
	);

	let mut table = new_table(vec!["Item", "Type", "Status", "Records", "Time (s)", "Detail"]);
	for result in &bulk.results {
		let (status, detail) = if result.is_success() {
			let joined = result.records.as_deref().unwrap_or(&[]).join(", ");
			("ok".to_string(), joined)
		} else {
			("error".to_string(), error_summary(result))
		};
		table.add_row(vec![
			result.domain.clone(),
			result.record_type.as_str().to_string(),
			status,
			format!("{}", result.record_count.unwrap_or(0)),
			format!("{:.4}", result.query_time_seconds),
			detail,
		]);
	}
	println!("{table}");
}

fn print_query_all(profile: &QueryAllReport) {
	println!("\nRecord profile for {} via {}", profile.domain, profile.nameserver);
	println!(
		"Types with records: {}   total records: {}   total: {:.3} s",
		profile.record_types_found, profile.total_records, profile.total_query_time_seconds,
	);

	let mut table = new_table(vec!["Type", "Count", "Records / Error"]);
	for (kind, records) in &profile.records {
		table.add_row(vec![
			kind.as_str().to_string(),
			format!("{}", records.len()),
			records.join(", "),
		]);
	}
	for (kind, error) in &profile.errors {
		table.add_row(vec![
			kind.as_str().to_string(),
			"-".to_string(),
			format!("{}: {}", error.kind, error.message),
		]);
	}
	println!("{table}");
}

fn print_consistency(consistency: &ConsistencyReport) {
	println!(
		"\nPropagation check: {} {} across {} resolvers",
		consistency.domain, consistency.record_type, consistency.resolvers_queried,
	);
	let verdict = if consistency.is_consistent { "CONSISTENT" } else { "INCONSISTENT" };
	println!(
		"Verdict: {}   trust: {}   distinct answers: {}   ok: {}   failed: {}",
		verdict,
		consistency.trust_level,
		consistency.unique_response_count,
		consistency.successful_queries,
		consistency.failed_queries,
	);

	let mut table = new_table(vec!["Resolver", "Nameserver", "Time (s)", "Answer"]);
	for (name, observation) in &consistency.resolver_results {
		let answer = match (&observation.records, &observation.error) {
			(Some(records), _) => records.join(", "),
			(None, Some(error)) => format!("{}: {}", error.kind, error.message),
			(None, None) => String::new(),
		};
		table.add_row(vec![
			name.clone(),
			observation.nameserver.clone(),
			format!("{:.4}", observation.query_time_seconds),
			answer,
		]);
	}
	println!("{table}");
}

fn print_wildcard(wildcard: &WildcardReport) {
	println!("\nWildcard check for {} ({} probes)", wildcard.domain, wildcard.test_count);
	let verdict = if wildcard.has_wildcard { "WILDCARD DETECTED" } else { "no wildcard" };
	println!("Verdict: {}   risk: {}", verdict, wildcard.risk_level);
	if wildcard.has_wildcard {
		println!(
			"Targets: {}   single target: {}   CDN-related: {}",
			wildcard.wildcard_records.join(", "),
			wildcard.single_target,
			wildcard.cdn_related,
		);
	}

	let mut table = new_table(vec!["Probe", "Type", "Resolved", "Detail"]);
	for probe in &wildcard.probes {
		let (resolved, detail) = if probe.has_records() {
			("yes", probe.records.as_deref().unwrap_or(&[]).join(", "))
		} else {
			("no", error_summary(probe))
		};
		table.add_row(vec![
			probe.domain.clone(),
			probe.record_type.as_str().to_string(),
			resolved.to_string(),
			detail,
		]);
	}
	println!("{table}");
}

fn print_timing(timing: &TimingProfile) {
	println!(
		"\nResponse analysis: {} {} via {} ({} iterations)",
		timing.domain, timing.record_type, timing.nameserver, timing.iterations,
	);
	println!(
		"Rating: {}   ok: {}   failed: {}   failure rate: {:.1}%",
		timing.performance_rating.as_str(),
		timing.successful_queries,
		timing.failed_queries,
		timing.failure_rate * 100.0,
	);

	if let Some(stats) = &timing.stats {
		let mut table = new_table(vec!["Min", "Median", "Mean", "Max", "Stddev"]);
		table.add_row(vec![
			format!("{:.4} s", stats.min_time),
			format!("{:.4} s", stats.median_time),
			format!("{:.4} s", stats.avg_time),
			format!("{:.4} s", stats.max_time),
			stats.std_dev.map(|sd| format!("{:.4} s", sd)).unwrap_or_else(|| "-".to_string()),
		]);
		println!("{table}");
	}

	if timing.high_variance {
		println!("High response-time variance: unstable resolver performance");
	}
	if !timing.anomalous_times.is_empty() {
		println!(
			"Anomalous samples above {:.4} s: {:?}",
			timing.anomaly_threshold.unwrap_or(0.0),
			timing.anomalous_times,
		);
	}
}

/// Write per-item bulk results to a CSV file.
pub fn write_csv(path: &str, bulk: &BulkResult) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record([
		"item", "record_type", "status", "record_count",
		"query_time_seconds", "records", "error_kind", "error_message",
	])?;

	for result in &bulk.results {
		let status = if result.is_success() { "ok" } else { "error" };
		let count = result.record_count.unwrap_or(0).to_string();
		let time = format!("{:.4}", result.query_time_seconds);
		let records = result.records.as_ref().map(|v| v.join(";")).unwrap_or_default();
		let error_kind = result.error.as_ref().map(|e| e.kind.as_str()).unwrap_or("");
		let error_message = result.error.as_ref().map(|e| e.message.as_str()).unwrap_or("");
		writer.write_record([
			result.domain.as_str(),
			result.record_type.as_str(),
			status,
			count.as_str(),
			time.as_str(),
			records.as_str(),
			error_kind,
			error_message,
		])?;
	}

	writer.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{ErrorDescriptor, ErrorKind, RecordKind};

	#[test]
	fn test_csv_export_round_trip() {
		let bulk = BulkResult {
			nameserver: "public".to_string(),
			record_type: Some(RecordKind::A),
			attempted: 2,
			succeeded: 1,
			failed: 1,
			total_query_time_seconds: 0.1,
			average_query_time_seconds: 0.05,
			results: vec![
				QueryResult::success("good.com", RecordKind::A, "public", 0.04,
					vec!["192.0.2.1".to_string(), "192.0.2.2".to_string()]),
				QueryResult::failure("bad..name", RecordKind::A, "public", 0.0,
					ErrorDescriptor::new(ErrorKind::InvalidInput, "empty label")),
			],
		};

		let dir = std::env::temp_dir();
		let path = dir.join("dns_recon_bulk_test.csv");
		let path_str = path.to_str().unwrap();
		write_csv(path_str, &bulk).unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		std::fs::remove_file(&path).ok();
		let lines: Vec<&str> = content.lines().collect();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("item,record_type,status"));
		assert!(lines[1].contains("good.com"));
		assert!(lines[1].contains("192.0.2.1;192.0.2.2"));
		assert!(lines[2].contains("invalid_input"));
	}
}
