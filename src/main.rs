mod analysis;
mod bulk;
mod cli;
mod config;
mod engine;
mod limiter;
mod ops;
mod output;
mod resolver;
mod stats;
mod types;

use std::sync::Arc;

use clap::Parser;

use crate::cli::Cli;
use crate::config::Config;
use crate::engine::QueryEngine;
use crate::limiter::RateLimiterSet;
use crate::types::{ErrorDescriptor, ErrorKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

	let cli = Cli::parse();

	let mut config = Config::default();
	if cli.rate_limit > 0.0 {
		config.rate_limit = cli.rate_limit;
	}

	// One limiter set for the whole process; every query path shares it
	let limiter = Arc::new(RateLimiterSet::new(config.rate_limit, config.rate_limit));
	let engine = Arc::new(QueryEngine::new(config, limiter));

	let csv_path = cli.command.csv_output().map(String::from);
	let operation = cli.command.into_operation();
	log::debug!("dispatching operation '{}'", operation.name());

	let report = match ops::dispatch(&engine, operation).await {
		Ok(report) => report,
		Err(e) => {
			// Configuration mistakes fail the whole operation, kind and hint included
			let descriptor = ErrorDescriptor::new(ErrorKind::InvalidConfiguration, e.to_string());
			if cli.json {
				println!("{}", serde_json::to_string_pretty(&descriptor)?);
			} else {
				eprintln!("Configuration error: {}", descriptor.message);
				eprintln!("Hint: {}", descriptor.hint);
			}
			std::process::exit(2);
		}
	};

	if cli.json {
		output::print_json(&report)?;
	} else {
		output::print_report(&report);
	}

	if let Some(path) = csv_path {
		if let ops::Report::Bulk(bulk) = &report {
			output::write_csv(&path, bulk)?;
			println!("Wrote per-item results to {}", path);
		}
	}

	Ok(())
}
