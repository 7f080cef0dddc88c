// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ETL agent: run one job, or the same job repeatedly until shut down.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use etl_agent_config::load_config;
use etl_agent_jobs::{CancellationToken, JobDispatcher, Supervisor};
use tracing::{error, info, warn};

mod job_source;
mod logging;
mod version;
mod wiring;

use job_source::{load_job, JobOverrides, JobSourceError};
use logging::{filter_directive, init_tracing, with_bootstrap_tracing, LogFormat, DEFAULT_LEVEL};

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

/// ETL agent - runs extract/transform/load jobs against the warehouses.
#[derive(Parser, Debug)]
#[command(name = "etl-agent", about = "Runs ETL jobs once or continuously", version)]
struct Args {
	/// Job id (used when no job configuration is given)
	#[arg(long, env = "ETL_AGENT_JOB_ID")]
	job_id: Option<String>,

	/// Inline job configuration as JSON
	#[arg(long)]
	job_config: Option<String>,

	/// Path to a JSON job configuration file
	#[arg(long)]
	job_config_file: Option<PathBuf>,

	/// Job display name
	#[arg(long)]
	job_name: Option<String>,

	/// Job type (simple_etl or production_etl)
	#[arg(long)]
	job_type: Option<String>,

	/// Load date, YYYY-MM-DD (defaults to today)
	#[arg(long)]
	load_date: Option<String>,

	/// Row limit for the simple job
	#[arg(long)]
	limit: Option<u64>,

	/// Keep running the job until interrupted
	#[arg(long)]
	continuous: bool,

	/// Seconds between runs in continuous mode
	#[arg(long, default_value_t = 60)]
	interval: u64,

	/// Minimum success rate (percent) for a zero exit in continuous mode
	#[arg(long, default_value_t = 50.0)]
	min_success_rate: f64,

	/// Path to the agent configuration file
	#[arg(long, env = "ETL_AGENT_CONFIG")]
	config: Option<PathBuf>,

	/// Log level or filter directive (overrides config)
	#[arg(long)]
	log_level: Option<String>,

	/// Log output format
	#[arg(long, value_enum, default_value_t = LogFormat::Text)]
	log_format: LogFormat,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

impl Args {
	fn overrides(&self) -> JobOverrides {
		JobOverrides {
			name: self.job_name.clone(),
			job_type: self.job_type.clone(),
			load_date: self.load_date.clone(),
			limit: self.limit,
		}
	}
}

fn main() -> ExitCode {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return ExitCode::SUCCESS;
	}

	let runtime = match tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
	{
		Ok(runtime) => runtime,
		Err(e) => {
			eprintln!("etl-agent: failed to start runtime: {e}");
			return ExitCode::from(EXIT_FAILURE);
		}
	};

	match runtime.block_on(run(args)) {
		Ok(code) => code,
		Err(e) => {
			error!(error = %format!("{e:#}"), "etl-agent failed");
			eprintln!("etl-agent: {e:#}");
			ExitCode::from(EXIT_FAILURE)
		}
	}
}

async fn run(args: Args) -> Result<ExitCode> {
	dotenvy::dotenv().ok();

	let rust_log = std::env::var("RUST_LOG").ok();
	let bootstrap = filter_directive(rust_log.clone(), args.log_level.as_deref(), DEFAULT_LEVEL);
	let config = with_bootstrap_tracing(&bootstrap, args.log_format, || {
		load_config(args.config.as_deref())
	})
	.context("failed to load configuration")?;

	let directive = filter_directive(rust_log, args.log_level.as_deref(), &config.logging.level);
	init_tracing(&directive, args.log_format);

	let loaded = match load_job(
		args.job_config.as_deref(),
		args.job_config_file.as_deref(),
		args.job_id.as_deref(),
		&args.overrides(),
	) {
		Ok(loaded) => loaded,
		Err(e) => {
			error!(error = %e, "cannot build job configuration");
			eprintln!("etl-agent: {e}");
			let code = match e {
				JobSourceError::Read { .. } => EXIT_FAILURE,
				JobSourceError::Missing | JobSourceError::Invalid(_) => EXIT_USAGE,
			};
			return Ok(ExitCode::from(code));
		}
	};
	info!(
		job = %loaded.redacted,
		continuous = args.continuous,
		interval_secs = args.interval,
		version = version::VERSION,
		"starting etl-agent"
	);

	let collaborators = wiring::collaborators(&config)?;
	let dispatcher = JobDispatcher::new(config, collaborators);

	let token = CancellationToken::new();
	let signal_token = token.clone();
	tokio::spawn(async move {
		wait_for_shutdown().await;
		warn!("shutdown requested, finishing the current run");
		signal_token.cancel();
	});

	if args.continuous {
		let mut supervisor = Supervisor::new(dispatcher, Duration::from_secs(args.interval), token);
		let summary = supervisor.run(&loaded.job).await;
		let code = if summary.meets(args.min_success_rate) {
			ExitCode::SUCCESS
		} else {
			warn!(
				success_rate = summary.success_rate,
				min_success_rate = args.min_success_rate,
				"success rate below minimum"
			);
			ExitCode::from(EXIT_FAILURE)
		};
		return Ok(code);
	}

	let result = dispatcher.dispatch(&loaded.job).await;
	println!(
		"{}",
		serde_json::to_string(&result).context("failed to serialize job result")?
	);

	Ok(if token.is_cancelled() {
		ExitCode::from(EXIT_INTERRUPTED)
	} else if result.is_success() {
		ExitCode::SUCCESS
	} else {
		ExitCode::from(EXIT_FAILURE)
	})
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
	#[cfg(unix)]
	{
		use tokio::signal::unix::{signal, SignalKind};

		match signal(SignalKind::terminate()) {
			Ok(mut terminate) => {
				tokio::select! {
					_ = tokio::signal::ctrl_c() => {}
					_ = terminate.recv() => {}
				}
			}
			Err(e) => {
				warn!(error = %e, "cannot listen for SIGTERM, only Ctrl-C stops the agent");
				let _ = tokio::signal::ctrl_c().await;
			}
		}
	}

	#[cfg(not(unix))]
	{
		let _ = tokio::signal::ctrl_c().await;
	}
}
