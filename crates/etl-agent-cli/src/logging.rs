// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use clap::ValueEnum;
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level used until the configuration says otherwise.
pub const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	#[default]
	Text,
	Json,
}

/// `RUST_LOG` wins, then the `--log-level` flag, then the configured level.
pub fn filter_directive(env: Option<String>, flag: Option<&str>, configured: &str) -> String {
	env.filter(|v| !v.trim().is_empty())
		.or_else(|| flag.map(str::to_string))
		.unwrap_or_else(|| configured.to_string())
}

fn env_filter(directive: &str) -> EnvFilter {
	EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

fn subscriber(directive: &str, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
	let filter = env_filter(directive);
	match format {
		LogFormat::Json => Box::new(tracing_subscriber::registry().with(filter).with(fmt::layer().json())),
		LogFormat::Text => Box::new(tracing_subscriber::registry().with(filter).with(fmt::layer())),
	}
}

/// Run `f` under a temporary subscriber. Configuration loading logs before the
/// configured level is known, so it runs under this one.
pub fn with_bootstrap_tracing<T>(directive: &str, format: LogFormat, f: impl FnOnce() -> T) -> T {
	tracing::subscriber::with_default(subscriber(directive, format), f)
}

pub fn init_tracing(directive: &str, format: LogFormat) {
	let filter = env_filter(directive);

	match format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json())
				.init();
		}
		LogFormat::Text => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer())
				.init();
		}
	}
}
