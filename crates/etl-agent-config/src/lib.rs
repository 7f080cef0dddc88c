// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the ETL agent.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file,
//!   secrets document, environment)
//! - Type-safe configuration with range validation
//! - Consistent key naming (`ETL_AGENT_<SECTION>_<FIELD>`), shared by the
//!   environment and the secrets document
//!
//! # Usage
//!
//! ```ignore
//! use etl_agent_config::load_config;
//!
//! let config = load_config(None)?;
//! println!("threshold {}", config.production.variance_threshold);
//! ```

pub mod error;
pub mod keys;
pub mod layer;
pub mod secrets;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::AgentConfigLayer;
pub use secrets::{EnvSecrets, JsonFileSecrets, SecretsProvider, SECRETS_FILE_ENV};
pub use sections::*;
pub use sources::{
	layer_from_provider, setting_key, ConfigSource, DefaultsSource, EnvSource, Precedence,
	SecretsSource, TomlSource,
};

use std::path::Path;

use tracing::{debug, info};

/// Fully resolved agent configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfig {
	pub source_warehouse: WarehouseConfig,
	pub destination_warehouse: WarehouseConfig,
	pub dev_warehouse: WarehouseConfig,
	pub object_store: ObjectStoreConfig,
	pub smtp: Option<SmtpConfig>,
	pub notify: NotifyConfig,
	pub production: ProductionConfig,
	pub simple: SimpleConfig,
	pub logging: LoggingConfig,
}

impl AgentConfig {
	/// Whether the setting named by an environment key has a non-blank value.
	///
	/// Unknown keys are never set.
	pub fn is_set(&self, key: &str) -> bool {
		fn filled(value: &str) -> bool {
			!value.trim().is_empty()
		}

		match key {
			keys::SOURCE_WAREHOUSE_HOST => filled(&self.source_warehouse.host),
			keys::SOURCE_WAREHOUSE_DATABASE => filled(&self.source_warehouse.database),
			keys::SOURCE_WAREHOUSE_USER => filled(&self.source_warehouse.user),
			keys::SOURCE_WAREHOUSE_PASSWORD => self.source_warehouse.has_password(),
			keys::DESTINATION_WAREHOUSE_HOST => filled(&self.destination_warehouse.host),
			keys::DESTINATION_WAREHOUSE_DATABASE => filled(&self.destination_warehouse.database),
			keys::DESTINATION_WAREHOUSE_USER => filled(&self.destination_warehouse.user),
			keys::DESTINATION_WAREHOUSE_PASSWORD => self.destination_warehouse.has_password(),
			keys::DEV_WAREHOUSE_HOST => filled(&self.dev_warehouse.host),
			keys::DEV_WAREHOUSE_DATABASE => filled(&self.dev_warehouse.database),
			keys::DEV_WAREHOUSE_USER => filled(&self.dev_warehouse.user),
			keys::DEV_WAREHOUSE_PASSWORD => self.dev_warehouse.has_password(),
			keys::OBJECT_STORE_BUCKET => filled(&self.object_store.bucket),
			keys::OBJECT_STORE_ROLE_ARN => filled(&self.object_store.role_arn),
			_ => false,
		}
	}

	/// Every key in `required` that has no value, in the given order.
	pub fn missing(&self, required: &[&str]) -> Vec<String> {
		required
			.iter()
			.filter(|key| !self.is_set(key))
			.map(|key| key.to_string())
			.collect()
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`ETL_AGENT_*`)
/// 2. Secrets document (`ETL_AGENT_SECRETS_FILE`)
/// 3. Config file (`config_path`, or `/etc/etl-agent/agent.toml`)
/// 4. Built-in defaults
pub fn load_config(config_path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
	let toml = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};

	let mut sources: Vec<Box<dyn ConfigSource>> =
		vec![Box::new(DefaultsSource), Box::new(toml), Box::new(EnvSource)];
	if let Some(secrets) = SecretsSource::from_env()? {
		sources.push(Box::new(secrets));
	}

	load_config_from(sources)
}

/// Merge the given sources in precedence order and finalize.
pub fn load_config_from(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<AgentConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = AgentConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: AgentConfigLayer) -> Result<AgentConfig, ConfigError> {
	let source_warehouse = layer.source_warehouse.unwrap_or_default().finalize();
	let destination_warehouse = layer.destination_warehouse.unwrap_or_default().finalize();
	let dev_warehouse = layer.dev_warehouse.unwrap_or_default().finalize();
	let object_store = layer.object_store.unwrap_or_default().finalize();
	let smtp = layer.smtp.and_then(|l| l.finalize());
	let notify = layer.notify.unwrap_or_default().finalize();
	let production = layer.production.unwrap_or_default().finalize()?;
	let simple = layer.simple.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		source_host = %source_warehouse.host,
		destination_host = %destination_warehouse.host,
		dev_host = %dev_warehouse.host,
		bucket = %object_store.bucket,
		smtp_configured = smtp.is_some(),
		notify_enabled = notify.enabled,
		recipients = notify.recipients.len(),
		variance_threshold = production.variance_threshold,
		restore_on_failure = production.restore_on_failure,
		"agent configuration loaded"
	);

	Ok(AgentConfig {
		source_warehouse,
		destination_warehouse,
		dev_warehouse,
		object_store,
		smtp,
		notify,
		production,
		simple,
		logging,
	})
}
