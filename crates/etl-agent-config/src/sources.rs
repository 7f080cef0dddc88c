// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML file, secrets document, environment.

use std::path::PathBuf;
use std::str::FromStr;

use etl_common_config::SecretString;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::AgentConfigLayer;
use crate::secrets::{EnvSecrets, JsonFileSecrets, SecretsProvider, SECRETS_FILE_ENV};
use crate::sections::{
	LoggingConfigLayer, NotifyConfigLayer, ObjectStoreConfigLayer, ProductionConfigLayer,
	SimpleConfigLayer, SmtpConfigLayer, WarehouseConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Secrets = 30,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<AgentConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(AgentConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/etl-agent/agent.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(AgentConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: AgentConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Settings from a [`SecretsProvider`], keyed like the environment.
pub struct SecretsSource {
	provider: Box<dyn SecretsProvider>,
}

impl SecretsSource {
	pub fn new(provider: impl SecretsProvider + 'static) -> Self {
		Self {
			provider: Box::new(provider),
		}
	}

	/// The document named by `ETL_AGENT_SECRETS_FILE`, if set.
	pub fn from_env() -> Result<Option<Self>, ConfigError> {
		match env_var(SECRETS_FILE_ENV) {
			Some(path) => Ok(Some(Self::new(JsonFileSecrets::load(path)?))),
			None => Ok(None),
		}
	}
}

impl ConfigSource for SecretsSource {
	fn name(&self) -> &'static str {
		self.provider.name()
	}

	fn precedence(&self) -> Precedence {
		Precedence::Secrets
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!(provider = self.provider.name(), "loading secrets");
		layer_from_provider(self.provider.as_ref())
	}
}

/// Environment variable source.
///
/// Convention: ETL_AGENT_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<AgentConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_provider(&EnvSecrets)
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// `ETL_AGENT_<SECTION>_<FIELD>`.
pub fn setting_key(section: &str, field: &str) -> String {
	format!(
		"ETL_AGENT_{}_{}",
		section.to_ascii_uppercase(),
		field.to_ascii_uppercase()
	)
}

struct Settings<'a> {
	provider: &'a dyn SecretsProvider,
	section: &'static str,
}

impl Settings<'_> {
	fn key(&self, field: &str) -> String {
		setting_key(self.section, field)
	}

	fn secret(&self, field: &str) -> Result<Option<SecretString>, ConfigError> {
		Ok(self.provider.get(&self.key(field))?.filter(|s| !s.is_blank()))
	}

	fn string(&self, field: &str) -> Result<Option<String>, ConfigError> {
		Ok(self
			.provider
			.get(&self.key(field))?
			.map(|s| s.expose().trim().to_string())
			.filter(|s| !s.is_empty()))
	}

	fn parse<T: FromStr>(&self, field: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.string(field)? {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: self.key(field),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn bool(&self, field: &str) -> Result<Option<bool>, ConfigError> {
		match self.string(field)? {
			Some(v) => match v.to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" => Ok(Some(true)),
				"false" | "0" | "no" => Ok(Some(false)),
				_ => Err(ConfigError::InvalidValue {
					key: self.key(field),
					message: format!("invalid boolean value '{v}'"),
				}),
			},
			None => Ok(None),
		}
	}

	fn list(&self, field: &str) -> Result<Option<Vec<String>>, ConfigError> {
		Ok(self.string(field)?.map(|v| {
			v.split(',')
				.map(|item| item.trim().to_string())
				.filter(|item| !item.is_empty())
				.collect()
		}))
	}
}

fn load_warehouse(
	provider: &dyn SecretsProvider,
	section: &'static str,
) -> Result<WarehouseConfigLayer, ConfigError> {
	let s = Settings { provider, section };
	Ok(WarehouseConfigLayer {
		host: s.string("host")?,
		port: s.parse("port", "u16")?,
		database: s.string("database")?,
		user: s.string("user")?,
		password: s.secret("password")?,
		connect_timeout_secs: s.parse("connect_timeout_secs", "u64")?,
		max_connections: s.parse("max_connections", "u32")?,
	})
}

fn load_object_store(provider: &dyn SecretsProvider) -> Result<ObjectStoreConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "object_store",
	};
	Ok(ObjectStoreConfigLayer {
		bucket: s.string("bucket")?,
		region: s.string("region")?,
		role_arn: s.string("role_arn")?,
		endpoint: s.string("endpoint")?,
		allow_http: s.bool("allow_http")?,
		access_key_id: s.string("access_key_id")?,
		secret_access_key: s.secret("secret_access_key")?,
	})
}

fn load_smtp(provider: &dyn SecretsProvider) -> Result<SmtpConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "smtp",
	};
	Ok(SmtpConfigLayer {
		host: s.string("host")?,
		port: s.parse("port", "u16")?,
		username: s.string("username")?,
		password: s.secret("password")?,
		from_address: s.string("from_address")?,
		from_name: s.string("from_name")?,
		use_tls: s.bool("use_tls")?,
	})
}

fn load_notify(provider: &dyn SecretsProvider) -> Result<NotifyConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "notify",
	};
	Ok(NotifyConfigLayer {
		enabled: s.bool("enabled")?,
		recipients: s.list("recipients")?,
	})
}

fn load_production(provider: &dyn SecretsProvider) -> Result<ProductionConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "production",
	};
	Ok(ProductionConfigLayer {
		schema: s.string("schema")?,
		table: s.string("table")?,
		backup_table: s.string("backup_table")?,
		staging_prefix: s.string("staging_prefix")?,
		variance_threshold: s.parse("variance_threshold", "f64")?,
		restore_on_failure: s.bool("restore_on_failure")?,
		products: s.list("products")?,
		dispositions: s.list("dispositions")?,
		completed_after: s.string("completed_after")?,
	})
}

fn load_simple(provider: &dyn SecretsProvider) -> Result<SimpleConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "simple",
	};
	Ok(SimpleConfigLayer {
		source_schema: s.string("source_schema")?,
		source_table: s.string("source_table")?,
		destination_schema: s.string("destination_schema")?,
		destination_table: s.string("destination_table")?,
		default_limit: s.parse("default_limit", "u64")?,
	})
}

fn load_logging(provider: &dyn SecretsProvider) -> Result<LoggingConfigLayer, ConfigError> {
	let s = Settings {
		provider,
		section: "logging",
	};
	Ok(LoggingConfigLayer {
		level: s.string("level")?,
	})
}

/// Build a layer from any key/value provider using the environment key names.
pub fn layer_from_provider(provider: &dyn SecretsProvider) -> Result<AgentConfigLayer, ConfigError> {
	Ok(AgentConfigLayer {
		source_warehouse: Some(load_warehouse(provider, "source_warehouse")?),
		destination_warehouse: Some(load_warehouse(provider, "destination_warehouse")?),
		dev_warehouse: Some(load_warehouse(provider, "dev_warehouse")?),
		object_store: Some(load_object_store(provider)?),
		smtp: Some(load_smtp(provider)?),
		notify: Some(load_notify(provider)?),
		production: Some(load_production(provider)?),
		simple: Some(load_simple(provider)?),
		logging: Some(load_logging(provider)?),
	})
}
