// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key/value secret providers consulted once at configuration load time.
//!
//! Every provider answers the same key names as the environment
//! (`ETL_AGENT_SOURCE_WAREHOUSE_PASSWORD`, ...), so a secrets document can
//! carry any setting and the environment can still override it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use etl_common_config::{load_secret_env, SecretString};
use tracing::debug;

use crate::error::ConfigError;

/// Environment variable naming the JSON secrets document.
pub const SECRETS_FILE_ENV: &str = "ETL_AGENT_SECRETS_FILE";

/// `get(key) -> value | absent`.
pub trait SecretsProvider: Send + Sync {
	fn name(&self) -> &'static str;

	fn get(&self, key: &str) -> Result<Option<SecretString>, ConfigError>;
}

/// Reads `KEY`, or the file named by `KEY_FILE`.
pub struct EnvSecrets;

impl SecretsProvider for EnvSecrets {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn get(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
		load_secret_env(key).map_err(|e| ConfigError::Secret(e.to_string()))
	}
}

/// A flat JSON object of settings, e.g. a document exported from a secrets manager.
///
/// Strings are taken as-is, numbers and booleans are stringified, arrays of
/// strings are joined with commas and nulls are ignored.
#[derive(Debug)]
pub struct JsonFileSecrets {
	path: PathBuf,
	values: HashMap<String, SecretString>,
}

impl JsonFileSecrets {
	pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let path = path.into();
		let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
			path: path.clone(),
			source,
		})?;
		Self::from_json(path, &content)
	}

	pub fn from_json(path: impl Into<PathBuf>, content: &str) -> Result<Self, ConfigError> {
		let path = path.into();
		let invalid = |message: String| ConfigError::SecretsParse {
			path: path.clone(),
			message,
		};

		let document: serde_json::Value =
			serde_json::from_str(content).map_err(|e| invalid(e.to_string()))?;
		let object = document
			.as_object()
			.ok_or_else(|| invalid("top-level value must be an object".to_string()))?;

		let mut values = HashMap::with_capacity(object.len());
		for (key, value) in object {
			let text = match value {
				serde_json::Value::Null => continue,
				serde_json::Value::String(s) => s.clone(),
				serde_json::Value::Bool(b) => b.to_string(),
				serde_json::Value::Number(n) => n.to_string(),
				serde_json::Value::Array(items) => items
					.iter()
					.map(|item| match item {
						serde_json::Value::String(s) => Ok(s.clone()),
						other => Err(invalid(format!("{key}: array items must be strings, got {other}"))),
					})
					.collect::<Result<Vec<_>, _>>()?
					.join(","),
				serde_json::Value::Object(_) => {
					return Err(invalid(format!("{key}: nested objects are not supported")));
				}
			};
			values.insert(key.clone(), SecretString::new(text));
		}

		debug!(path = %path.display(), keys = values.len(), "loaded secrets document");
		Ok(Self { path, values })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl SecretsProvider for JsonFileSecrets {
	fn name(&self) -> &'static str {
		"secrets-document"
	}

	fn get(&self, key: &str) -> Result<Option<SecretString>, ConfigError> {
		Ok(self.values.get(key).cloned())
	}
}
