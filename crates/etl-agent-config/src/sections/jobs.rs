// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job sections: `production`, `simple` and `logging`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 5.0;

fn default_products() -> Vec<String> {
	["OPSUMIT", "UPTRAVI", "OPSYNVI"]
		.into_iter()
		.map(String::from)
		.collect()
}

fn default_dispositions() -> Vec<String> {
	["Approved", "Denied"].into_iter().map(String::from).collect()
}

/// Production workflow settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionConfig {
	pub schema: String,
	pub table: String,
	pub backup_table: String,
	pub staging_prefix: String,
	/// Percent, 0..=100.
	pub variance_threshold: f64,
	pub restore_on_failure: bool,
	pub products: Vec<String>,
	pub dispositions: Vec<String>,
	pub completed_after: NaiveDate,
}

impl Default for ProductionConfig {
	fn default() -> Self {
		Self {
			schema: "jcap".to_string(),
			table: "jcap_pa".to_string(),
			backup_table: "jcap_pa_bkp".to_string(),
			staging_prefix: "jcap_pa_dashboard".to_string(),
			variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
			restore_on_failure: true,
			products: default_products(),
			dispositions: default_dispositions(),
			completed_after: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProductionConfigLayer {
	#[serde(default)]
	pub schema: Option<String>,
	#[serde(default)]
	pub table: Option<String>,
	#[serde(default)]
	pub backup_table: Option<String>,
	#[serde(default)]
	pub staging_prefix: Option<String>,
	#[serde(default)]
	pub variance_threshold: Option<f64>,
	#[serde(default)]
	pub restore_on_failure: Option<bool>,
	#[serde(default)]
	pub products: Option<Vec<String>>,
	#[serde(default)]
	pub dispositions: Option<Vec<String>>,
	#[serde(default)]
	pub completed_after: Option<String>,
}

impl ProductionConfigLayer {
	pub fn merge(&mut self, other: ProductionConfigLayer) {
		if other.schema.is_some() {
			self.schema = other.schema;
		}
		if other.table.is_some() {
			self.table = other.table;
		}
		if other.backup_table.is_some() {
			self.backup_table = other.backup_table;
		}
		if other.staging_prefix.is_some() {
			self.staging_prefix = other.staging_prefix;
		}
		if other.variance_threshold.is_some() {
			self.variance_threshold = other.variance_threshold;
		}
		if other.restore_on_failure.is_some() {
			self.restore_on_failure = other.restore_on_failure;
		}
		if other.products.is_some() {
			self.products = other.products;
		}
		if other.dispositions.is_some() {
			self.dispositions = other.dispositions;
		}
		if other.completed_after.is_some() {
			self.completed_after = other.completed_after;
		}
	}

	/// Resolve and validate. Out-of-range thresholds and malformed dates are
	/// rejected here, before any job runs.
	pub fn finalize(self) -> Result<ProductionConfig, ConfigError> {
		let defaults = ProductionConfig::default();

		let variance_threshold = self.variance_threshold.unwrap_or(DEFAULT_VARIANCE_THRESHOLD);
		if !(0.0..=100.0).contains(&variance_threshold) {
			return Err(ConfigError::validation(format!(
				"production.variance_threshold must be between 0 and 100, got {variance_threshold}"
			)));
		}

		let completed_after = match self.completed_after {
			Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
				ConfigError::invalid_value(
					"production.completed_after",
					format!("'{raw}' is not a YYYY-MM-DD date: {e}"),
				)
			})?,
			None => defaults.completed_after,
		};

		let staging_prefix = self
			.staging_prefix
			.map(|p| p.trim_matches('/').to_string())
			.unwrap_or(defaults.staging_prefix);
		if staging_prefix.is_empty() {
			return Err(ConfigError::validation(
				"production.staging_prefix must not be empty",
			));
		}

		let products = self.products.unwrap_or(defaults.products);
		let dispositions = self.dispositions.unwrap_or(defaults.dispositions);
		if products.is_empty() || dispositions.is_empty() {
			return Err(ConfigError::validation(
				"production.products and production.dispositions must not be empty",
			));
		}

		Ok(ProductionConfig {
			schema: self.schema.unwrap_or(defaults.schema),
			table: self.table.unwrap_or(defaults.table),
			backup_table: self.backup_table.unwrap_or(defaults.backup_table),
			staging_prefix,
			variance_threshold,
			restore_on_failure: self.restore_on_failure.unwrap_or(defaults.restore_on_failure),
			products,
			dispositions,
			completed_after,
		})
	}
}

/// Development (simple) job settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleConfig {
	pub source_schema: String,
	pub source_table: String,
	pub destination_schema: String,
	pub destination_table: String,
	pub default_limit: u64,
}

impl Default for SimpleConfig {
	fn default() -> Self {
		Self {
			source_schema: "dna_actln_dwh".to_string(),
			source_table: "vw_patients_opsumit_cap".to_string(),
			destination_schema: "dna_actln_dwh".to_string(),
			destination_table: "ControlM_New_test".to_string(),
			default_limit: 10,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SimpleConfigLayer {
	#[serde(default)]
	pub source_schema: Option<String>,
	#[serde(default)]
	pub source_table: Option<String>,
	#[serde(default)]
	pub destination_schema: Option<String>,
	#[serde(default)]
	pub destination_table: Option<String>,
	#[serde(default)]
	pub default_limit: Option<u64>,
}

impl SimpleConfigLayer {
	pub fn merge(&mut self, other: SimpleConfigLayer) {
		if other.source_schema.is_some() {
			self.source_schema = other.source_schema;
		}
		if other.source_table.is_some() {
			self.source_table = other.source_table;
		}
		if other.destination_schema.is_some() {
			self.destination_schema = other.destination_schema;
		}
		if other.destination_table.is_some() {
			self.destination_table = other.destination_table;
		}
		if other.default_limit.is_some() {
			self.default_limit = other.default_limit;
		}
	}

	pub fn finalize(self) -> Result<SimpleConfig, ConfigError> {
		let defaults = SimpleConfig::default();
		let default_limit = self.default_limit.unwrap_or(defaults.default_limit);
		if default_limit == 0 {
			return Err(ConfigError::validation(
				"simple.default_limit must be a positive integer",
			));
		}
		Ok(SimpleConfig {
			source_schema: self.source_schema.unwrap_or(defaults.source_schema),
			source_table: self.source_table.unwrap_or(defaults.source_table),
			destination_schema: self.destination_schema.unwrap_or(defaults.destination_schema),
			destination_table: self.destination_table.unwrap_or(defaults.destination_table),
			default_limit,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	#[serde(default)]
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: LoggingConfigLayer) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| "info".to_string()),
		}
	}
}
