// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warehouse connection sections (`source_warehouse`, `destination_warehouse`,
//! `dev_warehouse`).

use etl_common_config::SecretString;
use serde::Deserialize;

pub const DEFAULT_WAREHOUSE_PORT: u16 = 5439;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// Warehouse connection (runtime, fully resolved).
///
/// Credentials may be blank here; the dispatcher reports blank required
/// fields per job type instead of failing the whole load.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseConfig {
	pub host: String,
	pub port: u16,
	pub database: String,
	pub user: String,
	pub password: Option<SecretString>,
	pub connect_timeout_secs: u64,
	pub max_connections: u32,
}

impl Default for WarehouseConfig {
	fn default() -> Self {
		WarehouseConfigLayer::default().finalize()
	}
}

impl WarehouseConfig {
	pub fn has_password(&self) -> bool {
		self.password.as_ref().is_some_and(|p| !p.is_blank())
	}
}

/// Warehouse configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct WarehouseConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub database: Option<String>,
	#[serde(default)]
	pub user: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub connect_timeout_secs: Option<u64>,
	#[serde(default)]
	pub max_connections: Option<u32>,
}

impl WarehouseConfigLayer {
	pub fn merge(&mut self, other: WarehouseConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.database.is_some() {
			self.database = other.database;
		}
		if other.user.is_some() {
			self.user = other.user;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.connect_timeout_secs.is_some() {
			self.connect_timeout_secs = other.connect_timeout_secs;
		}
		if other.max_connections.is_some() {
			self.max_connections = other.max_connections;
		}
	}

	pub fn finalize(self) -> WarehouseConfig {
		WarehouseConfig {
			host: self.host.unwrap_or_default(),
			port: self.port.unwrap_or(DEFAULT_WAREHOUSE_PORT),
			database: self.database.unwrap_or_default(),
			user: self.user.unwrap_or_default(),
			password: self.password,
			connect_timeout_secs: self
				.connect_timeout_secs
				.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
			max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = WarehouseConfigLayer::default().finalize();
		assert_eq!(config.port, 5439);
		assert_eq!(config.connect_timeout_secs, 30);
		assert!(config.host.is_empty());
		assert!(!config.has_password());
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base = WarehouseConfigLayer {
			host: Some("redshift.internal".to_string()),
			port: Some(5439),
			..Default::default()
		};
		base.merge(WarehouseConfigLayer {
			port: Some(5440),
			password: Some(SecretString::new("pw".to_string())),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.host, "redshift.internal");
		assert_eq!(config.port, 5440);
		assert!(config.has_password());
	}

	#[test]
	fn test_deserialize_partial() {
		let layer: WarehouseConfigLayer = toml::from_str(
			r#"
host = "cdp.example.com"
database = "cdp"
password = "from-file"
"#,
		)
		.unwrap();
		assert_eq!(layer.host.as_deref(), Some("cdp.example.com"));
		assert!(layer.user.is_none());
		assert_eq!(layer.password.unwrap().expose(), "from-file");
	}
}
