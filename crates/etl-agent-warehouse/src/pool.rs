// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use etl_agent_config::WarehouseConfig;
use etl_agent_core::{EtlError, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

/// Build connection options for a warehouse section.
///
/// Warehouse clusters require TLS, so `sslmode=prefer` is used; the server
/// decides.
pub fn connect_options(config: &WarehouseConfig) -> PgConnectOptions {
	let mut options = PgConnectOptions::new()
		.host(&config.host)
		.port(config.port)
		.database(&config.database)
		.username(&config.user)
		.ssl_mode(PgSslMode::Prefer)
		.application_name("etl-agent");
	if let Some(password) = &config.password {
		options = options.password(password.expose());
	}
	options
}

/// Create a lazily-connected pool. No connection is attempted until the
/// first query, so a job type that never touches this warehouse never
/// connects to it.
#[tracing::instrument(skip(config), fields(host = %config.host, database = %config.database))]
pub fn create_lazy_pool(config: &WarehouseConfig) -> Result<PgPool> {
	if config.max_connections == 0 {
		return Err(EtlError::InvalidConfiguration(
			"warehouse max_connections must be positive".to_string(),
		));
	}

	let pool = PgPoolOptions::new()
		.max_connections(config.max_connections)
		.acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
		.connect_lazy_with(connect_options(config));

	tracing::debug!("warehouse pool created");
	Ok(pool)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> WarehouseConfig {
		WarehouseConfig {
			host: "cdp.example.com".to_string(),
			port: 5439,
			database: "cdp".to_string(),
			user: "etl".to_string(),
			password: Some("pw".into()),
			connect_timeout_secs: 5,
			max_connections: 2,
		}
	}

	#[test]
	fn options_carry_section_values() {
		let options = connect_options(&config());
		assert_eq!(options.get_host(), "cdp.example.com");
		assert_eq!(options.get_port(), 5439);
		assert_eq!(options.get_database(), Some("cdp"));
		assert_eq!(options.get_username(), "etl");
	}

	#[tokio::test]
	async fn lazy_pool_does_not_connect() {
		let pool = create_lazy_pool(&config()).unwrap();
		assert_eq!(pool.size(), 0);
	}

	#[test]
	fn zero_connections_rejected() {
		let mut cfg = config();
		cfg.max_connections = 0;
		assert!(create_lazy_pool(&cfg).is_err());
	}
}
