// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{Context, Result};
use etl_agent_config::{AgentConfig, WarehouseConfig};
use etl_agent_core::{Notifier, StagingStore, Warehouse};
use etl_agent_jobs::Collaborators;
use etl_agent_smtp::EmailNotifier;
use etl_agent_storage::ObjectStoreStaging;
use etl_agent_warehouse::PgWarehouse;
use tracing::{info, warn};

fn warehouse(name: &str, config: &WarehouseConfig) -> Result<Option<Arc<dyn Warehouse>>> {
	if config.host.trim().is_empty() {
		return Ok(None);
	}
	let warehouse = PgWarehouse::connect_lazy(name, config)
		.with_context(|| format!("failed to set up {name} warehouse"))?;
	info!(warehouse = name, host = %config.host, database = %config.database, "warehouse configured");
	Ok(Some(Arc::new(warehouse)))
}

/// Build the adapters whose settings are present. Pools connect lazily, so
/// an unreachable warehouse only fails the job that uses it.
pub fn collaborators(config: &AgentConfig) -> Result<Collaborators> {
	let staging: Option<Arc<dyn StagingStore>> = if config.object_store.bucket.trim().is_empty() {
		None
	} else {
		let store = ObjectStoreStaging::from_config(&config.object_store)
			.context("failed to set up object store staging")?;
		Some(Arc::new(store))
	};

	// Notifications are best effort; a broken relay config must not stop jobs.
	let notifier: Option<Arc<dyn Notifier>> = match &config.smtp {
		Some(smtp) => match EmailNotifier::from_config(smtp.clone()) {
			Ok(notifier) => Some(Arc::new(notifier)),
			Err(e) => {
				warn!(error = %e, "email notifications disabled");
				None
			}
		},
		None => None,
	};

	Ok(Collaborators {
		source_warehouse: warehouse("source", &config.source_warehouse)?,
		destination_warehouse: warehouse("destination", &config.destination_warehouse)?,
		dev_warehouse: warehouse("dev", &config.dev_warehouse)?,
		staging,
		notifier,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unset_sections_yield_no_adapters() {
		let collaborators = collaborators(&AgentConfig::default()).unwrap();
		assert!(collaborators.source_warehouse.is_none());
		assert!(collaborators.destination_warehouse.is_none());
		assert!(collaborators.dev_warehouse.is_none());
		assert!(collaborators.staging.is_none());
		assert!(collaborators.notifier.is_none());
	}

	#[test]
	fn test_local_bucket_becomes_staging() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = AgentConfig::default();
		config.object_store.bucket = format!("file://{}", dir.path().display());

		let collaborators = collaborators(&config).unwrap();
		let staging = collaborators.staging.unwrap();
		assert!(staging.uri("jcap_pa_dashboard/").starts_with("file://"));
	}
}
