// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use etl_agent_config::{AgentConfig, WarehouseConfig};
use etl_agent_core::memory::{MemoryStagingStore, MemoryWarehouse, RecordingNotifier};
use etl_agent_core::{EtlError, Result, Table, TableRef, Value, Warehouse, WriteMode};
use etl_agent_jobs::{transform, Collaborators, JobDispatcher};
use etl_common_config::SecretString;

pub const JOB_NAME: &str = "JCAP PA ETL";

pub fn production_table() -> TableRef {
	TableRef::new("jcap", "jcap_pa")
}

pub fn backup_table() -> TableRef {
	TableRef::new("jcap", "jcap_pa_bkp")
}

pub fn today() -> NaiveDate {
	NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()
}

/// `n` rows shaped like the prior-authorization extract.
pub fn extract_rows(n: usize) -> Table {
	Table::from_rows(
		vec![
			"JCAP_table_loaddate".into(),
			"pmc_patid".into(),
			"DrugorTherapy".into(),
			"PADisposition".into(),
			"PA_CompletedDate".into(),
			"PA_InitiatedDate".into(),
			"load_date".into(),
			"LHM_Name".into(),
		],
		(0..n)
			.map(|i| {
				vec![
					Value::Date(today()),
					Value::text(format!("{}", 1000 + i)),
					Value::text("OPSUMIT"),
					Value::text("Approved"),
					Value::text("01-15-2025"),
					Value::text("01-02-2025"),
					Value::text("05-19-2025"),
					Value::text("North"),
				]
			})
			.collect(),
	)
	.unwrap()
}

/// Production contents as a previous successful run would have left them.
pub fn loaded_rows(n: usize) -> Table {
	transform(extract_rows(n)).unwrap()
}

fn warehouse_config(host: &str) -> WarehouseConfig {
	WarehouseConfig {
		host: host.to_string(),
		database: "analytics".to_string(),
		user: "etl".to_string(),
		password: Some(SecretString::new("hunter2".to_string())),
		..WarehouseConfig::default()
	}
}

/// Every setting both job types require, with notifications enabled.
pub fn complete_config() -> AgentConfig {
	let mut config = AgentConfig {
		source_warehouse: warehouse_config("cdp.example.com"),
		destination_warehouse: warehouse_config("redshift.example.com"),
		dev_warehouse: warehouse_config("dev.example.com"),
		..AgentConfig::default()
	};
	config.object_store.bucket = "etl-staging".to_string();
	config.object_store.role_arn = "arn:aws:iam::123456789012:role/etl".to_string();
	config.notify.enabled = true;
	config.notify.recipients = vec!["dna-team@example.com".to_string()];
	config
}

/// In-memory collaborators plus handles for assertions.
pub struct Harness {
	pub source: MemoryWarehouse,
	pub destination: MemoryWarehouse,
	pub dev: MemoryWarehouse,
	pub staging: MemoryStagingStore,
	pub notifier: RecordingNotifier,
}

impl Harness {
	pub fn new() -> Self {
		Self {
			source: MemoryWarehouse::new("source"),
			destination: MemoryWarehouse::new("destination"),
			dev: MemoryWarehouse::new("dev"),
			staging: MemoryStagingStore::new(),
			notifier: RecordingNotifier::new(),
		}
	}

	/// A production table holding `existing` rows and an extract of `extracted` rows.
	pub fn production(existing: usize, extracted: usize) -> Self {
		let harness = Self::new();
		if existing > 0 {
			harness
				.destination
				.insert_table(&production_table(), loaded_rows(existing));
		}
		harness.source.set_query_result(extract_rows(extracted));
		harness
	}

	pub fn collaborators(&self) -> Collaborators {
		self.collaborators_with_destination(Arc::new(self.destination.clone()))
	}

	pub fn collaborators_with_destination(&self, destination: Arc<dyn Warehouse>) -> Collaborators {
		Collaborators {
			source_warehouse: Some(Arc::new(self.source.clone())),
			destination_warehouse: Some(destination),
			dev_warehouse: Some(Arc::new(self.dev.clone())),
			staging: Some(Arc::new(self.staging.clone())),
			notifier: Some(Arc::new(self.notifier.clone())),
		}
	}

	pub fn dispatcher(&self) -> JobDispatcher {
		self.dispatcher_with(complete_config())
	}

	pub fn dispatcher_with(&self, config: AgentConfig) -> JobDispatcher {
		JobDispatcher::new(config, self.collaborators()).with_today(today)
	}
}

/// Delegates to a [`MemoryWarehouse`] but fails the first append into the
/// production table, so the failure lands after the truncate while a later
/// restore can still write.
#[derive(Clone)]
pub struct FailFirstLoad {
	inner: MemoryWarehouse,
	tripped: Arc<AtomicBool>,
}

impl FailFirstLoad {
	pub fn new(inner: MemoryWarehouse) -> Self {
		Self {
			inner,
			tripped: Arc::new(AtomicBool::new(false)),
		}
	}
}

#[async_trait]
impl Warehouse for FailFirstLoad {
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn read_table(&self, table: &TableRef, limit: Option<u64>) -> Result<Table> {
		self.inner.read_table(table, limit).await
	}

	async fn execute_query(&self, sql: &str) -> Result<Table> {
		self.inner.execute_query(sql).await
	}

	async fn write_table(&self, data: &Table, table: &TableRef, mode: WriteMode) -> Result<u64> {
		if *table == production_table() && !self.tripped.swap(true, Ordering::SeqCst) {
			return Err(EtlError::connectivity("destination", "connection reset by peer"));
		}
		self.inner.write_table(data, table, mode).await
	}

	async fn count(&self, table: &TableRef) -> Result<u64> {
		self.inner.count(table).await
	}

	async fn truncate(&self, table: &TableRef) -> Result<()> {
		self.inner.truncate(table).await
	}
}
