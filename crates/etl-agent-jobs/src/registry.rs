// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job dispatch: type resolution, per-type configuration checks, handler
//! invocation and result assembly.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use etl_agent_config::{keys, AgentConfig};
use etl_agent_core::{
	EtlError, JobConfig, JobFailure, JobKind, JobOutput, JobResult, JobType, Notifier,
	StagingStore, Warehouse,
};
use futures::FutureExt;
use tracing::{error, info, instrument, Span};
use uuid::Uuid;

use crate::notify::NotificationSink;
use crate::simple::SimpleEtlJob;
use crate::supervisor::JobRunner;
use crate::workflow::ProductionWorkflow;

/// Settings each job type needs, named by their environment keys.
pub fn required_settings(job_type: JobType) -> &'static [&'static str] {
	match job_type {
		JobType::SimpleEtl => &[
			keys::DEV_WAREHOUSE_HOST,
			keys::DEV_WAREHOUSE_DATABASE,
			keys::DEV_WAREHOUSE_USER,
			keys::DEV_WAREHOUSE_PASSWORD,
		],
		JobType::ProductionEtl => &[
			keys::SOURCE_WAREHOUSE_HOST,
			keys::SOURCE_WAREHOUSE_DATABASE,
			keys::SOURCE_WAREHOUSE_USER,
			keys::SOURCE_WAREHOUSE_PASSWORD,
			keys::DESTINATION_WAREHOUSE_HOST,
			keys::DESTINATION_WAREHOUSE_DATABASE,
			keys::DESTINATION_WAREHOUSE_USER,
			keys::DESTINATION_WAREHOUSE_PASSWORD,
			keys::OBJECT_STORE_BUCKET,
			keys::OBJECT_STORE_ROLE_ARN,
		],
	}
}

/// Process-lifetime adapters handed to the job handlers. A slot is `None`
/// when its settings were absent at startup.
#[derive(Clone, Default)]
pub struct Collaborators {
	pub source_warehouse: Option<Arc<dyn Warehouse>>,
	pub destination_warehouse: Option<Arc<dyn Warehouse>>,
	pub dev_warehouse: Option<Arc<dyn Warehouse>>,
	pub staging: Option<Arc<dyn StagingStore>>,
	pub notifier: Option<Arc<dyn Notifier>>,
}

fn require<T: ?Sized>(slot: &Option<Arc<T>>, what: &str) -> Result<Arc<T>, EtlError> {
	slot.clone().ok_or_else(|| {
		EtlError::InvalidConfiguration(format!("{what} is not available in this process"))
	})
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"handler panicked".to_string()
	}
}

pub struct JobDispatcher {
	config: AgentConfig,
	collaborators: Collaborators,
	today: fn() -> NaiveDate,
}

impl JobDispatcher {
	pub fn new(config: AgentConfig, collaborators: Collaborators) -> Self {
		Self {
			config,
			collaborators,
			today: || Local::now().date_naive(),
		}
	}

	/// Override the clock used to default `load_date`.
	pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
		self.today = today;
		self
	}

	pub fn config(&self) -> &AgentConfig {
		&self.config
	}

	/// Run one job and return its record. Never fails: every error, including
	/// a handler panic, becomes a Failed result.
	#[instrument(
		skip(self, job),
		fields(job_id = %job.id, job_type = %job.type_identifier(), run_id = tracing::field::Empty)
	)]
	pub async fn dispatch(&self, job: &JobConfig) -> JobResult {
		Span::current().record("run_id", tracing::field::display(Uuid::new_v4()));
		let job_name = job.display_name();
		let job_type = job
			.resolve_type()
			.map(|t| t.as_str().to_string())
			.unwrap_or_else(|_| job.type_identifier().to_string());
		info!(job_name = %job_name, "executing job");

		let start_time = Utc::now();
		let outcome = match AssertUnwindSafe(self.execute(job)).catch_unwind().await {
			Ok(outcome) => outcome,
			Err(payload) => Err(EtlError::Internal(format!(
				"handler panicked: {}",
				panic_message(payload.as_ref())
			))
			.into()),
		};
		let end_time = Utc::now();

		let result = JobResult::from_outcome(job.id.clone(), job_name, job_type, start_time, end_time, outcome);
		if result.is_success() {
			info!(
				rows = result.rows_processed,
				duration_seconds = result.duration_seconds,
				"job completed"
			);
		} else {
			error!(
				error = result.error.as_deref().unwrap_or_default(),
				error_kind = ?result.error_kind,
				"job failed"
			);
		}
		result
	}

	async fn execute(&self, job: &JobConfig) -> Result<JobOutput, JobFailure> {
		let job_type = job.resolve_type()?;

		let missing = self.config.missing(required_settings(job_type));
		if !missing.is_empty() {
			return Err(EtlError::MissingConfiguration { missing }.into());
		}

		let spec = job.resolve((self.today)(), self.config.simple.default_limit)?;
		match spec.kind {
			JobKind::Simple(params) => {
				let warehouse = require(&self.collaborators.dev_warehouse, "dev warehouse")?;
				SimpleEtlJob::new(warehouse, &self.config.simple).run(params).await
			}
			JobKind::Production(params) => {
				let workflow = ProductionWorkflow::new(
					require(&self.collaborators.source_warehouse, "source warehouse")?,
					require(&self.collaborators.destination_warehouse, "destination warehouse")?,
					require(&self.collaborators.staging, "object store")?,
					NotificationSink::from_config(self.collaborators.notifier.clone(), &self.config.notify),
					self.config.production.clone(),
				)?;
				workflow.run(&spec.name, params).await
			}
		}
	}
}

#[async_trait]
impl JobRunner for JobDispatcher {
	async fn run_job(&self, job: &JobConfig) -> JobResult {
		self.dispatch(job).await
	}
}
