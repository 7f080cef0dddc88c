// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The production workflow: backup, extract, transform, stage, load, validate.
//!
//! Steps run strictly in that order and each starts only after its
//! predecessor succeeded. Every step is journaled with the durable state it
//! touched, so a failure after the production table was truncated can be
//! recognised and, when enabled, undone by restoring the backup.

use std::sync::Arc;
use std::time::Instant;

use etl_agent_config::ProductionConfig;
use etl_agent_core::{
	EtlError, JobDetails, JobFailure, JobOutput, JobStatus, PipelineStep, ProductionEtlParams,
	Result, StagingStore, Table, TableRef, Warehouse, WorkflowMetrics, WriteMode, DATE_FORMAT,
};
use tracing::{error, info, instrument, warn};

use crate::backup::BackupGuard;
use crate::extract::ExtractQuery;
use crate::notify::{CompletionNotice, NotificationSink};
use crate::transform::transform;
use crate::variance::{VarianceDetector, VarianceReport};

/// Durable state a step changed, whether or not it then failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mutations {
	pub backup_written: bool,
	pub production_truncated: bool,
	pub production_loaded: bool,
}

impl Mutations {
	pub fn touches_production(&self) -> bool {
		self.production_truncated || self.production_loaded
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStepOutcome {
	pub step: PipelineStep,
	pub mutations: Mutations,
	pub error: Option<String>,
}

/// Ordered record of the steps that ran.
#[derive(Debug, Clone, Default)]
pub struct StepJournal {
	outcomes: Vec<PipelineStepOutcome>,
}

impl StepJournal {
	/// Record the outcome of `step` and pass its result through.
	pub fn record<T>(&mut self, step: PipelineStep, mutations: Mutations, result: Result<T>) -> Result<T> {
		let error = match &result {
			Ok(_) => {
				info!(step = %step, "step completed");
				None
			}
			Err(e) => {
				error!(step = %step, error = %e, "step failed");
				Some(e.to_string())
			}
		};
		self.outcomes.push(PipelineStepOutcome {
			step,
			mutations,
			error,
		});
		result
	}

	pub fn outcomes(&self) -> &[PipelineStepOutcome] {
		&self.outcomes
	}

	pub fn production_mutated(&self) -> bool {
		self.outcomes.iter().any(|o| o.mutations.touches_production())
	}

	pub fn failed_step(&self) -> Option<PipelineStep> {
		self.outcomes.iter().find(|o| o.error.is_some()).map(|o| o.step)
	}
}

pub struct ProductionWorkflow {
	source: Arc<dyn Warehouse>,
	destination: Arc<dyn Warehouse>,
	staging: Arc<dyn StagingStore>,
	sink: NotificationSink,
	settings: ProductionConfig,
	guard: BackupGuard,
	detector: VarianceDetector,
}

impl ProductionWorkflow {
	/// `source` is queried for the extract; `destination` holds both the
	/// production table and its backup.
	pub fn new(
		source: Arc<dyn Warehouse>,
		destination: Arc<dyn Warehouse>,
		staging: Arc<dyn StagingStore>,
		sink: NotificationSink,
		settings: ProductionConfig,
	) -> Result<Self> {
		let detector = VarianceDetector::new(settings.variance_threshold)?;
		let guard = BackupGuard::new(
			TableRef::new(&settings.schema, &settings.table),
			TableRef::new(&settings.schema, &settings.backup_table),
		);
		Ok(Self {
			source,
			destination,
			staging,
			sink,
			settings,
			guard,
			detector,
		})
	}

	pub fn production_table(&self) -> &TableRef {
		self.guard.production()
	}

	pub fn backup_table(&self) -> &TableRef {
		self.guard.backup()
	}

	fn staging_path(&self) -> String {
		format!("{}/", self.settings.staging_prefix)
	}

	/// Run every step, restore on post-truncation failure when enabled, and
	/// send the completion notification. Notification outcomes are recorded
	/// in the metrics but never change the result.
	#[instrument(skip(self, params), fields(job = %job_name, load_date = %params.load_date))]
	pub async fn run(
		&self,
		job_name: &str,
		params: ProductionEtlParams,
	) -> std::result::Result<JobOutput, JobFailure> {
		let started = Instant::now();
		let mut metrics = WorkflowMetrics::new(params.load_date.format(DATE_FORMAT).to_string());
		let mut journal = StepJournal::default();

		let outcome = match self.execute(job_name, &mut journal, &mut metrics).await {
			Ok(rows) => Ok(rows),
			Err(error) => {
				metrics.failed_step = journal.failed_step();
				let note = self.recover(&journal, &mut metrics).await;
				Err((error, note))
			}
		};

		let notice = match &outcome {
			Ok(rows) => CompletionNotice {
				status: JobStatus::Success,
				duration_seconds: started.elapsed().as_secs_f64(),
				rows_processed: *rows,
				error: None,
			},
			Err((error, note)) => CompletionNotice {
				status: JobStatus::Failed,
				duration_seconds: started.elapsed().as_secs_f64(),
				rows_processed: 0,
				error: Some(match note {
					Some(note) => format!("{error}; {note}"),
					None => error.to_string(),
				}),
			},
		};
		metrics.completion_notified = self.sink.job_completed(job_name, &notice).await;

		match outcome {
			Ok(rows) => {
				info!(
					rows,
					duration_seconds = notice.duration_seconds,
					"production workflow completed"
				);
				Ok(JobOutput::new(rows).with_details(JobDetails::Production(metrics)))
			}
			Err((error, note)) => {
				let mut failure = JobFailure::from(error).with_details(JobDetails::Production(metrics));
				if let Some(note) = note {
					failure = failure.with_note(note);
				}
				Err(failure)
			}
		}
	}

	async fn execute(
		&self,
		job_name: &str,
		journal: &mut StepJournal,
		metrics: &mut WorkflowMetrics,
	) -> Result<u64> {
		let protected = self.guard.protect(self.destination.as_ref()).await;
		let mutations = Mutations {
			backup_written: protected.as_ref().is_ok_and(|r| r.copied),
			..Mutations::default()
		};
		let backup = journal.record(PipelineStep::Backup, mutations, protected)?;
		metrics.previous_count = Some(backup.original_count);

		let extracted = journal.record(PipelineStep::Extract, Mutations::default(), self.extract().await)?;

		let transformed = journal.record(
			PipelineStep::Transform,
			Mutations::default(),
			transform(extracted),
		)?;

		let staging_path = journal.record(
			PipelineStep::Stage,
			Mutations::default(),
			self.stage(&transformed).await,
		)?;
		metrics.staging_path = Some(staging_path);

		let mut mutations = Mutations::default();
		let loaded = self.load(&transformed, &mut mutations).await;
		journal.record(PipelineStep::Load, mutations, loaded)?;

		let report = journal.record(
			PipelineStep::Validate,
			Mutations::default(),
			self.validate(backup.original_count).await,
		)?;
		metrics.current_count = Some(report.current_count);
		metrics.variance_percentage = Some(report.variance_percentage);
		metrics.variance_threshold_exceeded = report.threshold_exceeded;

		if report.threshold_exceeded {
			warn!(
				variance_percentage = report.variance_percentage,
				threshold = report.threshold,
				"variance reached threshold"
			);
			metrics.notification_sent = self.sink.variance_alert(job_name, &report).await;
		} else {
			info!(
				variance_percentage = report.variance_percentage,
				"variance within threshold"
			);
		}

		Ok(report.current_count)
	}

	async fn extract(&self) -> Result<Table> {
		let sql = ExtractQuery::from_config(&self.settings).to_sql();
		let data = self.source.execute_query(&sql).await?;
		info!(warehouse = self.source.name(), rows = data.row_count(), "extracted source rows");
		Ok(data)
	}

	/// Replace whatever is staged under the prefix. Returns the staged URI.
	async fn stage(&self, data: &Table) -> Result<String> {
		let path = self.staging_path();
		if self.staging.exists(&path).await? {
			info!(path = %path, "removing previously staged data");
			self.staging.delete(&path).await?;
		}
		self.staging
			.write_columnar(data, &path, WriteMode::Overwrite)
			.await?;
		Ok(self.staging.uri(&path))
	}

	/// Truncate, append and verify the production table.
	///
	/// A count mismatch after the write is only logged; a count of zero fails.
	async fn load(&self, data: &Table, mutations: &mut Mutations) -> Result<u64> {
		let production = self.production_table();

		self.destination.truncate(production).await?;
		mutations.production_truncated = true;

		let written = self
			.destination
			.write_table(data, production, WriteMode::Append)
			.await?;
		mutations.production_loaded = true;

		let final_count = self.destination.count(production).await?;
		if final_count == 0 {
			return Err(EtlError::EmptyLoad {
				table: production.qualified(),
			});
		}
		if final_count != data.row_count() {
			warn!(
				expected = data.row_count(),
				actual = final_count,
				written,
				"row count mismatch after load"
			);
		}
		Ok(final_count)
	}

	async fn validate(&self, previous_count: u64) -> Result<VarianceReport> {
		let current_count = self.destination.count(self.production_table()).await?;
		Ok(self.detector.evaluate(previous_count, current_count))
	}

	/// Restore the backup if production was touched. Returns text to append
	/// to the job error when the restore itself failed.
	async fn recover(&self, journal: &StepJournal, metrics: &mut WorkflowMetrics) -> Option<String> {
		if !journal.production_mutated() {
			return None;
		}
		if !self.settings.restore_on_failure {
			warn!(
				table = %self.production_table(),
				"production table left truncated or partially loaded; restore disabled"
			);
			return None;
		}

		match self.guard.restore(self.destination.as_ref()).await {
			Ok(rows) => {
				metrics.restored_from_backup = true;
				info!(rows, "restored production table after failure");
				None
			}
			Err(e) => {
				error!(error = %e, table = %self.production_table(), "restore from backup failed");
				Some(format!("restore from backup failed: {e}"))
			}
		}
	}
}
