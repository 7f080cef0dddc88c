// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The uniform per-run result record and the handler output types that feed it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, EtlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
	Success,
	Failed,
}

impl JobStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Success => "Success",
			Self::Failed => "Failed",
		}
	}
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One record per run. Created once and never mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
	pub status: JobStatus,
	pub job_id: String,
	pub job_name: String,
	pub job_type: String,
	/// Always 0 on failure.
	pub rows_processed: u64,
	pub start_time: DateTime<Utc>,
	pub end_time: DateTime<Utc>,
	pub duration_seconds: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_kind: Option<ErrorKind>,
	#[serde(flatten)]
	pub details: Option<JobDetails>,
}

impl JobResult {
	/// Build the record for a finished handler invocation.
	///
	/// `duration_seconds` is derived from the two timestamps and clamped at zero.
	pub fn from_outcome(
		job_id: impl Into<String>,
		job_name: impl Into<String>,
		job_type: impl Into<String>,
		start_time: DateTime<Utc>,
		end_time: DateTime<Utc>,
		outcome: std::result::Result<JobOutput, JobFailure>,
	) -> Self {
		let duration_seconds = ((end_time - start_time).num_milliseconds() as f64 / 1000.0).max(0.0);
		let (status, rows_processed, error, error_kind, details) = match outcome {
			Ok(output) => (
				JobStatus::Success,
				output.rows_processed,
				None,
				None,
				output.details,
			),
			Err(failure) => (
				JobStatus::Failed,
				0,
				Some(failure.to_string()),
				Some(failure.error.kind()),
				failure.details,
			),
		};

		Self {
			status,
			job_id: job_id.into(),
			job_name: job_name.into(),
			job_type: job_type.into(),
			rows_processed,
			start_time,
			end_time,
			duration_seconds,
			error,
			error_kind,
			details,
		}
	}

	pub fn is_success(&self) -> bool {
		self.status == JobStatus::Success
	}

	pub fn workflow_metrics(&self) -> Option<&WorkflowMetrics> {
		match &self.details {
			Some(JobDetails::Production(metrics)) => Some(metrics),
			_ => None,
		}
	}
}

/// Job-type specific fields, flattened into the result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobDetails {
	Simple(SimpleEtlDetails),
	Production(WorkflowMetrics),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleEtlDetails {
	pub source_table: String,
	pub destination_table: String,
	pub load_date: String,
}

/// Counters and flags collected while the production workflow runs.
///
/// On failure the record holds whatever was known when the failing step
/// returned, so an operator can tell how far the run got.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
	pub load_date: String,
	#[serde(default)]
	pub previous_count: Option<u64>,
	#[serde(default)]
	pub current_count: Option<u64>,
	#[serde(default)]
	pub variance_percentage: Option<f64>,
	#[serde(default)]
	pub variance_threshold_exceeded: bool,
	#[serde(default)]
	pub notification_sent: bool,
	#[serde(default)]
	pub completion_notified: bool,
	#[serde(default)]
	pub restored_from_backup: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub failed_step: Option<PipelineStep>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub staging_path: Option<String>,
}

impl WorkflowMetrics {
	pub fn new(load_date: impl Into<String>) -> Self {
		Self {
			load_date: load_date.into(),
			..Default::default()
		}
	}
}

/// Production workflow steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
	Backup,
	Extract,
	Transform,
	Stage,
	Load,
	Validate,
}

impl PipelineStep {
	pub const ORDER: [PipelineStep; 6] = [
		Self::Backup,
		Self::Extract,
		Self::Transform,
		Self::Stage,
		Self::Load,
		Self::Validate,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Backup => "backup",
			Self::Extract => "extract",
			Self::Transform => "transform",
			Self::Stage => "stage",
			Self::Load => "load",
			Self::Validate => "validate",
		}
	}
}

impl fmt::Display for PipelineStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What a handler returns on success.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
	pub rows_processed: u64,
	pub details: Option<JobDetails>,
}

impl JobOutput {
	pub fn new(rows_processed: u64) -> Self {
		Self {
			rows_processed,
			details: None,
		}
	}

	pub fn with_details(mut self, details: JobDetails) -> Self {
		self.details = Some(details);
		self
	}
}

/// What a handler returns on failure: the error plus any partial details.
///
/// `note` carries follow-up failures (such as a failed restore) that do not
/// change the error kind but belong in the reported message.
#[derive(Debug)]
pub struct JobFailure {
	pub error: EtlError,
	pub details: Option<JobDetails>,
	pub note: Option<String>,
}

impl JobFailure {
	pub fn with_details(mut self, details: JobDetails) -> Self {
		self.details = Some(details);
		self
	}

	pub fn with_note(mut self, note: impl Into<String>) -> Self {
		self.note = Some(note.into());
		self
	}
}

impl From<EtlError> for JobFailure {
	fn from(error: EtlError) -> Self {
		Self {
			error,
			details: None,
			note: None,
		}
	}
}

impl fmt::Display for JobFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.note {
			Some(note) => write!(f, "{}; {note}", self.error),
			None => self.error.fmt(f),
		}
	}
}
