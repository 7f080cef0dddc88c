// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Building the [`JobConfig`] from command-line input.

use std::path::{Path, PathBuf};

use etl_agent_core::JobConfig;
use serde_json::Value;
use thiserror::Error;

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Error)]
pub enum JobSourceError {
	#[error("no job given: pass --job-config, --job-config-file or --job-id")]
	Missing,

	#[error("cannot read job file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid job configuration: {0}")]
	Invalid(#[from] serde_json::Error),
}

/// Discrete job flags. They override the matching fields of a JSON job.
#[derive(Debug, Clone, Default)]
pub struct JobOverrides {
	pub name: Option<String>,
	pub job_type: Option<String>,
	pub load_date: Option<String>,
	pub limit: Option<u64>,
}

impl JobOverrides {
	fn apply(&self, mut job: JobConfig) -> JobConfig {
		if let Some(name) = &self.name {
			job.name = Some(name.clone());
		}
		if let Some(job_type) = &self.job_type {
			job.job_type = Some(job_type.clone());
		}
		if let Some(load_date) = &self.load_date {
			job.load_date = Some(load_date.clone());
		}
		if let Some(limit) = self.limit {
			job.limit = Some(limit);
		}
		job
	}
}

/// A job plus the form it is logged in.
#[derive(Debug)]
pub struct LoadedJob {
	pub job: JobConfig,
	/// The submitted document with secret-looking keys masked.
	pub redacted: Value,
}

/// Pick the first source given: inline JSON, then a file, then a bare id.
pub fn load_job(
	inline: Option<&str>,
	file: Option<&Path>,
	job_id: Option<&str>,
	overrides: &JobOverrides,
) -> Result<LoadedJob, JobSourceError> {
	let raw: Value = if let Some(inline) = inline {
		serde_json::from_str(inline)?
	} else if let Some(path) = file {
		let text = std::fs::read_to_string(path).map_err(|source| JobSourceError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_json::from_str(&text)?
	} else if let Some(id) = job_id {
		serde_json::to_value(JobConfig::new(id))?
	} else {
		return Err(JobSourceError::Missing);
	};

	let job: JobConfig = serde_json::from_value(raw.clone())?;
	Ok(LoadedJob {
		job: overrides.apply(job),
		redacted: redact(raw),
	})
}

/// Mask every value whose key mentions a password, at any depth.
pub fn redact(value: Value) -> Value {
	match value {
		Value::Object(map) => Value::Object(
			map.into_iter()
				.map(|(key, value)| {
					if key.to_ascii_lowercase().contains("password") {
						(key, Value::String(REDACTED.to_string()))
					} else {
						(key, redact(value))
					}
				})
				.collect(),
		),
		Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
		other => other,
	}
}
