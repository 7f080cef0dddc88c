// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job configuration as supplied by the operator, and its resolution into a
//! strongly-typed [`JobSpec`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// Format of `load_date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw job description: `{id, name?, type?, load_date?, limit?}`.
///
/// Built from inline JSON, a file, or discrete CLI flags. It is never mutated
/// once dispatch begins; defaults are applied in [`JobConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub job_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub load_date: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub limit: Option<u64>,
}

impl JobConfig {
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: None,
			job_type: None,
			load_date: None,
			limit: None,
		}
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn with_type(mut self, job_type: impl Into<String>) -> Self {
		self.job_type = Some(job_type.into());
		self
	}

	pub fn with_load_date(mut self, load_date: impl Into<String>) -> Self {
		self.load_date = Some(load_date.into());
		self
	}

	pub fn with_limit(mut self, limit: u64) -> Self {
		self.limit = Some(limit);
		self
	}

	/// Display label; `job-<id>` when no name was given.
	pub fn display_name(&self) -> String {
		match self.name.as_deref().map(str::trim) {
			Some(name) if !name.is_empty() => name.to_string(),
			_ => format!("job-{}", self.id),
		}
	}

	/// Type identifier after defaulting (`simple_etl` when absent).
	pub fn type_identifier(&self) -> &str {
		match self.job_type.as_deref().map(str::trim) {
			Some(t) if !t.is_empty() => t,
			_ => JobType::SimpleEtl.as_str(),
		}
	}

	/// Resolve the job type only. Fails before any side effect on an unknown type.
	pub fn resolve_type(&self) -> Result<JobType> {
		self.type_identifier().parse()
	}

	/// Normalize into a [`JobSpec`]. `today` is used when `load_date` is absent.
	pub fn resolve(&self, today: NaiveDate, default_limit: u64) -> Result<JobSpec> {
		let id = self.id.trim();
		if id.is_empty() {
			return Err(EtlError::InvalidConfiguration("job id must not be empty".to_string()));
		}

		let job_type = self.resolve_type()?;
		let load_date = match self.load_date.as_deref().map(str::trim) {
			Some(raw) if !raw.is_empty() => NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
				EtlError::InvalidConfiguration(format!("load_date '{raw}' is not YYYY-MM-DD: {e}"))
			})?,
			_ => today,
		};

		let kind = match job_type {
			JobType::SimpleEtl => {
				let limit = self.limit.unwrap_or(default_limit);
				if limit == 0 {
					return Err(EtlError::InvalidConfiguration(
						"limit must be a positive integer".to_string(),
					));
				}
				JobKind::Simple(SimpleEtlParams { load_date, limit })
			}
			JobType::ProductionEtl => JobKind::Production(ProductionEtlParams { load_date }),
		};

		Ok(JobSpec {
			id: id.to_string(),
			name: self.display_name(),
			kind,
		})
	}
}

/// Supported job types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
	/// Development job: read-limit, annotate, select, append.
	SimpleEtl,
	/// Production job: backup, extract, transform, stage, load, validate.
	ProductionEtl,
}

impl JobType {
	pub const ALL: [JobType; 2] = [JobType::SimpleEtl, JobType::ProductionEtl];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::SimpleEtl => "simple_etl",
			Self::ProductionEtl => "production_etl",
		}
	}
}

impl fmt::Display for JobType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for JobType {
	type Err = EtlError;

	fn from_str(s: &str) -> Result<Self> {
		match s.trim().to_ascii_lowercase().as_str() {
			"simple_etl" | "control_m_poc_etl" => Ok(Self::SimpleEtl),
			"production_etl" | "jcap_pa_etl" => Ok(Self::ProductionEtl),
			_ => Err(EtlError::UnsupportedJobType(s.to_string())),
		}
	}
}

/// A job ready to run: identity plus the type-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
	pub id: String,
	pub name: String,
	pub kind: JobKind,
}

/// One variant per job type, each carrying only the parameters that type uses.
#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
	Simple(SimpleEtlParams),
	Production(ProductionEtlParams),
}

impl JobKind {
	pub fn job_type(&self) -> JobType {
		match self {
			Self::Simple(_) => JobType::SimpleEtl,
			Self::Production(_) => JobType::ProductionEtl,
		}
	}

	pub fn load_date(&self) -> NaiveDate {
		match self {
			Self::Simple(p) => p.load_date,
			Self::Production(p) => p.load_date,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleEtlParams {
	pub load_date: NaiveDate,
	pub limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionEtlParams {
	pub load_date: NaiveDate,
}
