// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for ETL jobs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Errors that can occur while dispatching or running a job.
#[derive(Debug, Error)]
pub enum EtlError {
	#[error("unsupported job type '{0}' (supported: simple_etl, production_etl)")]
	UnsupportedJobType(String),

	#[error("missing required configuration: {}", .missing.join(", "))]
	MissingConfiguration { missing: Vec<String> },

	#[error("invalid configuration: {0}")]
	InvalidConfiguration(String),

	#[error("cannot reach {target}: {message}")]
	Connectivity { target: String, message: String },

	#[error("query failed: {0}")]
	Query(String),

	#[error("backup validation failed: original={original}, backup={backup}")]
	BackupValidation { original: u64, backup: u64 },

	#[error("transform failed: {0}")]
	Transform(String),

	#[error("staging failed: {0}")]
	Storage(String),

	#[error("no rows loaded into {table} despite a successful write")]
	EmptyLoad { table: String },

	#[error("notification failed: {0}")]
	Notification(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl EtlError {
	pub fn connectivity(target: impl Into<String>, message: impl ToString) -> Self {
		Self::Connectivity {
			target: target.into(),
			message: message.to_string(),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::UnsupportedJobType(_) => ErrorKind::UnsupportedJobType,
			Self::MissingConfiguration { .. } | Self::InvalidConfiguration(_) => {
				ErrorKind::ConfigurationError
			}
			Self::Connectivity { .. } => ErrorKind::ConnectivityError,
			Self::Query(_) => ErrorKind::QueryError,
			Self::BackupValidation { .. } => ErrorKind::BackupValidationError,
			Self::Transform(_) => ErrorKind::TransformError,
			Self::Storage(_) => ErrorKind::StorageError,
			Self::EmptyLoad { .. } => ErrorKind::EmptyLoadError,
			Self::Notification(_) => ErrorKind::NotificationError,
			Self::Internal(_) => ErrorKind::InternalError,
		}
	}
}

/// Serializable classification of an [`EtlError`], recorded in job results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	UnsupportedJobType,
	ConfigurationError,
	ConnectivityError,
	QueryError,
	BackupValidationError,
	TransformError,
	StorageError,
	EmptyLoadError,
	NotificationError,
	InternalError,
}
