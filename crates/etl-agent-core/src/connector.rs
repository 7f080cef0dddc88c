// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interfaces to the external collaborators: warehouse, staging object store,
//! and notification channel.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::Table;

/// A table name with an optional schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
	pub schema: Option<String>,
	pub name: String,
}

impl TableRef {
	pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			schema: Some(schema.into()),
			name: name.into(),
		}
	}

	pub fn unqualified(name: impl Into<String>) -> Self {
		Self {
			schema: None,
			name: name.into(),
		}
	}

	/// `schema.name`, or just `name`.
	pub fn qualified(&self) -> String {
		match &self.schema {
			Some(schema) => format!("{schema}.{}", self.name),
			None => self.name.clone(),
		}
	}
}

impl fmt::Display for TableRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.qualified())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
	Append,
	Overwrite,
}

/// Read/write/count/truncate over SQL tables.
#[async_trait]
pub trait Warehouse: Send + Sync {
	/// Label used in logs and connectivity errors.
	fn name(&self) -> &str;

	async fn read_table(&self, table: &TableRef, limit: Option<u64>) -> Result<Table>;

	async fn execute_query(&self, sql: &str) -> Result<Table>;

	/// Write all rows of `data`; returns the number of rows written.
	async fn write_table(&self, data: &Table, table: &TableRef, mode: WriteMode) -> Result<u64>;

	async fn count(&self, table: &TableRef) -> Result<u64>;

	async fn truncate(&self, table: &TableRef) -> Result<()>;

	/// Append every row of `source` to `destination`.
	async fn copy_table(&self, source: &TableRef, destination: &TableRef) -> Result<u64> {
		let data = self.read_table(source, None).await?;
		self.write_table(&data, destination, WriteMode::Append).await
	}
}

/// Columnar file storage used as the staging checkpoint.
#[async_trait]
pub trait StagingStore: Send + Sync {
	/// Fully-qualified location of `path`, e.g. `s3://bucket/prefix/`.
	fn uri(&self, path: &str) -> String;

	async fn write_columnar(&self, data: &Table, path: &str, mode: WriteMode) -> Result<()>;

	async fn read_columnar(&self, path: &str) -> Result<Table>;

	async fn exists(&self, path: &str) -> Result<bool>;

	async fn delete(&self, path: &str) -> Result<()>;
}

/// Message delivery to a list of recipients.
#[async_trait]
pub trait Notifier: Send + Sync {
	async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn qualified_names() {
		assert_eq!(TableRef::new("jcap", "jcap_pa").qualified(), "jcap.jcap_pa");
		assert_eq!(TableRef::unqualified("jcap_pa").to_string(), "jcap_pa");
	}
}
