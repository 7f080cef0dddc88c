// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Snapshot of the production table taken before it is reloaded.
//!
//! The production table is never truncated unless its current contents are
//! provably preserved in the backup location: [`BackupGuard::protect`] fails
//! with [`EtlError::BackupValidation`] when the copied row count differs.

use etl_agent_core::{EtlError, Result, TableRef, Warehouse};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupReport {
	/// Production row count before the copy; the baseline for variance.
	pub original_count: u64,
	pub backup_count: u64,
	/// `false` when the production table was empty and nothing was copied.
	pub copied: bool,
}

#[derive(Debug, Clone)]
pub struct BackupGuard {
	production: TableRef,
	backup: TableRef,
}

impl BackupGuard {
	pub fn new(production: TableRef, backup: TableRef) -> Self {
		Self { production, backup }
	}

	pub fn production(&self) -> &TableRef {
		&self.production
	}

	pub fn backup(&self) -> &TableRef {
		&self.backup
	}

	/// Replace the backup location with a copy of the production table.
	#[instrument(skip(self, warehouse), fields(production = %self.production, backup = %self.backup))]
	pub async fn protect(&self, warehouse: &dyn Warehouse) -> Result<BackupReport> {
		warehouse.truncate(&self.backup).await?;

		let original_count = warehouse.count(&self.production).await?;
		if original_count == 0 {
			warn!("production table is empty, skipping backup");
			return Ok(BackupReport {
				original_count: 0,
				backup_count: 0,
				copied: false,
			});
		}

		let copied_rows = warehouse.copy_table(&self.production, &self.backup).await?;
		let backup_count = warehouse.count(&self.backup).await?;
		if backup_count != original_count {
			warn!(original_count, backup_count, copied_rows, "backup row count mismatch");
			return Err(EtlError::BackupValidation {
				original: original_count,
				backup: backup_count,
			});
		}

		info!(rows = backup_count, "backup created and validated");
		Ok(BackupReport {
			original_count,
			backup_count,
			copied: true,
		})
	}

	/// Put the backup contents back into the production table.
	///
	/// Fails when the production table does not end up with exactly the
	/// backup's row count.
	#[instrument(skip(self, warehouse), fields(production = %self.production, backup = %self.backup))]
	pub async fn restore(&self, warehouse: &dyn Warehouse) -> Result<u64> {
		warehouse.truncate(&self.production).await?;

		let backup_count = warehouse.count(&self.backup).await?;
		if backup_count > 0 {
			warehouse.copy_table(&self.backup, &self.production).await?;
		}

		let restored = warehouse.count(&self.production).await?;
		if restored != backup_count {
			return Err(EtlError::Internal(format!(
				"restore left {restored} rows in {}, backup holds {backup_count}",
				self.production
			)));
		}

		info!(rows = restored, "production table restored from backup");
		Ok(restored)
	}
}
