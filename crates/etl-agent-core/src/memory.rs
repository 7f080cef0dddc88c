// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory collaborators for tests.
//!
//! [`MemoryWarehouse`] records every call and can be told to fail an
//! operation, drop rows on write, or silently discard writes, which is
//! enough to drive every branch of the production workflow without a
//! database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::connector::{Notifier, StagingStore, TableRef, Warehouse, WriteMode};
use crate::error::{EtlError, Result};
use crate::table::Table;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Warehouse operations, for call assertions and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarehouseOp {
	Read,
	Query,
	Write,
	Count,
	Truncate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseCall {
	pub op: WarehouseOp,
	/// Qualified table name; `None` for queries.
	pub table: Option<String>,
}

type ErrorFactory = Arc<dyn Fn() -> EtlError + Send + Sync>;

struct InjectedFailure {
	op: WarehouseOp,
	table: Option<String>,
	/// Matching calls that still succeed before this one starts failing.
	skip: usize,
	/// `None` fails forever.
	remaining: Option<usize>,
	error: ErrorFactory,
}

impl InjectedFailure {
	fn matches(&self, op: WarehouseOp, table: &Option<String>) -> bool {
		self.op == op && (self.table.is_none() || self.table == *table)
	}
}

#[derive(Default)]
struct WarehouseState {
	tables: HashMap<String, Table>,
	query_result: Option<Table>,
	calls: Vec<WarehouseCall>,
	failures: Vec<InjectedFailure>,
	dropped_rows: HashMap<String, u64>,
	discarded: Vec<String>,
}

#[derive(Clone)]
pub struct MemoryWarehouse {
	name: String,
	state: Arc<Mutex<WarehouseState>>,
}

impl MemoryWarehouse {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			state: Arc::new(Mutex::new(WarehouseState::default())),
		}
	}

	pub fn with_table(self, table: &TableRef, data: Table) -> Self {
		self.insert_table(table, data);
		self
	}

	pub fn insert_table(&self, table: &TableRef, data: Table) {
		lock(&self.state).tables.insert(table.qualified(), data);
	}

	/// Result returned by every `execute_query`.
	pub fn set_query_result(&self, data: Table) {
		lock(&self.state).query_result = Some(data);
	}

	/// Fail `op` (on `table` only, when given) with the error built by `error`.
	pub fn fail_on<F>(&self, op: WarehouseOp, table: Option<&TableRef>, error: F)
	where
		F: Fn() -> EtlError + Send + Sync + 'static,
	{
		lock(&self.state).failures.push(InjectedFailure {
			op,
			table: table.map(TableRef::qualified),
			skip: 0,
			remaining: None,
			error: Arc::new(error),
		});
	}

	/// Fail only the `nth` (1-based) matching call of `op`; earlier and later
	/// calls go through.
	pub fn fail_nth<F>(&self, op: WarehouseOp, table: Option<&TableRef>, nth: usize, error: F)
	where
		F: Fn() -> EtlError + Send + Sync + 'static,
	{
		lock(&self.state).failures.push(InjectedFailure {
			op,
			table: table.map(TableRef::qualified),
			skip: nth.saturating_sub(1),
			remaining: Some(1),
			error: Arc::new(error),
		});
	}

	/// Every write to `table` persists `rows` fewer rows than it reports.
	pub fn drop_rows_on_write(&self, table: &TableRef, rows: u64) {
		lock(&self.state).dropped_rows.insert(table.qualified(), rows);
	}

	/// Writes to `table` report success but persist nothing.
	pub fn discard_writes_to(&self, table: &TableRef) {
		lock(&self.state).discarded.push(table.qualified());
	}

	pub fn table(&self, table: &TableRef) -> Option<Table> {
		lock(&self.state).tables.get(&table.qualified()).cloned()
	}

	pub fn calls(&self) -> Vec<WarehouseCall> {
		lock(&self.state).calls.clone()
	}

	pub fn call_count(&self, op: WarehouseOp) -> usize {
		lock(&self.state).calls.iter().filter(|c| c.op == op).count()
	}

	pub fn calls_on(&self, op: WarehouseOp, table: &TableRef) -> usize {
		let name = table.qualified();
		lock(&self.state)
			.calls
			.iter()
			.filter(|c| c.op == op && c.table.as_deref() == Some(name.as_str()))
			.count()
	}

	fn enter(&self, op: WarehouseOp, table: Option<&TableRef>) -> Result<MutexGuard<'_, WarehouseState>> {
		let mut state = lock(&self.state);
		let qualified = table.map(TableRef::qualified);
		state.calls.push(WarehouseCall {
			op,
			table: qualified.clone(),
		});
		let mut injected = None;
		for failure in state.failures.iter_mut() {
			if !failure.matches(op, &qualified) {
				continue;
			}
			if failure.skip > 0 {
				failure.skip -= 1;
				continue;
			}
			match &mut failure.remaining {
				Some(0) => continue,
				Some(left) => *left -= 1,
				None => {}
			}
			injected = Some(Arc::clone(&failure.error));
			break;
		}
		if let Some(error) = injected {
			return Err(error());
		}
		Ok(state)
	}
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
	fn name(&self) -> &str {
		&self.name
	}

	async fn read_table(&self, table: &TableRef, limit: Option<u64>) -> Result<Table> {
		let state = self.enter(WarehouseOp::Read, Some(table))?;
		let data = state
			.tables
			.get(&table.qualified())
			.cloned()
			.ok_or_else(|| EtlError::Query(format!("relation \"{table}\" does not exist")))?;
		Ok(match limit {
			Some(limit) => data.limit(limit),
			None => data,
		})
	}

	async fn execute_query(&self, _sql: &str) -> Result<Table> {
		let state = self.enter(WarehouseOp::Query, None)?;
		state
			.query_result
			.clone()
			.ok_or_else(|| EtlError::Query("no query result configured".to_string()))
	}

	async fn write_table(&self, data: &Table, table: &TableRef, mode: WriteMode) -> Result<u64> {
		let mut state = self.enter(WarehouseOp::Write, Some(table))?;
		let key = table.qualified();
		let written = data.row_count();
		if state.discarded.contains(&key) {
			return Ok(written);
		}

		let dropped = state.dropped_rows.get(&key).copied().unwrap_or(0);
		let keep = written.saturating_sub(dropped);
		let incoming = data.clone().limit(keep);

		let existing = state.tables.entry(key).or_default();
		if mode == WriteMode::Overwrite || existing.columns().is_empty() {
			*existing = incoming;
		} else {
			existing.append(incoming)?;
		}
		Ok(written)
	}

	async fn count(&self, table: &TableRef) -> Result<u64> {
		let state = self.enter(WarehouseOp::Count, Some(table))?;
		Ok(state
			.tables
			.get(&table.qualified())
			.map(Table::row_count)
			.unwrap_or(0))
	}

	async fn truncate(&self, table: &TableRef) -> Result<()> {
		let mut state = self.enter(WarehouseOp::Truncate, Some(table))?;
		let key = table.qualified();
		let emptied = state.tables.get(&key).map(Table::empty_like).unwrap_or_default();
		state.tables.insert(key, emptied);
		Ok(())
	}
}

#[derive(Default)]
struct StagingState {
	objects: HashMap<String, Table>,
	deletes: usize,
	fail_writes: Option<String>,
}

/// Staging store keeping written tables in a map keyed by path.
#[derive(Clone, Default)]
pub struct MemoryStagingStore {
	state: Arc<Mutex<StagingState>>,
}

impl MemoryStagingStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn fail_writes(&self, message: impl Into<String>) {
		lock(&self.state).fail_writes = Some(message.into());
	}

	pub fn object(&self, path: &str) -> Option<Table> {
		lock(&self.state).objects.get(path).cloned()
	}

	pub fn delete_count(&self) -> usize {
		lock(&self.state).deletes
	}

	pub fn object_count(&self) -> usize {
		lock(&self.state).objects.len()
	}
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
	fn uri(&self, path: &str) -> String {
		format!("memory://staging/{path}")
	}

	async fn write_columnar(&self, data: &Table, path: &str, mode: WriteMode) -> Result<()> {
		let mut state = lock(&self.state);
		if let Some(message) = &state.fail_writes {
			return Err(EtlError::Storage(message.clone()));
		}
		let existing = state.objects.entry(path.to_string()).or_default();
		if mode == WriteMode::Overwrite || existing.columns().is_empty() {
			*existing = data.clone();
		} else {
			existing.append(data.clone())?;
		}
		Ok(())
	}

	async fn read_columnar(&self, path: &str) -> Result<Table> {
		lock(&self.state)
			.objects
			.get(path)
			.cloned()
			.ok_or_else(|| EtlError::Storage(format!("no object at {path}")))
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		Ok(lock(&self.state).objects.keys().any(|k| k.starts_with(path)))
	}

	async fn delete(&self, path: &str) -> Result<()> {
		let mut state = lock(&self.state);
		state.deletes += 1;
		state.objects.retain(|k, _| !k.starts_with(path));
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
	pub recipients: Vec<String>,
	pub subject: String,
	pub body: String,
}

#[derive(Default)]
struct NotifierState {
	sent: Vec<SentMessage>,
	failing: bool,
}

/// Notifier that records messages instead of delivering them.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
	state: Arc<Mutex<NotifierState>>,
}

impl RecordingNotifier {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every subsequent send fails (and is not recorded).
	pub fn set_failing(&self, failing: bool) {
		lock(&self.state).failing = failing;
	}

	pub fn sent(&self) -> Vec<SentMessage> {
		lock(&self.state).sent.clone()
	}

	pub fn subjects(&self) -> Vec<String> {
		lock(&self.state)
			.sent
			.iter()
			.map(|m| m.subject.clone())
			.collect()
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()> {
		let mut state = lock(&self.state);
		if state.failing {
			return Err(EtlError::Notification("smtp relay unavailable".to_string()));
		}
		state.sent.push(SentMessage {
			recipients: recipients.to_vec(),
			subject: subject.to_string(),
			body: body.to_string(),
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::table::Value;

	fn rows(n: i64) -> Table {
		Table::from_rows(
			vec!["id".into()],
			(0..n).map(|i| vec![Value::Int(i)]).collect(),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn write_append_count_truncate() {
		let wh = MemoryWarehouse::new("test");
		let t = TableRef::new("s", "t");
		wh.write_table(&rows(3), &t, WriteMode::Append).await.unwrap();
		wh.write_table(&rows(2), &t, WriteMode::Append).await.unwrap();
		assert_eq!(wh.count(&t).await.unwrap(), 5);
		wh.truncate(&t).await.unwrap();
		assert_eq!(wh.count(&t).await.unwrap(), 0);
		assert_eq!(wh.calls_on(WarehouseOp::Truncate, &t), 1);
	}

	#[tokio::test]
	async fn dropped_rows_and_discarded_writes() {
		let wh = MemoryWarehouse::new("test");
		let lossy = TableRef::new("s", "lossy");
		let void = TableRef::new("s", "void");
		wh.drop_rows_on_write(&lossy, 2);
		wh.discard_writes_to(&void);

		assert_eq!(wh.write_table(&rows(10), &lossy, WriteMode::Append).await.unwrap(), 10);
		assert_eq!(wh.count(&lossy).await.unwrap(), 8);
		assert_eq!(wh.write_table(&rows(10), &void, WriteMode::Append).await.unwrap(), 10);
		assert_eq!(wh.count(&void).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn injected_failure_targets_table() {
		let wh = MemoryWarehouse::new("test");
		let a = TableRef::new("s", "a");
		let b = TableRef::new("s", "b");
		wh.fail_on(WarehouseOp::Count, Some(&a), || EtlError::connectivity("test", "refused"));
		assert!(wh.count(&a).await.is_err());
		assert_eq!(wh.count(&b).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn nth_failure_fails_once() {
		let wh = MemoryWarehouse::new("test");
		let a = TableRef::new("s", "a");
		wh.fail_nth(WarehouseOp::Count, Some(&a), 2, || EtlError::Query("timeout".to_string()));
		assert!(wh.count(&a).await.is_ok());
		assert!(wh.count(&a).await.is_err());
		assert!(wh.count(&a).await.is_ok());
		assert_eq!(wh.calls_on(WarehouseOp::Count, &a), 3);
	}

	#[tokio::test]
	async fn staging_delete_is_prefix_based() {
		let store = MemoryStagingStore::new();
		store
			.write_columnar(&rows(1), "prefix/part-00000.parquet", WriteMode::Overwrite)
			.await
			.unwrap();
		assert!(store.exists("prefix/").await.unwrap());
		store.delete("prefix/").await.unwrap();
		assert!(!store.exists("prefix/").await.unwrap());
	}

	#[tokio::test]
	async fn failing_notifier_records_nothing() {
		let notifier = RecordingNotifier::new();
		notifier.set_failing(true);
		assert!(notifier.send(&["a@b.c".into()], "s", "b").await.is_err());
		assert!(notifier.sent().is_empty());
	}
}
