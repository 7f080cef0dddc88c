// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Row-oriented in-memory table exchanged between the warehouse, the
//! transform step and the staging store.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	Date(NaiveDate),
	Timestamp(NaiveDateTime),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	pub fn text(value: impl Into<String>) -> Self {
		Self::Text(value.into())
	}
}

/// Named columns plus rows of equal width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
	columns: Vec<String>,
	rows: Vec<Vec<Value>>,
}

impl Table {
	pub fn new(columns: Vec<String>) -> Self {
		Self {
			columns,
			rows: Vec::new(),
		}
	}

	/// Build a table, rejecting rows whose width differs from the header.
	pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
		let mut table = Self::new(columns);
		for row in rows {
			table.push_row(row)?;
		}
		Ok(table)
	}

	pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
		if row.len() != self.columns.len() {
			return Err(EtlError::Transform(format!(
				"row has {} values but table has {} columns",
				row.len(),
				self.columns.len()
			)));
		}
		self.rows.push(row);
		Ok(())
	}

	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn rows(&self) -> &[Vec<Value>] {
		&self.rows
	}

	pub fn into_rows(self) -> Vec<Vec<Value>> {
		self.rows
	}

	pub fn row_count(&self) -> u64 {
		self.rows.len() as u64
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|c| c == name)
	}

	pub fn has_column(&self, name: &str) -> bool {
		self.column_index(name).is_some()
	}

	/// Values of one column, top to bottom.
	pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
		let idx = self.column_index(name)?;
		Some(self.rows.iter().map(move |row| &row[idx]))
	}

	/// Same columns, no rows.
	pub fn empty_like(&self) -> Self {
		Self::new(self.columns.clone())
	}

	/// Keep at most `limit` rows.
	pub fn limit(mut self, limit: u64) -> Self {
		self.rows.truncate(limit as usize);
		self
	}

	/// Set `name` to `value` on every row, adding the column if absent.
	pub fn with_literal_column(mut self, name: &str, value: Value) -> Self {
		match self.column_index(name) {
			Some(idx) => {
				for row in &mut self.rows {
					row[idx] = value.clone();
				}
			}
			None => {
				self.columns.push(name.to_string());
				for row in &mut self.rows {
					row.push(value.clone());
				}
			}
		}
		self
	}

	/// Project onto `columns`, in that order.
	pub fn select(&self, columns: &[&str]) -> Result<Self> {
		let indices = columns
			.iter()
			.map(|name| {
				self.column_index(name).ok_or_else(|| {
					EtlError::Transform(format!(
						"column '{name}' not found (available: {})",
						self.columns.join(", ")
					))
				})
			})
			.collect::<Result<Vec<_>>>()?;

		let rows = self
			.rows
			.iter()
			.map(|row| indices.iter().map(|&i| row[i].clone()).collect())
			.collect();

		Ok(Self {
			columns: columns.iter().map(|c| c.to_string()).collect(),
			rows,
		})
	}

	/// Rename a column; returns `false` when `from` does not exist.
	pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
		match self.column_index(from) {
			Some(idx) => {
				self.columns[idx] = to.to_string();
				true
			}
			None => false,
		}
	}

	/// Replace every value of `name` with `f(value)`.
	pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
	where
		F: FnMut(&Value) -> Value,
	{
		let idx = self
			.column_index(name)
			.ok_or_else(|| EtlError::Transform(format!("column '{name}' not found")))?;
		for row in &mut self.rows {
			row[idx] = f(&row[idx]);
		}
		Ok(())
	}

	/// Append all rows of `other`; columns must match by name and order.
	pub fn append(&mut self, other: Table) -> Result<()> {
		if self.columns != other.columns {
			return Err(EtlError::Transform(format!(
				"cannot append table with columns [{}] to [{}]",
				other.columns.join(", "),
				self.columns.join(", ")
			)));
		}
		self.rows.extend(other.rows);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Table {
		Table::from_rows(
			vec!["product".into(), "ac_number".into(), "extra".into()],
			vec![
				vec![Value::text("OPSUMIT"), Value::Int(1), Value::Null],
				vec![Value::text("UPTRAVI"), Value::Int(2), Value::Bool(true)],
			],
		)
		.unwrap()
	}

	#[test]
	fn from_rows_rejects_ragged_rows() {
		let err = Table::from_rows(vec!["a".into()], vec![vec![Value::Null, Value::Null]]).unwrap_err();
		assert!(matches!(err, EtlError::Transform(_)));
	}

	#[test]
	fn literal_column_is_appended() {
		let table = sample().with_literal_column("load_date", Value::text("2025-05-20"));
		assert_eq!(table.columns().last().unwrap(), "load_date");
		assert!(table
			.column_values("load_date")
			.unwrap()
			.all(|v| v == &Value::text("2025-05-20")));
	}

	#[test]
	fn literal_column_overwrites_existing() {
		let table = sample().with_literal_column("extra", Value::Int(7));
		assert_eq!(table.columns().len(), 3);
		assert!(table.column_values("extra").unwrap().all(|v| v == &Value::Int(7)));
	}

	#[test]
	fn select_reorders_and_projects() {
		let table = sample().select(&["ac_number", "product"]).unwrap();
		assert_eq!(table.columns(), &["ac_number".to_string(), "product".to_string()]);
		assert_eq!(table.rows()[1], vec![Value::Int(2), Value::text("UPTRAVI")]);
	}

	#[test]
	fn select_missing_column_is_transform_error() {
		let err = sample().select(&["referral_date"]).unwrap_err();
		assert!(err.to_string().contains("referral_date"));
	}

	#[test]
	fn rename_reports_missing_source() {
		let mut table = sample();
		assert!(table.rename_column("product", "drug"));
		assert!(!table.rename_column("product", "drug"));
		assert!(table.has_column("drug"));
	}

	#[test]
	fn map_column_keeps_row_count() {
		let mut table = sample();
		table.map_column("extra", |_| Value::Null).unwrap();
		assert_eq!(table.row_count(), 2);
		assert!(table.column_values("extra").unwrap().all(Value::is_null));
	}

	#[test]
	fn limit_truncates() {
		assert_eq!(sample().limit(1).row_count(), 1);
		assert_eq!(sample().limit(10).row_count(), 2);
	}

	#[test]
	fn append_requires_same_columns() {
		let mut table = sample();
		table.append(sample()).unwrap();
		assert_eq!(table.row_count(), 4);
		assert!(table.append(Table::new(vec!["other".into()])).is_err());
	}
}
