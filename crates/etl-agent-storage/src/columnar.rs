// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`Table`] <-> Arrow <-> Parquet conversion.

use std::sync::Arc;

use arrow::array::{
	Array, ArrayRef, BooleanArray, Date32Array, Float64Array, Int64Array, StringArray,
	TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate};
use etl_agent_core::{EtlError, Result, Table, Value};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn storage_err(context: &str, e: impl std::fmt::Display) -> EtlError {
	EtlError::Storage(format!("{context}: {e}"))
}

/// Arrow type of a column: taken from its first non-null value. Integers
/// widen to floats when both appear; all-null columns become nullable text.
fn infer_type(table: &Table, index: usize) -> Result<DataType> {
	let mut inferred: Option<DataType> = None;
	for row in table.rows() {
		let current = match &row[index] {
			Value::Null => continue,
			Value::Bool(_) => DataType::Boolean,
			Value::Int(_) => DataType::Int64,
			Value::Float(_) => DataType::Float64,
			Value::Text(_) => DataType::Utf8,
			Value::Date(_) => DataType::Date32,
			Value::Timestamp(_) => DataType::Timestamp(TimeUnit::Microsecond, None),
		};
		inferred = match inferred {
			None => Some(current),
			Some(existing) if existing == current => Some(existing),
			Some(DataType::Int64) | Some(DataType::Float64)
				if matches!(current, DataType::Int64 | DataType::Float64) =>
			{
				Some(DataType::Float64)
			}
			Some(existing) => {
				return Err(EtlError::Storage(format!(
					"column '{}' mixes {existing} and {current} values",
					table.columns()[index]
				)))
			}
		};
	}
	Ok(inferred.unwrap_or(DataType::Utf8))
}

fn build_array(table: &Table, index: usize, data_type: &DataType) -> ArrayRef {
	let cells = table.rows().iter().map(|row| &row[index]);
	match data_type {
		DataType::Boolean => Arc::new(
			cells
				.map(|v| match v {
					Value::Bool(b) => Some(*b),
					_ => None,
				})
				.collect::<BooleanArray>(),
		),
		DataType::Int64 => Arc::new(
			cells
				.map(|v| match v {
					Value::Int(i) => Some(*i),
					_ => None,
				})
				.collect::<Int64Array>(),
		),
		DataType::Float64 => Arc::new(
			cells
				.map(|v| match v {
					Value::Float(f) => Some(*f),
					Value::Int(i) => Some(*i as f64),
					_ => None,
				})
				.collect::<Float64Array>(),
		),
		DataType::Date32 => Arc::new(
			cells
				.map(|v| match v {
					Value::Date(d) => Some(d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE),
					_ => None,
				})
				.collect::<Date32Array>(),
		),
		DataType::Timestamp(_, _) => Arc::new(
			cells
				.map(|v| match v {
					Value::Timestamp(ts) => Some(ts.and_utc().timestamp_micros()),
					_ => None,
				})
				.collect::<TimestampMicrosecondArray>(),
		),
		_ => Arc::new(
			cells
				.map(|v| match v {
					Value::Text(s) => Some(s.as_str()),
					_ => None,
				})
				.collect::<StringArray>(),
		),
	}
}

/// Convert a table into a single record batch.
pub fn table_to_batch(table: &Table) -> Result<RecordBatch> {
	let mut fields = Vec::with_capacity(table.columns().len());
	let mut arrays = Vec::with_capacity(table.columns().len());
	for (index, name) in table.columns().iter().enumerate() {
		let data_type = infer_type(table, index)?;
		arrays.push(build_array(table, index, &data_type));
		fields.push(Field::new(name, data_type, true));
	}

	let schema = Arc::new(Schema::new(fields));
	if arrays.is_empty() {
		return Ok(RecordBatch::new_empty(schema));
	}
	RecordBatch::try_new(schema, arrays).map_err(|e| storage_err("building record batch", e))
}

fn cell(array: &dyn Array, row: usize) -> Result<Value> {
	if array.is_null(row) {
		return Ok(Value::Null);
	}
	let any = array.as_any();
	let value = match array.data_type() {
		DataType::Boolean => any
			.downcast_ref::<BooleanArray>()
			.map(|a| Value::Bool(a.value(row))),
		DataType::Int64 => any
			.downcast_ref::<Int64Array>()
			.map(|a| Value::Int(a.value(row))),
		DataType::Float64 => any
			.downcast_ref::<Float64Array>()
			.map(|a| Value::Float(a.value(row))),
		DataType::Utf8 => any
			.downcast_ref::<StringArray>()
			.map(|a| Value::Text(a.value(row).to_string())),
		DataType::Date32 => any.downcast_ref::<Date32Array>().and_then(|a| {
			NaiveDate::from_num_days_from_ce_opt(a.value(row) + UNIX_EPOCH_DAYS_FROM_CE)
				.map(Value::Date)
		}),
		DataType::Timestamp(TimeUnit::Microsecond, _) => any
			.downcast_ref::<TimestampMicrosecondArray>()
			.and_then(|a| DateTime::from_timestamp_micros(a.value(row)))
			.map(|dt| Value::Timestamp(dt.naive_utc())),
		_ => None,
	};
	value.ok_or_else(|| {
		EtlError::Storage(format!(
			"unsupported or corrupt column type {}",
			array.data_type()
		))
	})
}

/// Append every row of `batch` to `table`.
pub fn append_batch(table: &mut Table, batch: &RecordBatch) -> Result<()> {
	for row in 0..batch.num_rows() {
		let values = batch
			.columns()
			.iter()
			.map(|column| cell(column.as_ref(), row))
			.collect::<Result<Vec<_>>>()?;
		table.push_row(values)?;
	}
	Ok(())
}

/// Serialize to an in-memory Parquet file (Snappy).
pub fn encode_parquet(table: &Table) -> Result<Bytes> {
	let batch = table_to_batch(table)?;
	let props = WriterProperties::builder()
		.set_compression(Compression::SNAPPY)
		.build();

	let mut buffer = Vec::with_capacity(64 * 1024);
	{
		let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))
			.map_err(|e| storage_err("creating parquet writer", e))?;
		writer
			.write(&batch)
			.map_err(|e| storage_err("writing parquet", e))?;
		writer
			.close()
			.map_err(|e| storage_err("closing parquet writer", e))?;
	}
	Ok(Bytes::from(buffer))
}

/// Parse an in-memory Parquet file.
pub fn decode_parquet(data: Bytes) -> Result<Table> {
	let builder = ParquetRecordBatchReaderBuilder::try_new(data)
		.map_err(|e| storage_err("reading parquet footer", e))?;
	let columns = builder
		.schema()
		.fields()
		.iter()
		.map(|f| f.name().clone())
		.collect();
	let reader = builder
		.build()
		.map_err(|e| storage_err("opening parquet reader", e))?;

	let mut table = Table::new(columns);
	for batch in reader {
		let batch = batch.map_err(|e| storage_err("reading parquet batch", e))?;
		append_batch(&mut table, &batch)?;
	}
	Ok(table)
}
