// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Conversion between Postgres rows and [`Table`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use etl_agent_core::{EtlError, Result, Table, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

/// Decode one cell by its server-reported type name.
fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> Result<Value> {
	fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>>
	where
		T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
	{
		row.try_get::<Option<T>, _>(index)
			.map_err(|e| EtlError::Query(format!("column {index}: {e}")))
	}

	let value = match type_name {
		"BOOL" => get::<bool>(row, index)?.map(Value::Bool),
		"INT2" => get::<i16>(row, index)?.map(|v| Value::Int(v.into())),
		"INT4" => get::<i32>(row, index)?.map(|v| Value::Int(v.into())),
		"INT8" => get::<i64>(row, index)?.map(Value::Int),
		"FLOAT4" => get::<f32>(row, index)?.map(|v| Value::Float(v.into())),
		"FLOAT8" => get::<f64>(row, index)?.map(Value::Float),
		"TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => get::<String>(row, index)?.map(Value::Text),
		"DATE" => get::<NaiveDate>(row, index)?.map(Value::Date),
		"TIMESTAMP" => get::<NaiveDateTime>(row, index)?.map(Value::Timestamp),
		"TIMESTAMPTZ" => get::<DateTime<Utc>>(row, index)?.map(|v| Value::Timestamp(v.naive_utc())),
		other => {
			return Err(EtlError::Query(format!(
				"column {index} has unsupported type {other}"
			)))
		}
	};
	Ok(value.unwrap_or(Value::Null))
}

/// Convert fetched rows. `columns` is used when there are no rows to read
/// the header from.
pub fn rows_to_table(rows: &[PgRow], columns: Vec<String>) -> Result<Table> {
	let Some(first) = rows.first() else {
		return Ok(Table::new(columns));
	};

	let header: Vec<(String, String)> = first
		.columns()
		.iter()
		.map(|c| (c.name().to_string(), c.type_info().name().to_string()))
		.collect();

	let mut table = Table::new(header.iter().map(|(name, _)| name.clone()).collect());
	for row in rows {
		let values = header
			.iter()
			.enumerate()
			.map(|(index, (_, type_name))| decode_cell(row, index, type_name))
			.collect::<Result<Vec<_>>>()?;
		table.push_row(values)?;
	}
	Ok(table)
}
