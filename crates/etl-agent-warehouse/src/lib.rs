// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warehouse connector over the PostgreSQL wire protocol.
//!
//! [`PgWarehouse`] implements [`Warehouse`] with `sqlx`. It targets
//! Redshift-compatible clusters: plain `SELECT`/`TRUNCATE`/`COUNT(*)` and
//! batched multi-row `INSERT`s, with every identifier double-quoted.

mod decode;
pub mod pool;

use async_trait::async_trait;
use etl_agent_config::WarehouseConfig;
use etl_agent_core::{EtlError, Result, Table, TableRef, Value, Warehouse, WriteMode};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{Column, Executor, QueryBuilder, Row};
use tracing::{debug, instrument};

pub use pool::{connect_options, create_lazy_pool};

/// Postgres allows at most this many bind parameters per statement.
const MAX_BIND_PARAMS: usize = 65_535;
const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `"schema"."table"`, or `"table"`.
pub fn quote_table(table: &TableRef) -> String {
	match &table.schema {
		Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(&table.name)),
		None => quote_ident(&table.name),
	}
}

/// Rows per INSERT for a table of `columns` columns.
pub fn rows_per_insert(columns: usize) -> usize {
	if columns == 0 {
		return MAX_ROWS_PER_INSERT;
	}
	(MAX_BIND_PARAMS / columns).clamp(1, MAX_ROWS_PER_INSERT)
}

fn map_sqlx_error(target: &str, error: sqlx::Error) -> EtlError {
	match error {
		sqlx::Error::Io(_)
		| sqlx::Error::Tls(_)
		| sqlx::Error::PoolTimedOut
		| sqlx::Error::PoolClosed
		| sqlx::Error::Configuration(_) => EtlError::connectivity(target, error),
		other => EtlError::Query(format!("{target}: {other}")),
	}
}

pub struct PgWarehouse {
	name: String,
	pool: PgPool,
}

impl PgWarehouse {
	pub fn new(name: impl Into<String>, pool: PgPool) -> Self {
		Self {
			name: name.into(),
			pool,
		}
	}

	/// Build from a configuration section without connecting.
	pub fn connect_lazy(name: impl Into<String>, config: &WarehouseConfig) -> Result<Self> {
		Ok(Self::new(name, create_lazy_pool(config)?))
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}

	async fn fetch_table(&self, sql: &str) -> Result<Table> {
		let rows = sqlx::query(sql)
			.fetch_all(&self.pool)
			.await
			.map_err(|e| map_sqlx_error(&self.name, e))?;

		let columns = if rows.is_empty() {
			let described = (&self.pool)
				.describe(sql)
				.await
				.map_err(|e| map_sqlx_error(&self.name, e))?;
			described.columns().iter().map(|c| c.name().to_string()).collect()
		} else {
			Vec::new()
		};

		decode::rows_to_table(&rows, columns)
	}
}

#[async_trait]
impl Warehouse for PgWarehouse {
	fn name(&self) -> &str {
		&self.name
	}

	#[instrument(skip(self), fields(warehouse = %self.name, table = %table))]
	async fn read_table(&self, table: &TableRef, limit: Option<u64>) -> Result<Table> {
		let mut sql = format!("SELECT * FROM {}", quote_table(table));
		if let Some(limit) = limit {
			sql.push_str(&format!(" LIMIT {limit}"));
		}
		let data = self.fetch_table(&sql).await?;
		debug!(rows = data.row_count(), "table read");
		Ok(data)
	}

	#[instrument(skip(self, sql), fields(warehouse = %self.name))]
	async fn execute_query(&self, sql: &str) -> Result<Table> {
		let data = self.fetch_table(sql).await?;
		debug!(rows = data.row_count(), "query executed");
		Ok(data)
	}

	#[instrument(skip(self, data), fields(warehouse = %self.name, table = %table, rows = data.row_count()))]
	async fn write_table(&self, data: &Table, table: &TableRef, mode: WriteMode) -> Result<u64> {
		let target = quote_table(table);
		let mut tx = self
			.pool
			.begin()
			.await
			.map_err(|e| map_sqlx_error(&self.name, e))?;

		if mode == WriteMode::Overwrite {
			sqlx::query(&format!("TRUNCATE TABLE {target}"))
				.execute(&mut *tx)
				.await
				.map_err(|e| map_sqlx_error(&self.name, e))?;
		}

		let column_list = data
			.columns()
			.iter()
			.map(|c| quote_ident(c))
			.collect::<Vec<_>>()
			.join(", ");

		let mut written = 0u64;
		for chunk in data.rows().chunks(rows_per_insert(data.columns().len())) {
			let mut builder: QueryBuilder<Postgres> =
				QueryBuilder::new(format!("INSERT INTO {target} ({column_list}) "));
			builder.push_values(chunk, |mut b, row| {
				for value in row {
					match value {
						Value::Null => {
							b.push("NULL");
						}
						Value::Bool(v) => {
							b.push_bind(*v);
						}
						Value::Int(v) => {
							b.push_bind(*v);
						}
						Value::Float(v) => {
							b.push_bind(*v);
						}
						Value::Text(v) => {
							b.push_bind(v.clone());
						}
						Value::Date(v) => {
							b.push_bind(*v);
						}
						Value::Timestamp(v) => {
							b.push_bind(*v);
						}
					}
				}
			});
			let result = builder
				.build()
				.execute(&mut *tx)
				.await
				.map_err(|e| map_sqlx_error(&self.name, e))?;
			written += result.rows_affected();
		}

		tx.commit().await.map_err(|e| map_sqlx_error(&self.name, e))?;
		debug!(written, "rows written");
		Ok(written)
	}

	#[instrument(skip(self), fields(warehouse = %self.name, table = %table))]
	async fn count(&self, table: &TableRef) -> Result<u64> {
		let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM {}", quote_table(table)))
			.fetch_one(&self.pool)
			.await
			.map_err(|e| map_sqlx_error(&self.name, e))?;
		let count: i64 = row
			.try_get("cnt")
			.map_err(|e| map_sqlx_error(&self.name, e))?;
		Ok(count.max(0) as u64)
	}

	#[instrument(skip(self), fields(warehouse = %self.name, table = %table))]
	async fn truncate(&self, table: &TableRef) -> Result<()> {
		sqlx::query(&format!("TRUNCATE TABLE {}", quote_table(table)))
			.execute(&self.pool)
			.await
			.map_err(|e| map_sqlx_error(&self.name, e))?;
		debug!("table truncated");
		Ok(())
	}
}
