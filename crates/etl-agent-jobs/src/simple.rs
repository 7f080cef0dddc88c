// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use etl_agent_config::SimpleConfig;
use etl_agent_core::{
	JobDetails, JobFailure, JobOutput, Result, SimpleEtlDetails, SimpleEtlParams, TableRef, Value,
	Warehouse, WriteMode, DATE_FORMAT,
};
use tracing::{info, instrument};

/// Columns written to the destination, in order.
pub const OUTPUT_COLUMNS: [&str; 4] = ["load_date", "product", "ac_number", "referral_date"];

/// Development job: read a limited slice of the source view, stamp it with
/// the load date and append it to the destination table.
pub struct SimpleEtlJob {
	warehouse: Arc<dyn Warehouse>,
	source: TableRef,
	destination: TableRef,
}

impl SimpleEtlJob {
	pub fn new(warehouse: Arc<dyn Warehouse>, settings: &SimpleConfig) -> Self {
		Self {
			warehouse,
			source: TableRef::new(&settings.source_schema, &settings.source_table),
			destination: TableRef::new(&settings.destination_schema, &settings.destination_table),
		}
	}

	pub fn source_table(&self) -> &TableRef {
		&self.source
	}

	pub fn destination_table(&self) -> &TableRef {
		&self.destination
	}

	#[instrument(skip(self), fields(source = %self.source, destination = %self.destination))]
	pub async fn run(&self, params: SimpleEtlParams) -> std::result::Result<JobOutput, JobFailure> {
		let load_date = params.load_date.format(DATE_FORMAT).to_string();
		let details = JobDetails::Simple(SimpleEtlDetails {
			source_table: self.source.qualified(),
			destination_table: self.destination.qualified(),
			load_date: load_date.clone(),
		});

		match self.execute(&load_date, params.limit).await {
			Ok(rows) => Ok(JobOutput::new(rows).with_details(details)),
			Err(e) => Err(JobFailure::from(e).with_details(details)),
		}
	}

	async fn execute(&self, load_date: &str, limit: u64) -> Result<u64> {
		let data = self.warehouse.read_table(&self.source, Some(limit)).await?;
		info!(rows = data.row_count(), limit, "read source rows");

		let data = data
			.with_literal_column("load_date", Value::text(load_date))
			.select(&OUTPUT_COLUMNS)?;
		let rows = data.row_count();

		self.warehouse
			.write_table(&data, &self.destination, WriteMode::Append)
			.await?;
		info!(rows, "appended rows to destination");
		Ok(rows)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use etl_agent_core::memory::{MemoryWarehouse, WarehouseOp};
	use etl_agent_core::{EtlError, Table};

	fn source_rows(n: i64) -> Table {
		Table::from_rows(
			vec![
				"product".into(),
				"ac_number".into(),
				"referral_date".into(),
				"notes".into(),
			],
			(0..n)
				.map(|i| {
					vec![
						Value::text("OPSUMIT"),
						Value::Int(i),
						Value::Date(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()),
						Value::text("ignored"),
					]
				})
				.collect(),
		)
		.unwrap()
	}

	fn params(limit: u64) -> SimpleEtlParams {
		SimpleEtlParams {
			load_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
			limit,
		}
	}

	fn job(warehouse: &MemoryWarehouse) -> SimpleEtlJob {
		SimpleEtlJob::new(Arc::new(warehouse.clone()), &SimpleConfig::default())
	}

	#[tokio::test]
	async fn test_limits_stamps_and_projects() {
		let config = SimpleConfig::default();
		let warehouse = MemoryWarehouse::new("dev").with_table(
			&TableRef::new(&config.source_schema, &config.source_table),
			source_rows(25),
		);
		let job = job(&warehouse);

		let output = job.run(params(10)).await.unwrap();
		assert_eq!(output.rows_processed, 10);

		let written = warehouse.table(job.destination_table()).unwrap();
		assert_eq!(written.columns(), &OUTPUT_COLUMNS.map(String::from));
		assert_eq!(written.row_count(), 10);
		assert_eq!(written.rows()[0][0], Value::text("2025-05-20"));
		assert_eq!(warehouse.call_count(WarehouseOp::Write), 1);

		match output.details {
			Some(JobDetails::Simple(details)) => {
				assert_eq!(details.source_table, "dna_actln_dwh.vw_patients_opsumit_cap");
				assert_eq!(details.destination_table, "dna_actln_dwh.ControlM_New_test");
				assert_eq!(details.load_date, "2025-05-20");
			}
			other => panic!("unexpected details: {other:?}"),
		}
	}

	#[tokio::test]
	async fn test_missing_column_is_transform_error() {
		let config = SimpleConfig::default();
		let table = Table::from_rows(vec!["product".into()], vec![vec![Value::text("x")]]).unwrap();
		let warehouse = MemoryWarehouse::new("dev")
			.with_table(&TableRef::new(&config.source_schema, &config.source_table), table);

		let failure = job(&warehouse).run(params(10)).await.unwrap_err();
		assert!(matches!(failure.error, EtlError::Transform(_)));
		assert!(failure.details.is_some());
		assert_eq!(warehouse.call_count(WarehouseOp::Write), 0);
	}
}
