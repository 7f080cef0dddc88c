// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column-level transform applied to extracted rows.
//!
//! Every input row yields exactly one output row.

use chrono::{NaiveDate, NaiveTime};
use etl_agent_core::{EtlError, Result, Table, Value};
use tracing::{debug, warn};

/// Textual format of dates in the extract (`MM-dd-yyyy`).
pub const SOURCE_DATE_FORMAT: &str = "%m-%d-%Y";

pub const DATE_COLUMNS: [&str; 4] = [
	"load_date",
	"PA_CompletedDate",
	"PA_InitiatedDate",
	"JCAP_table_loaddate",
];

pub const RENAMES: [(&str, &str); 9] = [
	("DrugorTherapy", "drugortherapy"),
	("PADisposition", "padisposition"),
	("AppealDisposition", "appealdisposition"),
	("FEREquired", "ferequired"),
	("rx_PlanName", "rx_planname"),
	("rx_PayerName", "rx_payername"),
	("rx_PayerType", "rx_payertype"),
	("LHM_Name", "lhm_name"),
	("REFERRING_HCP_PATH_STATE", "referring_hcp_path_state"),
];

/// Convert one cell to a timestamp. `None` means the value could not be
/// interpreted and becomes null.
fn to_timestamp(value: &Value) -> Option<Value> {
	match value {
		Value::Null => Some(Value::Null),
		Value::Timestamp(_) => Some(value.clone()),
		Value::Date(date) => Some(Value::Timestamp(date.and_time(NaiveTime::MIN))),
		Value::Text(text) => NaiveDate::parse_from_str(text.trim(), SOURCE_DATE_FORMAT)
			.ok()
			.map(|date| Value::Timestamp(date.and_time(NaiveTime::MIN))),
		Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
	}
}

/// Parse the date columns into timestamps and lower-case the renamed columns.
///
/// A missing date column is an error; a missing rename source is skipped.
pub fn transform(mut data: Table) -> Result<Table> {
	let rows_in = data.row_count();

	for column in DATE_COLUMNS {
		if !data.has_column(column) {
			return Err(EtlError::Transform(format!(
				"date column '{column}' missing from extract"
			)));
		}

		let mut unparsed = 0usize;
		data.map_column(column, |value| {
			to_timestamp(value).unwrap_or_else(|| {
				unparsed += 1;
				Value::Null
			})
		})?;
		if unparsed > 0 {
			warn!(column, unparsed, "values not in {SOURCE_DATE_FORMAT} format set to null");
		}
	}

	for (from, to) in RENAMES {
		if !data.rename_column(from, to) {
			debug!(column = from, "rename source not present");
		}
	}

	if data.row_count() != rows_in {
		return Err(EtlError::Transform(format!(
			"transform changed row count from {rows_in} to {}",
			data.row_count()
		)));
	}
	Ok(data)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDateTime;

	fn midnight(y: i32, m: u32, d: u32) -> Value {
		Value::Timestamp(NaiveDateTime::new(
			NaiveDate::from_ymd_opt(y, m, d).unwrap(),
			NaiveTime::MIN,
		))
	}

	fn extract() -> Table {
		Table::from_rows(
			vec![
				"JCAP_table_loaddate".into(),
				"pmc_patid".into(),
				"DrugorTherapy".into(),
				"PA_CompletedDate".into(),
				"PA_InitiatedDate".into(),
				"load_date".into(),
				"LHM_Name".into(),
			],
			vec![
				vec![
					Value::Date(NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()),
					Value::text("1001"),
					Value::text("OPSUMIT"),
					Value::text("01-15-2025"),
					Value::text("2025/01/02"),
					Value::Null,
					Value::text("North"),
				],
				vec![
					Value::Date(NaiveDate::from_ymd_opt(2025, 5, 20).unwrap()),
					Value::text("1002"),
					Value::text("UPTRAVI"),
					Value::Date(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
					Value::text("12-30-2024"),
					Value::text("05-19-2025"),
					Value::Null,
				],
			],
		)
		.unwrap()
	}

	#[test]
	fn test_dates_become_timestamps() {
		let out = transform(extract()).unwrap();
		let completed = out.column_index("PA_CompletedDate").unwrap();
		let initiated = out.column_index("PA_InitiatedDate").unwrap();
		let load_date = out.column_index("load_date").unwrap();

		assert_eq!(out.rows()[0][completed], midnight(2025, 1, 15));
		assert_eq!(out.rows()[1][completed], midnight(2025, 2, 1));
		assert_eq!(out.rows()[1][initiated], midnight(2024, 12, 30));
		assert_eq!(out.rows()[1][load_date], midnight(2025, 5, 19));
		assert_eq!(out.rows()[0][0], midnight(2025, 5, 20));
	}

	#[test]
	fn test_unparseable_text_becomes_null_without_dropping_rows() {
		let out = transform(extract()).unwrap();
		let initiated = out.column_index("PA_InitiatedDate").unwrap();
		assert!(out.rows()[0][initiated].is_null());
		assert_eq!(out.row_count(), 2);
	}

	#[test]
	fn test_present_columns_are_renamed() {
		let out = transform(extract()).unwrap();
		assert!(out.has_column("drugortherapy"));
		assert!(out.has_column("lhm_name"));
		assert!(!out.has_column("DrugorTherapy"));
		// Absent sources are skipped.
		assert!(!out.has_column("padisposition"));
		assert!(out.has_column("pmc_patid"));
	}

	#[test]
	fn test_missing_date_column_is_transform_error() {
		let table = Table::from_rows(vec!["load_date".into()], vec![vec![Value::Null]]).unwrap();
		assert!(matches!(transform(table), Err(EtlError::Transform(_))));
	}
}
