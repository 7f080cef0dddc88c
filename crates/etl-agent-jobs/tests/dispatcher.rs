// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use common::*;
use etl_agent_config::{keys, AgentConfig, SimpleConfig};
use etl_agent_core::{ErrorKind, JobConfig, JobDetails, JobStatus, TableRef};
use etl_agent_jobs::{required_settings, Collaborators, JobDispatcher};

fn simple_source() -> TableRef {
	let config = SimpleConfig::default();
	TableRef::new(config.source_schema, config.source_table)
}

fn simple_destination() -> TableRef {
	let config = SimpleConfig::default();
	TableRef::new(config.destination_schema, config.destination_table)
}

fn simple_harness(rows: usize) -> Harness {
	let harness = Harness::new();
	let source = extract_rows(rows);
	let renamed = etl_agent_core::Table::from_rows(
		vec!["product".into(), "ac_number".into(), "referral_date".into()],
		source
			.rows()
			.iter()
			.map(|row| vec![row[2].clone(), row[1].clone(), row[5].clone()])
			.collect(),
	)
	.unwrap();
	harness.dev.insert_table(&simple_source(), renamed);
	harness
}

fn assert_untouched(harness: &Harness) {
	assert!(harness.source.calls().is_empty());
	assert!(harness.destination.calls().is_empty());
	assert!(harness.dev.calls().is_empty());
	assert_eq!(harness.staging.object_count(), 0);
	assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unsupported_type_fails_before_any_side_effect() {
	let harness = Harness::production(1000, 1000);
	let result = harness
		.dispatcher()
		.dispatch(&JobConfig::new("x").with_type("spark_etl"))
		.await;

	assert_eq!(result.status, JobStatus::Failed);
	assert_eq!(result.job_type, "spark_etl");
	assert_eq!(result.error_kind, Some(ErrorKind::UnsupportedJobType));
	assert_eq!(
		result.error.as_deref(),
		Some("unsupported job type 'spark_etl' (supported: simple_etl, production_etl)")
	);
	assert!(result.details.is_none());
	assert_untouched(&harness);
}

#[tokio::test]
async fn test_missing_settings_are_all_listed() {
	let harness = Harness::production(1000, 1000);
	let result = harness
		.dispatcher_with(AgentConfig::default())
		.dispatch(&JobConfig::new("p").with_type("production_etl"))
		.await;

	assert_eq!(result.error_kind, Some(ErrorKind::ConfigurationError));
	let error = result.error.unwrap();
	for key in required_settings(etl_agent_core::JobType::ProductionEtl) {
		assert!(error.contains(key), "{key} not in {error}");
	}
	assert_untouched(&harness);
}

#[tokio::test]
async fn test_blank_password_counts_as_missing() {
	let harness = simple_harness(5);
	let mut config = complete_config();
	config.dev_warehouse.password = Some(etl_common_config::SecretString::new("  ".to_string()));

	let result = harness.dispatcher_with(config).dispatch(&JobConfig::new("s")).await;

	assert_eq!(
		result.error.as_deref(),
		Some(format!("missing required configuration: {}", keys::DEV_WAREHOUSE_PASSWORD).as_str())
	);
	assert!(harness.dev.calls().is_empty());
}

#[tokio::test]
async fn test_simple_job_only_needs_dev_settings() {
	let harness = simple_harness(25);
	let mut config = AgentConfig::default();
	config.dev_warehouse = complete_config().dev_warehouse;

	let result = harness
		.dispatcher_with(config)
		.dispatch(&JobConfig::new("s").with_limit(7))
		.await;

	assert!(result.is_success(), "{:?}", result.error);
	assert_eq!(result.job_type, "simple_etl");
	assert_eq!(result.job_name, "job-s");
	assert_eq!(result.rows_processed, 7);
	match result.details {
		Some(JobDetails::Simple(details)) => assert_eq!(details.load_date, "2025-05-20"),
		other => panic!("unexpected details: {other:?}"),
	}
}

#[tokio::test]
async fn test_simple_job_appends_on_every_run() {
	let harness = simple_harness(25);
	let dispatcher = harness.dispatcher();
	let job = JobConfig::new("s").with_load_date("2025-06-01");

	let first = dispatcher.dispatch(&job).await;
	let second = dispatcher.dispatch(&job).await;

	assert_eq!(first.rows_processed, 10);
	assert_eq!(second.rows_processed, 10);
	let written = harness.dev.table(&simple_destination()).unwrap();
	assert_eq!(written.row_count(), 20);
	assert!(written
		.column_values("load_date")
		.unwrap()
		.all(|v| v == &etl_agent_core::Value::text("2025-06-01")));
}

#[tokio::test]
async fn test_invalid_load_date_is_configuration_error() {
	let harness = simple_harness(5);
	let result = harness
		.dispatcher()
		.dispatch(&JobConfig::new("s").with_load_date("20/05/2025"))
		.await;

	assert_eq!(result.error_kind, Some(ErrorKind::ConfigurationError));
	assert!(harness.dev.calls().is_empty());
}

#[tokio::test]
async fn test_unavailable_collaborator_is_reported() {
	let dispatcher = JobDispatcher::new(complete_config(), Collaborators::default()).with_today(today);

	let result = dispatcher.dispatch(&JobConfig::new("s")).await;

	assert_eq!(result.error_kind, Some(ErrorKind::ConfigurationError));
	assert!(result.error.unwrap().contains("dev warehouse is not available"));
}

#[tokio::test]
async fn test_result_serializes_flat() {
	let harness = Harness::production(10, 10);
	let result = harness
		.dispatcher()
		.dispatch(&JobConfig::new("p").with_name(JOB_NAME).with_type("production_etl"))
		.await;

	let json = serde_json::to_value(&result).unwrap();
	assert_eq!(json["status"], "Success");
	assert_eq!(json["job_type"], "production_etl");
	assert_eq!(json["load_date"], "2025-05-20");
	assert_eq!(json["previous_count"], 10);
	assert_eq!(json["current_count"], 10);
	assert!(json.get("error").is_none());
}
