// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod common;

use std::time::Duration;

use common::*;
use etl_agent_core::memory::WarehouseOp;
use etl_agent_core::JobConfig;
use etl_agent_jobs::{CancellationToken, Supervisor, SupervisorState};

#[tokio::test(start_paused = true)]
async fn test_three_failing_runs_then_shutdown() {
	// The dev warehouse has no source view, so every simple run fails.
	let harness = Harness::new();
	let token = CancellationToken::new();
	let mut supervisor = Supervisor::new(harness.dispatcher(), Duration::from_secs(30), token.clone());

	let dev = harness.dev.clone();
	let handle = tokio::spawn(async move {
		let summary = supervisor.run(&JobConfig::new("nightly")).await;
		(summary, supervisor.state())
	});

	// Runs at t=0, 30 and 60; shutdown requested while waiting for the fourth.
	tokio::time::sleep(Duration::from_secs(75)).await;
	token.cancel();
	let (summary, state) = handle.await.unwrap();

	assert_eq!(state, SupervisorState::Stopped);
	assert_eq!(dev.call_count(WarehouseOp::Read), 3);
	assert_eq!(summary.statistics.total_runs, 3);
	assert_eq!(summary.statistics.failed_runs, 3);
	assert_eq!(summary.statistics.total_rows_processed, 0);
	assert_eq!(summary.success_rate, 0.0);
	assert!(!summary.meets(50.0));
	assert!(summary.elapsed <= Duration::from_secs(76));
}

#[tokio::test(start_paused = true)]
async fn test_successful_runs_accumulate_rows() {
	let harness = Harness::new();
	harness.dev.insert_table(
		&etl_agent_core::TableRef::new("dna_actln_dwh", "vw_patients_opsumit_cap"),
		etl_agent_core::Table::from_rows(
			vec!["product".into(), "ac_number".into(), "referral_date".into()],
			(0..4)
				.map(|i| {
					vec![
						etl_agent_core::Value::text("UPTRAVI"),
						etl_agent_core::Value::Int(i),
						etl_agent_core::Value::Null,
					]
				})
				.collect(),
		)
		.unwrap(),
	);
	let token = CancellationToken::new();
	let mut supervisor = Supervisor::new(harness.dispatcher(), Duration::from_secs(10), token.clone());

	let handle = tokio::spawn(async move { supervisor.run(&JobConfig::new("dev")).await });
	tokio::time::sleep(Duration::from_secs(15)).await;
	token.cancel();
	let summary = handle.await.unwrap();

	assert_eq!(summary.statistics.total_runs, 2);
	assert_eq!(summary.statistics.successful_runs, 2);
	assert_eq!(summary.statistics.total_rows_processed, 8);
	assert_eq!(summary.success_rate, 100.0);
	assert!(summary.meets(50.0));
}
