// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Continuous mode: run the same job repeatedly until shutdown is requested.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use etl_agent_core::{JobConfig, JobResult, RunStatistics, RunSummary};
use tokio::time::Instant;
use tracing::{error, info, instrument};

use crate::context::CancellationToken;

/// Something that turns a job configuration into a result. Implementations
/// never fail; errors are part of the returned record.
#[async_trait]
pub trait JobRunner: Send + Sync {
	async fn run_job(&self, job: &JobConfig) -> JobResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
	Idle,
	Running { run: u64 },
	Sleeping { run: u64 },
	Stopped,
}

impl fmt::Display for SupervisorState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Idle => f.write_str("idle"),
			Self::Running { run } => write!(f, "running(run {run})"),
			Self::Sleeping { run } => write!(f, "sleeping(after run {run})"),
			Self::Stopped => f.write_str("stopped"),
		}
	}
}

pub struct Supervisor<R> {
	runner: R,
	interval_secs: u64,
	token: CancellationToken,
	state: SupervisorState,
}

impl<R: JobRunner> Supervisor<R> {
	/// `interval` is truncated to whole seconds.
	pub fn new(runner: R, interval: Duration, token: CancellationToken) -> Self {
		Self {
			runner,
			interval_secs: interval.as_secs(),
			token,
			state: SupervisorState::Idle,
		}
	}

	pub fn state(&self) -> SupervisorState {
		self.state
	}

	fn transition(&mut self, next: SupervisorState) {
		info!(from = %self.state, to = %next, "supervisor state change");
		self.state = next;
	}

	/// Loop until the token is cancelled. A run in progress always finishes;
	/// the token is checked after each run and once per second while waiting.
	#[instrument(skip(self, job), fields(job_id = %job.id, interval_secs = self.interval_secs))]
	pub async fn run(&mut self, job: &JobConfig) -> RunSummary {
		let started = Instant::now();
		let mut statistics = RunStatistics::new(Utc::now());
		let mut run = 0u64;

		while !self.token.is_cancelled() {
			run += 1;
			self.transition(SupervisorState::Running { run });

			let result = self.runner.run_job(job).await;
			statistics.record(&result);
			if result.is_success() {
				info!(run, rows = result.rows_processed, "run succeeded");
			} else {
				error!(
					run,
					error = result.error.as_deref().unwrap_or_default(),
					failed_runs = statistics.failed_runs,
					"run failed"
				);
			}

			if self.token.is_cancelled() {
				break;
			}
			self.transition(SupervisorState::Sleeping { run });
			if !self.token.sleep_ticks(self.interval_secs).await {
				break;
			}
		}

		self.transition(SupervisorState::Stopped);
		let summary = RunSummary::new(statistics, started.elapsed());
		info!(
			total_runs = summary.statistics.total_runs,
			successful_runs = summary.statistics.successful_runs,
			failed_runs = summary.statistics.failed_runs,
			total_rows_processed = summary.statistics.total_rows_processed,
			success_rate = summary.success_rate,
			elapsed_secs = summary.elapsed.as_secs_f64(),
			"continuous run finished"
		);
		summary
	}
}
