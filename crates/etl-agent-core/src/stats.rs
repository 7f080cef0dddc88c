// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Statistics accumulated by the continuous-run supervisor.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::result::JobResult;

/// Counters for one continuous-mode process. Only ever incremented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
	pub total_runs: u64,
	pub successful_runs: u64,
	pub failed_runs: u64,
	pub total_rows_processed: u64,
	pub start_time: DateTime<Utc>,
}

impl RunStatistics {
	pub fn new(start_time: DateTime<Utc>) -> Self {
		Self {
			total_runs: 0,
			successful_runs: 0,
			failed_runs: 0,
			total_rows_processed: 0,
			start_time,
		}
	}

	/// Fold one finished run into the totals.
	pub fn record(&mut self, result: &JobResult) {
		self.total_runs += 1;
		if result.is_success() {
			self.successful_runs += 1;
		} else {
			self.failed_runs += 1;
		}
		self.total_rows_processed += result.rows_processed;
	}

	/// (successful / total) * 100, or 0 with no runs.
	pub fn success_rate(&self) -> f64 {
		if self.total_runs == 0 {
			0.0
		} else {
			self.successful_runs as f64 / self.total_runs as f64 * 100.0
		}
	}
}

/// Terminal value of a continuous run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
	pub statistics: RunStatistics,
	pub success_rate: f64,
	pub elapsed: Duration,
}

impl RunSummary {
	pub fn new(statistics: RunStatistics, elapsed: Duration) -> Self {
		let success_rate = statistics.success_rate();
		Self {
			statistics,
			success_rate,
			elapsed,
		}
	}

	/// True when no run happened or the success rate reaches `min_success_rate`.
	pub fn meets(&self, min_success_rate: f64) -> bool {
		self.statistics.total_runs == 0 || self.success_rate >= min_success_rate
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::EtlError;
	use crate::result::JobOutput;
	use proptest::prelude::*;

	fn result(success: bool, rows: u64) -> JobResult {
		let now = Utc::now();
		let outcome = if success {
			Ok(JobOutput::new(rows))
		} else {
			Err(EtlError::Query("boom".to_string()).into())
		};
		JobResult::from_outcome("j", "n", "simple_etl", now, now, outcome)
	}

	#[test]
	fn empty_statistics_have_zero_rate() {
		let stats = RunStatistics::new(Utc::now());
		assert_eq!(stats.success_rate(), 0.0);
		assert!(RunSummary::new(stats, Duration::ZERO).meets(50.0));
	}

	#[test]
	fn failures_are_tallied() {
		let mut stats = RunStatistics::new(Utc::now());
		stats.record(&result(true, 10));
		stats.record(&result(false, 0));
		stats.record(&result(false, 0));
		assert_eq!(stats.total_runs, 3);
		assert_eq!(stats.failed_runs, 2);
		assert_eq!(stats.total_rows_processed, 10);

		let summary = RunSummary::new(stats, Duration::from_secs(12));
		assert!((summary.success_rate - 33.333).abs() < 0.01);
		assert!(!summary.meets(50.0));
		assert!(summary.meets(30.0));
	}

	proptest! {
		#[test]
		fn totals_always_balance(outcomes in prop::collection::vec((any::<bool>(), 0u64..1000), 0..50)) {
			let mut stats = RunStatistics::new(Utc::now());
			for (success, rows) in outcomes {
				let before = stats.clone();
				stats.record(&result(success, rows));
				prop_assert_eq!(stats.total_runs, stats.successful_runs + stats.failed_runs);
				prop_assert!(stats.total_runs > before.total_runs);
				prop_assert!(stats.total_rows_processed >= before.total_rows_processed);
			}
			let rate = stats.success_rate();
			prop_assert!((0.0..=100.0).contains(&rate));
		}
	}
}
