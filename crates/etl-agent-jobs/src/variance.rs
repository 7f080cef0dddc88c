// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Row-count variance between consecutive loads.

use etl_agent_core::{EtlError, Result};

/// `|current - previous| * 100 / previous`, or 0 when `previous` is 0.
///
/// Scaling before dividing keeps whole percentages exact.
pub fn variance_percentage(previous: u64, current: u64) -> f64 {
	if previous == 0 {
		return 0.0;
	}
	(previous.abs_diff(current) as f64 * 100.0) / previous as f64
}

/// Outcome of comparing two counts against the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceReport {
	pub previous_count: u64,
	pub current_count: u64,
	pub variance: u64,
	pub variance_percentage: f64,
	pub threshold: f64,
	pub threshold_exceeded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceDetector {
	threshold: f64,
}

impl VarianceDetector {
	/// `threshold` is a percentage in `0..=100`.
	pub fn new(threshold: f64) -> Result<Self> {
		if !(0.0..=100.0).contains(&threshold) {
			return Err(EtlError::InvalidConfiguration(format!(
				"variance threshold must be between 0 and 100, got {threshold}"
			)));
		}
		Ok(Self { threshold })
	}

	pub fn threshold(&self) -> f64 {
		self.threshold
	}

	/// The threshold is inclusive: a variance equal to it is exceeded.
	pub fn evaluate(&self, previous_count: u64, current_count: u64) -> VarianceReport {
		let variance_percentage = variance_percentage(previous_count, current_count);
		VarianceReport {
			previous_count,
			current_count,
			variance: previous_count.abs_diff(current_count),
			variance_percentage,
			threshold: self.threshold,
			threshold_exceeded: variance_percentage >= self.threshold,
		}
	}
}
