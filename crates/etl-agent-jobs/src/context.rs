// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

/// Cooperative shutdown flag shared between the signal handler and the
/// supervisor. Cancelling never interrupts a running job; it is only
/// observed at the supervisor's checkpoints.
#[derive(Clone, Debug)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
	pub fn new() -> Self {
		Self {
			cancelled: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	/// Wait `seconds` in one-second ticks, checking the flag before each tick.
	///
	/// Returns `true` when the whole wait elapsed and `false` as soon as
	/// cancellation is seen. With `seconds == 0` the flag is checked once.
	pub async fn sleep_ticks(&self, seconds: u64) -> bool {
		for _ in 0..seconds {
			if self.is_cancelled() {
				return false;
			}
			tokio::time::sleep(TICK).await;
		}
		!self.is_cancelled()
	}
}

impl Default for CancellationToken {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_clones_share_the_flag() {
		let token = CancellationToken::new();
		let clone = token.clone();
		assert!(!clone.is_cancelled());
		token.cancel();
		assert!(clone.is_cancelled());
	}

	#[tokio::test(start_paused = true)]
	async fn test_sleep_ticks_runs_full_interval() {
		let token = CancellationToken::new();
		let started = tokio::time::Instant::now();
		assert!(token.sleep_ticks(5).await);
		assert_eq!(started.elapsed(), Duration::from_secs(5));
	}

	#[tokio::test(start_paused = true)]
	async fn test_sleep_ticks_stops_within_a_second_of_cancel() {
		let token = CancellationToken::new();
		let canceller = token.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(2500)).await;
			canceller.cancel();
		});

		let started = tokio::time::Instant::now();
		assert!(!token.sleep_ticks(60).await);
		assert_eq!(started.elapsed(), Duration::from_secs(3));
	}

	#[tokio::test]
	async fn test_zero_interval_only_checks_the_flag() {
		let token = CancellationToken::new();
		assert!(token.sleep_ticks(0).await);
		token.cancel();
		assert!(!token.sleep_ticks(0).await);
	}
}
