// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort result reporting.
//!
//! [`NotificationSink`] never returns an error: a failed or skipped delivery
//! is logged and reported as `false`, and callers only record that flag.

use std::sync::Arc;

use chrono::Utc;
use etl_agent_config::NotifyConfig;
use etl_agent_core::{JobStatus, Notifier};
use tracing::{info, warn};

use crate::variance::VarianceReport;

const SIGNATURE: &str = "This is an automated message from the ETL agent.";

/// What a completion message reports.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionNotice {
	pub status: JobStatus,
	pub duration_seconds: f64,
	pub rows_processed: u64,
	pub error: Option<String>,
}

#[derive(Clone, Default)]
pub struct NotificationSink {
	notifier: Option<Arc<dyn Notifier>>,
	recipients: Vec<String>,
}

fn timestamp() -> String {
	Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

impl NotificationSink {
	pub fn new(notifier: Option<Arc<dyn Notifier>>, recipients: Vec<String>) -> Self {
		Self {
			notifier,
			recipients,
		}
	}

	/// A sink that only logs.
	pub fn disabled() -> Self {
		Self::default()
	}

	/// Honors `notify.enabled`; a disabled section yields [`Self::disabled`].
	pub fn from_config(notifier: Option<Arc<dyn Notifier>>, config: &NotifyConfig) -> Self {
		if !config.enabled {
			return Self::disabled();
		}
		Self::new(notifier, config.recipients.clone())
	}

	pub fn is_enabled(&self) -> bool {
		self.notifier.is_some() && !self.recipients.is_empty()
	}

	pub async fn variance_alert(&self, job_name: &str, report: &VarianceReport) -> bool {
		let subject = format!("Data Variance Alert - {job_name}");
		let body = format!(
			"DATA VARIANCE ALERT\n\n\
			 Job: {job_name}\n\
			 Timestamp: {}\n\n\
			 Previous Count: {} rows\n\
			 Current Count: {} rows\n\
			 Variance: {} rows ({:.2}%)\n\
			 Threshold: {}%\n\n\
			 The row-count variance reached the configured threshold. Check the \
			 source data, the transform and the job logs.\n\n\
			 {SIGNATURE}",
			timestamp(),
			report.previous_count,
			report.current_count,
			report.variance,
			report.variance_percentage,
			report.threshold,
		);
		self.deliver(&subject, &body).await
	}

	pub async fn job_completed(&self, job_name: &str, notice: &CompletionNotice) -> bool {
		let status = notice.status.as_str();
		let subject = format!("{job_name} - {status}");
		let body = match notice.status {
			JobStatus::Success => format!(
				"JOB COMPLETED SUCCESSFULLY\n\n\
				 Job: {job_name}\n\
				 Status: {status}\n\
				 Completion Time: {}\n\
				 Duration: {:.2} seconds\n\
				 Rows Processed: {}\n\n\
				 {SIGNATURE}",
				timestamp(),
				notice.duration_seconds,
				notice.rows_processed,
			),
			JobStatus::Failed => format!(
				"JOB EXECUTION FAILED\n\n\
				 Job: {job_name}\n\
				 Status: {status}\n\
				 Failure Time: {}\n\
				 Duration: {:.2} seconds\n\
				 Error: {}\n\n\
				 {SIGNATURE}",
				timestamp(),
				notice.duration_seconds,
				notice.error.as_deref().unwrap_or("unknown error"),
			),
		};
		self.deliver(&subject, &body).await
	}

	async fn deliver(&self, subject: &str, body: &str) -> bool {
		let Some(notifier) = &self.notifier else {
			info!(subject, "no notifier configured, skipping notification");
			return false;
		};
		if self.recipients.is_empty() {
			info!(subject, "no recipients configured, skipping notification");
			return false;
		}

		match notifier.send(&self.recipients, subject, body).await {
			Ok(()) => {
				info!(subject, recipients = self.recipients.len(), "notification sent");
				true
			}
			Err(e) => {
				warn!(subject, error = %e, "notification failed");
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use etl_agent_core::memory::RecordingNotifier;

	fn report() -> VarianceReport {
		VarianceReport {
			previous_count: 1000,
			current_count: 950,
			variance: 50,
			variance_percentage: 5.0,
			threshold: 5.0,
			threshold_exceeded: true,
		}
	}

	fn sink(notifier: &RecordingNotifier) -> NotificationSink {
		NotificationSink::new(
			Some(Arc::new(notifier.clone())),
			vec!["dna-team@example.com".to_string()],
		)
	}

	#[tokio::test]
	async fn test_variance_alert_contents() {
		let notifier = RecordingNotifier::new();
		assert!(sink(&notifier).variance_alert("JCAP PA ETL", &report()).await);

		let sent = notifier.sent();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].subject, "Data Variance Alert - JCAP PA ETL");
		assert_eq!(sent[0].recipients, vec!["dna-team@example.com".to_string()]);
		assert!(sent[0].body.contains("Previous Count: 1000 rows"));
		assert!(sent[0].body.contains("Current Count: 950 rows"));
		assert!(sent[0].body.contains("(5.00%)"));
	}

	#[tokio::test]
	async fn test_failure_notice_carries_error() {
		let notifier = RecordingNotifier::new();
		let notice = CompletionNotice {
			status: JobStatus::Failed,
			duration_seconds: 1.5,
			rows_processed: 0,
			error: Some("backup validation failed".to_string()),
		};
		assert!(sink(&notifier).job_completed("JCAP PA ETL", &notice).await);
		let sent = notifier.sent();
		assert_eq!(sent[0].subject, "JCAP PA ETL - Failed");
		assert!(sent[0].body.contains("Error: backup validation failed"));
	}

	#[tokio::test]
	async fn test_delivery_failure_is_false_not_error() {
		let notifier = RecordingNotifier::new();
		notifier.set_failing(true);
		assert!(!sink(&notifier).variance_alert("job", &report()).await);
	}

	#[tokio::test]
	async fn test_missing_notifier_or_recipients_is_false() {
		assert!(!NotificationSink::disabled().variance_alert("job", &report()).await);

		let notifier = RecordingNotifier::new();
		let no_recipients = NotificationSink::new(Some(Arc::new(notifier.clone())), Vec::new());
		assert!(!no_recipients.variance_alert("job", &report()).await);
		assert!(notifier.sent().is_empty());
	}

	#[test]
	fn test_disabled_section_ignores_notifier() {
		let config = NotifyConfig {
			enabled: false,
			recipients: vec!["a@example.com".to_string()],
		};
		let notifier: Arc<dyn Notifier> = Arc::new(RecordingNotifier::new());
		assert!(!NotificationSink::from_config(Some(notifier), &config).is_enabled());
	}
}
