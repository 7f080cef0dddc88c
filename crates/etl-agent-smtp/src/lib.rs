// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Email delivery of job alerts.
//!
//! [`EmailNotifier`] is the [`Notifier`] the agent wires in when an `smtp`
//! section is configured. It sends one plain-text message per recipient
//! through [`SmtpClient`], a lettre transport built once from [`SmtpConfig`].
//! The relay password stays a `SecretString` until the credentials are built.

use async_trait::async_trait;
use etl_agent_config::SmtpConfig;
use etl_agent_core::{EtlError, Notifier};
use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("invalid sender address '{address}': {reason}")]
	Sender { address: String, reason: String },

	#[error("invalid recipient address '{address}': {reason}")]
	Recipient { address: String, reason: String },

	#[error("cannot set up STARTTLS relay {host}: {reason}")]
	Relay { host: String, reason: String },

	#[error("delivery to {recipient} failed: {reason}")]
	Delivery { recipient: String, reason: String },
}

/// Transport plus sender identity. Nothing connects until a message is sent.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	sender: Mailbox,
	relay: String,
}

fn sender_mailbox(config: &SmtpConfig) -> Result<Mailbox, SmtpError> {
	let address: Address = config
		.from_address
		.trim()
		.parse()
		.map_err(|e| SmtpError::Sender {
			address: config.from_address.clone(),
			reason: format!("{e}"),
		})?;
	let name = config.from_name.trim();
	Ok(Mailbox::new(
		(!name.is_empty()).then(|| name.to_string()),
		address,
	))
}

impl SmtpClient {
	/// STARTTLS when `use_tls` is set, otherwise a plain connection (local relays only).
	pub fn from_config(config: SmtpConfig) -> Result<Self, SmtpError> {
		let sender = sender_mailbox(&config)?;
		let relay = format!("{}:{}", config.host, config.port);

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
				SmtpError::Relay {
					host: config.host.clone(),
					reason: format!("{e}"),
				}
			})?
		} else {
			warn!(relay = %relay, "SMTP relay configured without TLS");
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};
		let mut builder = builder.port(config.port);

		match (config.username, config.password) {
			(Some(user), Some(password)) => {
				builder = builder.credentials(Credentials::new(user, password.into_inner()));
			}
			(Some(_), None) => debug!("SMTP username set without password, sending unauthenticated"),
			_ => {}
		}

		Ok(Self {
			transport: builder.build(),
			sender,
			relay,
		})
	}

	pub fn sender(&self) -> &Mailbox {
		&self.sender
	}

	/// Deliver one plain-text message. The recipient is validated before any
	/// connection is made.
	#[instrument(skip(self, body), fields(relay = %self.relay))]
	pub async fn send_plain(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SmtpError> {
		let to: Mailbox = recipient.trim().parse().map_err(|e| SmtpError::Recipient {
			address: recipient.to_string(),
			reason: format!("{e}"),
		})?;
		let delivery_error = |reason: String| SmtpError::Delivery {
			recipient: recipient.to_string(),
			reason,
		};

		let message = Message::builder()
			.from(self.sender.clone())
			.to(to)
			.subject(subject)
			.header(ContentType::TEXT_PLAIN)
			.body(body.to_string())
			.map_err(|e| delivery_error(format!("{e}")))?;

		self.transport
			.send(message)
			.await
			.map_err(|e| delivery_error(format!("{e}")))?;
		debug!("message accepted by relay");
		Ok(())
	}
}

/// [`Notifier`] that emails every recipient individually.
pub struct EmailNotifier {
	client: SmtpClient,
}

impl EmailNotifier {
	pub fn new(client: SmtpClient) -> Self {
		Self { client }
	}

	pub fn from_config(config: SmtpConfig) -> Result<Self, SmtpError> {
		Ok(Self::new(SmtpClient::from_config(config)?))
	}
}

#[async_trait]
impl Notifier for EmailNotifier {
	/// Every recipient is attempted; the call fails if any delivery failed.
	async fn send(
		&self,
		recipients: &[String],
		subject: &str,
		body: &str,
	) -> etl_agent_core::Result<()> {
		let mut failures = Vec::new();
		for recipient in recipients {
			if let Err(e) = self.client.send_plain(recipient, subject, body).await {
				warn!(recipient = %recipient, error = %e, "email delivery failed");
				failures.push(e.to_string());
			}
		}

		if failures.is_empty() {
			info!(recipients = recipients.len(), subject, "notification emailed");
			Ok(())
		} else {
			Err(EtlError::Notification(failures.join("; ")))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use etl_common_config::SecretString;
	use proptest::prelude::*;

	fn local_relay() -> SmtpConfig {
		SmtpConfig {
			host: "localhost".to_string(),
			port: 2525,
			username: Some("etl".to_string()),
			password: Some(SecretString::new("relay-password-123".to_string())),
			from_address: "etl-agent@example.com".to_string(),
			from_name: "ETL Agent".to_string(),
			use_tls: false,
		}
	}

	#[test]
	fn test_sender_carries_display_name() {
		let client = SmtpClient::from_config(local_relay()).unwrap();
		assert_eq!(client.sender().name.as_deref(), Some("ETL Agent"));
		assert_eq!(client.sender().email.to_string(), "etl-agent@example.com");
	}

	#[test]
	fn test_blank_display_name_is_dropped() {
		let mut config = local_relay();
		config.from_name = "  ".to_string();
		let client = SmtpClient::from_config(config).unwrap();
		assert_eq!(client.sender().name, None);
	}

	#[test]
	fn test_bad_sender_is_rejected() {
		let mut config = local_relay();
		config.from_address = "etl agent at example".to_string();
		assert!(matches!(
			SmtpClient::from_config(config),
			Err(SmtpError::Sender { .. })
		));
	}

	#[test]
	fn test_relay_password_is_not_printed() {
		let debug = format!("{:?}", local_relay());
		assert!(!debug.contains("relay-password-123"));
	}

	#[tokio::test]
	async fn test_bad_recipient_fails_before_connecting() {
		let client = SmtpClient::from_config(local_relay()).unwrap();
		let err = client
			.send_plain("dna-team", "JCAP PA ETL - Success", "body")
			.await
			.unwrap_err();
		assert!(matches!(err, SmtpError::Recipient { address, .. } if address == "dna-team"));
	}

	#[tokio::test]
	async fn test_no_recipients_sends_nothing() {
		let notifier = EmailNotifier::from_config(local_relay()).unwrap();
		assert!(notifier.send(&[], "subject", "body").await.is_ok());
	}

	#[tokio::test]
	async fn test_every_failed_recipient_is_reported() {
		let notifier = EmailNotifier::from_config(local_relay()).unwrap();
		let err = notifier
			.send(
				&["ops".to_string(), "data team".to_string()],
				"Data Variance Alert - JCAP PA ETL",
				"body",
			)
			.await
			.unwrap_err();
		match err {
			EtlError::Notification(message) => {
				assert!(message.contains("'ops'"), "{message}");
				assert!(message.contains("'data team'"), "{message}");
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	proptest! {
		#[test]
		fn recipients_without_domain_never_reach_the_relay(local in "[a-z][a-z0-9.]{0,20}") {
			let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
			let client = SmtpClient::from_config(local_relay()).unwrap();
			let result = runtime.block_on(client.send_plain(&local, "subject", "body"));
			prop_assert!(
				matches!(result, Err(SmtpError::Recipient { .. })),
				"unexpected: {:?}",
				result
			);
		}
	}
}
