// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SMTP and notification configuration.

use etl_common_config::SecretString;
use serde::Deserialize;

/// SMTP relay settings. Only present when a host is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	pub use_tls: bool,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SmtpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub password: Option<SecretString>,
	#[serde(default)]
	pub from_address: Option<String>,
	#[serde(default)]
	pub from_name: Option<String>,
	#[serde(default)]
	pub use_tls: Option<bool>,
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: SmtpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.from_address.is_some() {
			self.from_address = other.from_address;
		}
		if other.from_name.is_some() {
			self.from_name = other.from_name;
		}
		if other.use_tls.is_some() {
			self.use_tls = other.use_tls;
		}
	}

	/// `None` when no host is set; the agent then runs without email.
	pub fn finalize(self) -> Option<SmtpConfig> {
		let host = self.host.filter(|h| !h.trim().is_empty())?;
		let from_address = self
			.from_address
			.or_else(|| self.username.clone())
			.unwrap_or_else(|| format!("etl-agent@{host}"));
		Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(587),
			username: self.username,
			password: self.password,
			from_address,
			from_name: self.from_name.unwrap_or_else(|| "ETL Agent".to_string()),
			use_tls: self.use_tls.unwrap_or(true),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
	pub enabled: bool,
	pub recipients: Vec<String>,
}

impl Default for NotifyConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			recipients: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NotifyConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub recipients: Option<Vec<String>>,
}

impl NotifyConfigLayer {
	pub fn merge(&mut self, other: NotifyConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.recipients.is_some() {
			self.recipients = other.recipients;
		}
	}

	pub fn finalize(self) -> NotifyConfig {
		NotifyConfig {
			enabled: self.enabled.unwrap_or(true),
			recipients: self
				.recipients
				.unwrap_or_default()
				.into_iter()
				.map(|r| r.trim().to_string())
				.filter(|r| !r.is_empty())
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_no_host_means_no_smtp() {
		assert!(SmtpConfigLayer::default().finalize().is_none());
		let blank = SmtpConfigLayer {
			host: Some("  ".to_string()),
			..Default::default()
		};
		assert!(blank.finalize().is_none());
	}

	#[test]
	fn test_smtp_defaults() {
		let config = SmtpConfigLayer {
			host: Some("smtp.office365.com".to_string()),
			username: Some("etl@example.com".to_string()),
			..Default::default()
		}
		.finalize()
		.unwrap();
		assert_eq!(config.port, 587);
		assert!(config.use_tls);
		assert_eq!(config.from_address, "etl@example.com");
		assert_eq!(config.from_name, "ETL Agent");
	}

	#[test]
	fn test_recipients_are_trimmed() {
		let config = NotifyConfigLayer {
			enabled: None,
			recipients: Some(vec![" ops@example.com ".to_string(), "".to_string()]),
		}
		.finalize();
		assert!(config.enabled);
		assert_eq!(config.recipients, vec!["ops@example.com".to_string()]);
	}
}
