// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Object store (staging) configuration.

use etl_common_config::SecretString;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStoreConfig {
	/// Bucket name, or `file:///some/dir` for a local directory.
	pub bucket: String,
	pub region: String,
	/// Role assumed through web identity; required for production jobs.
	pub role_arn: String,
	pub endpoint: Option<String>,
	pub allow_http: bool,
	pub access_key_id: Option<String>,
	pub secret_access_key: Option<SecretString>,
}

impl Default for ObjectStoreConfig {
	fn default() -> Self {
		ObjectStoreConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ObjectStoreConfigLayer {
	#[serde(default)]
	pub bucket: Option<String>,
	#[serde(default)]
	pub region: Option<String>,
	#[serde(default)]
	pub role_arn: Option<String>,
	#[serde(default)]
	pub endpoint: Option<String>,
	#[serde(default)]
	pub allow_http: Option<bool>,
	#[serde(default)]
	pub access_key_id: Option<String>,
	#[serde(default)]
	pub secret_access_key: Option<SecretString>,
}

impl ObjectStoreConfigLayer {
	pub fn merge(&mut self, other: ObjectStoreConfigLayer) {
		if other.bucket.is_some() {
			self.bucket = other.bucket;
		}
		if other.region.is_some() {
			self.region = other.region;
		}
		if other.role_arn.is_some() {
			self.role_arn = other.role_arn;
		}
		if other.endpoint.is_some() {
			self.endpoint = other.endpoint;
		}
		if other.allow_http.is_some() {
			self.allow_http = other.allow_http;
		}
		if other.access_key_id.is_some() {
			self.access_key_id = other.access_key_id;
		}
		if other.secret_access_key.is_some() {
			self.secret_access_key = other.secret_access_key;
		}
	}

	pub fn finalize(self) -> ObjectStoreConfig {
		ObjectStoreConfig {
			bucket: self.bucket.unwrap_or_default(),
			region: self.region.unwrap_or_else(|| "us-east-1".to_string()),
			role_arn: self.role_arn.unwrap_or_default(),
			endpoint: self.endpoint,
			allow_http: self.allow_http.unwrap_or(false),
			access_key_id: self.access_key_id,
			secret_access_key: self.secret_access_key,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_region() {
		let config = ObjectStoreConfigLayer::default().finalize();
		assert_eq!(config.region, "us-east-1");
		assert!(config.bucket.is_empty());
		assert!(!config.allow_http);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = ObjectStoreConfigLayer {
			bucket: Some("old".to_string()),
			..Default::default()
		};
		base.merge(ObjectStoreConfigLayer {
			bucket: Some("new".to_string()),
			endpoint: Some("http://localhost:9000".to_string()),
			..Default::default()
		});
		assert_eq!(base.bucket.as_deref(), Some("new"));
		assert!(base.endpoint.is_some());
	}
}
