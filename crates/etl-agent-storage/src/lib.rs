// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Object-store staging for the ETL agent.
//!
//! [`ObjectStoreStaging`] implements [`StagingStore`] on top of
//! [`object_store`]: S3 for real deployments, or a local directory when the
//! bucket is given as `file:///path`. Tables are written as Snappy-compressed
//! Parquet part files under a logical path prefix.

pub mod columnar;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use etl_agent_config::ObjectStoreConfig;
use etl_agent_core::{EtlError, Result, StagingStore, Table, WriteMode};
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info, instrument};

pub use columnar::{decode_parquet, encode_parquet, table_to_batch};

const PART_PREFIX: &str = "part-";
const PART_SUFFIX: &str = ".parquet";

fn object_err(context: &str, e: object_store::Error) -> EtlError {
	match e {
		object_store::Error::Generic { .. } => {
			EtlError::connectivity("object store", format!("{context}: {e}"))
		}
		other => EtlError::Storage(format!("{context}: {other}")),
	}
}

/// `part-00003.parquet`
pub fn part_name(index: usize) -> String {
	format!("{PART_PREFIX}{index:05}{PART_SUFFIX}")
}

fn prefix_path(path: &str) -> ObjectPath {
	ObjectPath::from(path.trim_matches('/'))
}

#[derive(Debug)]
pub struct ObjectStoreStaging {
	store: Arc<dyn ObjectStore>,
	base_uri: String,
}

impl ObjectStoreStaging {
	/// Wrap an existing store. `base_uri` is prepended to paths in [`StagingStore::uri`].
	pub fn new(store: Arc<dyn ObjectStore>, base_uri: impl Into<String>) -> Self {
		Self {
			store,
			base_uri: base_uri.into().trim_end_matches('/').to_string(),
		}
	}

	/// Build from configuration: `file://` buckets map to a local directory,
	/// anything else is an S3 bucket.
	pub fn from_config(config: &ObjectStoreConfig) -> Result<Self> {
		let bucket = config.bucket.trim();
		if bucket.is_empty() {
			return Err(EtlError::InvalidConfiguration(
				"object store bucket is not configured".to_string(),
			));
		}

		if let Some(dir) = bucket.strip_prefix("file://") {
			return Self::local(PathBuf::from(dir));
		}

		let bucket = bucket.trim_start_matches("s3://").trim_end_matches('/');
		let mut builder = AmazonS3Builder::from_env()
			.with_bucket_name(bucket)
			.with_region(&config.region)
			.with_allow_http(config.allow_http);
		if let Some(endpoint) = &config.endpoint {
			builder = builder
				.with_endpoint(endpoint)
				.with_virtual_hosted_style_request(false);
		}
		if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
			builder = builder
				.with_access_key_id(key_id)
				.with_secret_access_key(secret.expose());
		}

		let store = builder
			.build()
			.map_err(|e| EtlError::InvalidConfiguration(format!("S3 object store: {e}")))?;
		info!(bucket, region = %config.region, role_arn = %config.role_arn, "S3 staging configured");
		Ok(Self::new(Arc::new(store), format!("s3://{bucket}")))
	}

	/// Staging in a local directory, created if missing.
	pub fn local(dir: PathBuf) -> Result<Self> {
		std::fs::create_dir_all(&dir).map_err(|e| {
			EtlError::InvalidConfiguration(format!(
				"failed to create staging directory '{}': {e}",
				dir.display()
			))
		})?;
		let absolute = dir.canonicalize().map_err(|e| {
			EtlError::InvalidConfiguration(format!(
				"failed to resolve staging directory '{}': {e}",
				dir.display()
			))
		})?;
		let store = LocalFileSystem::new_with_prefix(&absolute)
			.map_err(|e| EtlError::InvalidConfiguration(format!("local staging: {e}")))?;
		Ok(Self::new(
			Arc::new(store),
			format!("file://{}", absolute.display()),
		))
	}

	async fn list(&self, path: &str) -> Result<Vec<ObjectPath>> {
		let prefix = prefix_path(path);
		let mut locations: Vec<ObjectPath> = self
			.store
			.list(Some(&prefix))
			.map_ok(|meta| meta.location)
			.try_collect()
			.await
			.map_err(|e| object_err("listing staging objects", e))?;
		locations.sort();
		Ok(locations)
	}

	async fn fetch(&self, location: &ObjectPath) -> Result<bytes::Bytes> {
		self.store
			.get(location)
			.await
			.map_err(|e| object_err("reading staging object", e))?
			.bytes()
			.await
			.map_err(|e| object_err("reading staging object", e))
	}

	async fn parts(&self, path: &str) -> Result<Vec<ObjectPath>> {
		Ok(self
			.list(path)
			.await?
			.into_iter()
			.filter(|p| {
				p.filename()
					.is_some_and(|name| name.starts_with(PART_PREFIX) && name.ends_with(PART_SUFFIX))
			})
			.collect())
	}
}

#[async_trait]
impl StagingStore for ObjectStoreStaging {
	fn uri(&self, path: &str) -> String {
		format!("{}/{}/", self.base_uri, path.trim_matches('/'))
	}

	#[instrument(skip(self, data), fields(rows = data.row_count()))]
	async fn write_columnar(&self, data: &Table, path: &str, mode: WriteMode) -> Result<()> {
		let next_index = match mode {
			WriteMode::Overwrite => {
				self.delete(path).await?;
				0
			}
			WriteMode::Append => self.parts(path).await?.len(),
		};

		let body = encode_parquet(data)?;
		let size = body.len();
		let location = prefix_path(path).child(part_name(next_index));
		self.store
			.put(&location, body.into())
			.await
			.map_err(|e| object_err("writing staging object", e))?;

		debug!(location = %location, bytes = size, "staging object written");
		Ok(())
	}

	#[instrument(skip(self))]
	async fn read_columnar(&self, path: &str) -> Result<Table> {
		let parts = self.parts(path).await?;
		if parts.is_empty() {
			return Err(EtlError::Storage(format!("no staged data at {}", self.uri(path))));
		}

		let mut combined = Table::default();
		for (index, location) in parts.iter().enumerate() {
			let table = decode_parquet(self.fetch(location).await?)?;
			if index == 0 {
				combined = table;
			} else {
				combined.append(table)?;
			}
		}
		Ok(combined)
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		Ok(!self.list(path).await?.is_empty())
	}

	#[instrument(skip(self))]
	async fn delete(&self, path: &str) -> Result<()> {
		let locations = self.list(path).await?;
		for location in &locations {
			self.store
				.delete(location)
				.await
				.map_err(|e| object_err("deleting staging object", e))?;
		}
		debug!(deleted = locations.len(), "staging objects deleted");
		Ok(())
	}
}
