// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod jobs;
mod object_store;
mod smtp;
mod warehouse;

pub use jobs::{
	LoggingConfig, LoggingConfigLayer, ProductionConfig, ProductionConfigLayer, SimpleConfig,
	SimpleConfigLayer, DEFAULT_VARIANCE_THRESHOLD,
};
pub use object_store::{ObjectStoreConfig, ObjectStoreConfigLayer};
pub use smtp::{NotifyConfig, NotifyConfigLayer, SmtpConfig, SmtpConfigLayer};
pub use warehouse::{
	WarehouseConfig, WarehouseConfigLayer, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONNECTIONS,
	DEFAULT_WAREHOUSE_PORT,
};
