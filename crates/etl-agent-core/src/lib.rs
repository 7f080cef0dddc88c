// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the ETL agent.
//!
//! This crate holds everything the job engine and the adapters agree on:
//! the in-memory [`Table`] model, job configuration and its resolution into
//! a typed [`JobSpec`], the uniform [`JobResult`] record, continuous-mode
//! [`RunStatistics`], the [`EtlError`] taxonomy, and the collaborator traits
//! ([`Warehouse`], [`StagingStore`], [`Notifier`]) implemented by the adapter
//! crates.

pub mod connector;
pub mod error;
pub mod job;
pub mod result;
pub mod stats;
pub mod table;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use connector::{Notifier, StagingStore, TableRef, Warehouse, WriteMode};
pub use error::{ErrorKind, EtlError, Result};
pub use job::{
	JobConfig, JobKind, JobSpec, JobType, ProductionEtlParams, SimpleEtlParams, DATE_FORMAT,
};
pub use result::{
	JobDetails, JobFailure, JobOutput, JobResult, JobStatus, PipelineStep, SimpleEtlDetails,
	WorkflowMetrics,
};
pub use stats::{RunStatistics, RunSummary};
pub use table::{Table, Value};
