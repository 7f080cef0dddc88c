// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job execution for the ETL agent.
//!
//! [`JobDispatcher`] resolves a [`JobConfig`](etl_agent_core::JobConfig) to a
//! handler, checks the settings that handler needs and always returns a
//! [`JobResult`](etl_agent_core::JobResult). The production handler is
//! [`ProductionWorkflow`]; continuous mode is driven by [`Supervisor`].

pub mod backup;
pub mod context;
pub mod extract;
pub mod notify;
pub mod registry;
pub mod simple;
pub mod supervisor;
pub mod transform;
pub mod variance;
pub mod workflow;

pub use backup::{BackupGuard, BackupReport};
pub use context::CancellationToken;
pub use extract::ExtractQuery;
pub use notify::{CompletionNotice, NotificationSink};
pub use registry::{required_settings, Collaborators, JobDispatcher};
pub use simple::SimpleEtlJob;
pub use supervisor::{JobRunner, Supervisor, SupervisorState};
pub use transform::transform;
pub use variance::{variance_percentage, VarianceDetector, VarianceReport};
pub use workflow::{Mutations, PipelineStepOutcome, ProductionWorkflow, StepJournal};
