// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core orchestration for Shipwright.
//!
//! This crate owns the service registry client, the deploy controller with
//! its rollback policy, the advisory run lock and the [`Pipeline`] that
//! strings the components together.

pub mod deploy;
pub mod error;
pub mod lock;
pub mod pipeline;
pub mod registry;

pub use deploy::DeployController;
pub use error::{CoreError, CoreResult, ErrorKind, PipelineError, PipelineStep};
pub use lock::{lock_path, RunLock};
pub use pipeline::{
    retry_policy, Pipeline, PipelineConfig, PipelineHosts, RunReport, StepOutcome, StepReport,
};
pub use registry::{EnsuredService, ServiceAction, ServiceRegistry};
