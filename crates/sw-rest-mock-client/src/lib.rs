// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! In-memory hosts for testing
//!
//! [`FakeSourceHost`] and [`FakeDeployHost`] implement the same traits as the
//! GitHub and Render clients without touching the network. They keep their
//! state behind `Arc<RwLock<..>>` so a test can hand a clone to the code under
//! test and inspect the recorded calls afterwards. Failures are injected per
//! operation name (the trait method name, e.g. `"create_service"`).

mod deploy;
mod source;

pub use deploy::{DeployState, FakeDeployHost};
pub use source::{FakeSourceHost, SourceState};

use std::collections::HashMap;
use sw_rest_client::{RestClientError, StatusCode};

/// Pending injected failures, keyed by operation name
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    failures: HashMap<String, Vec<StatusCode>>,
}

impl FailurePlan {
    /// Fail the next `times` calls of `operation` with `status`
    pub fn fail(&mut self, operation: &str, status: StatusCode, times: usize) {
        self.failures
            .entry(operation.to_string())
            .or_default()
            .extend(std::iter::repeat(status).take(times));
    }

    /// Take the next failure for `operation`, if one is pending
    pub(crate) fn next(&mut self, method: &str, operation: &str) -> Option<RestClientError> {
        let pending = self.failures.get_mut(operation)?;
        if pending.is_empty() {
            return None;
        }
        let status = pending.remove(0);
        Some(RestClientError::status_error(
            method,
            operation,
            status,
            format!("injected {} failure", status.as_u16()),
        ))
    }
}
