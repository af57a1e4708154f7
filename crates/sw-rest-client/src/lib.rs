// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! REST clients for the two hosts Shipwright talks to
//!
//! - [`GitHubClient`] implements [`SourceHost`]: identity check and
//!   repository provisioning.
//! - [`RenderClient`] implements [`DeployHost`]: service lookup, creation,
//!   update, deploy triggers, deploy status and rollback.
//!
//! Both share the [`RestClient`] transport, which attaches bearer
//! credentials as headers and turns non-success responses into
//! [`RestClientError`]s that can be classified (transient, auth, conflict,
//! not found). The [`retry`] module masks transient failures of idempotent
//! calls.

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod github;
pub mod render;
pub mod retry;

pub use api::*;
pub use auth::BearerToken;
pub use client::RestClient;
pub use error::{RestClientError, RestClientResult};
pub use github::{DEFAULT_GITHUB_API_URL, GitHubClient};
pub use render::{DEFAULT_RENDER_API_URL, RenderClient};
pub use reqwest::StatusCode;
pub use retry::{RetryPolicy, Retryable, WaitStrategy, with_retry};
