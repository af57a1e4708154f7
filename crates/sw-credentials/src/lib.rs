// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bearer credentials and their validation
//!
//! This crate provides:
//! - [`Credential`]: an opaque token tagged with its host and the scope it
//!   must carry, redacted in every formatted form
//! - Local format checks that reject impossible tokens without a request
//! - One-shot validation against the source-control host ([`validate`]) and
//!   the deploy host ([`validate_deploy_key`])

pub mod error;
pub mod types;
pub mod validation;
pub mod validator;

pub use error::{Error, Result};
pub use types::{Credential, CredentialHost, RequiredScope};
pub use validator::{validate, validate_deploy_key};
