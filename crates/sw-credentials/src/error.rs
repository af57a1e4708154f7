// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for credential validation

use sw_rest_client::RestClientError;
use thiserror::Error;

use crate::types::CredentialHost;

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, Error>;

/// Credential validation failures
///
/// All of them are terminal: a credential is checked once and never retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no {0} credential was supplied")]
    Missing(CredentialHost),

    #[error("{host} credential is malformed: {reason}")]
    Malformed { host: CredentialHost, reason: String },

    #[error("{host} rejected the credential: {source}")]
    Rejected {
        host: CredentialHost,
        #[source]
        source: RestClientError,
    },

    #[error("{host} credential lacks the '{required}' scope (granted: {granted})")]
    InsufficientScope {
        host: CredentialHost,
        required: String,
        granted: String,
    },

    #[error("could not validate the {host} credential: {source}")]
    Unavailable {
        host: CredentialHost,
        #[source]
        source: RestClientError,
    },
}

impl Error {
    pub fn host(&self) -> CredentialHost {
        match self {
            Error::Missing(host) => *host,
            Error::Malformed { host, .. }
            | Error::Rejected { host, .. }
            | Error::InsufficientScope { host, .. }
            | Error::Unavailable { host, .. } => *host,
        }
    }

    /// Classify a failed identity call
    pub(crate) fn from_rest(host: CredentialHost, source: RestClientError) -> Self {
        if source.is_auth() {
            Error::Rejected { host, source }
        } else {
            Error::Unavailable { host, source }
        }
    }
}
