// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Credential types

use std::fmt;

use sw_rest_client::BearerToken;

/// Host a credential belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialHost {
    /// Source-control host (GitHub)
    SourceControl,
    /// Deploy host (Render)
    Deploy,
}

impl fmt::Display for CredentialHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialHost::SourceControl => write!(f, "source-control"),
            CredentialHost::Deploy => write!(f, "deploy-host"),
        }
    }
}

/// Capability a credential must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredScope {
    /// Create repositories and push to them (GitHub `repo`)
    ManageRepositories,
    /// Manage services; the deploy host has no scope model
    ManageServices,
}

impl RequiredScope {
    /// Scope name as reported by the host, if the host reports scopes
    pub fn scope_name(self) -> Option<&'static str> {
        match self {
            RequiredScope::ManageRepositories => Some("repo"),
            RequiredScope::ManageServices => None,
        }
    }

    /// Whether the granted scopes satisfy this requirement
    ///
    /// `None` means the host did not report scopes at all (fine-grained
    /// tokens); that is accepted and left to the first real call.
    pub fn satisfied_by(self, granted: Option<&[String]>) -> bool {
        match (self.scope_name(), granted) {
            (None, _) | (_, None) => true,
            (Some(required), Some(granted)) => granted.iter().any(|s| s == required),
        }
    }
}

/// Opaque bearer credential plus the scope it must carry
///
/// Supplied at process start and never persisted. `Debug` and `Display`
/// only ever show a redacted hint; the token is zeroized on drop.
#[derive(Clone)]
pub struct Credential {
    host: CredentialHost,
    token: BearerToken,
    required_scope: RequiredScope,
}

impl Credential {
    /// GitHub token that must be able to manage repositories
    pub fn source_control(token: impl Into<String>) -> Self {
        Self {
            host: CredentialHost::SourceControl,
            token: BearerToken::new(token),
            required_scope: RequiredScope::ManageRepositories,
        }
    }

    /// Render API key
    pub fn deploy(api_key: impl Into<String>) -> Self {
        Self {
            host: CredentialHost::Deploy,
            token: BearerToken::new(api_key),
            required_scope: RequiredScope::ManageServices,
        }
    }

    pub fn host(&self) -> CredentialHost {
        self.host
    }

    pub fn required_scope(&self) -> RequiredScope {
        self.required_scope
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// The raw secret, for building the git auth header
    pub fn expose_secret(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("token", &self.token.hint())
            .field("required_scope", &self.required_scope)
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credential {}", self.host, self.token.hint())
    }
}
