// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! One-shot credential validation against the hosts
//!
//! Each check performs exactly one request. Validation is never retried: a
//! bad or under-scoped credential fails the run before anything is mutated.

use sw_domain_types::Identity;
use sw_rest_client::{DeployHost, RemoteOwner, SourceHost};

use crate::error::{Error, Result};
use crate::types::Credential;
use crate::validation::validate_format;

/// Confirm the source-control credential and return its identity
///
/// `host` must be a client built from `credential`.
pub async fn validate(host: &dyn SourceHost, credential: &Credential) -> Result<Identity> {
    validate_format(credential)?;

    let user = host
        .current_user()
        .await
        .map_err(|e| Error::from_rest(credential.host(), e))?;

    let scope = credential.required_scope();
    if !scope.satisfied_by(user.scopes.as_deref()) {
        let granted = user.scopes.unwrap_or_default();
        return Err(Error::InsufficientScope {
            host: credential.host(),
            required: scope.scope_name().unwrap_or_default().to_string(),
            granted: if granted.is_empty() {
                "none".to_string()
            } else {
                granted.join(", ")
            },
        });
    }
    if user.scopes.is_none() {
        tracing::debug!(login = %user.identity.login, "token reports no scopes, accepting");
    }

    tracing::info!(login = %user.identity.login, credential = %credential, "credential validated");
    Ok(user.identity)
}

/// Confirm the deploy-host key and return the owners it can act for
pub async fn validate_deploy_key(
    host: &dyn DeployHost,
    credential: &Credential,
) -> Result<Vec<RemoteOwner>> {
    validate_format(credential)?;

    let owners = host
        .list_owners()
        .await
        .map_err(|e| Error::from_rest(credential.host(), e))?;

    tracing::info!(owners = owners.len(), credential = %credential, "deploy key validated");
    Ok(owners)
}
