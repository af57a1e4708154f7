// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Deploy-related domain types
//!
//! A [`DeployRecord`] follows the state machine
//! `PENDING -> BUILDING -> LIVE | FAILED`. Terminal states never change, and
//! a rollback is recorded as a new record rather than by mutating the
//! failed one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Observed state of one deploy attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeployStatus {
    /// Request accepted by the host
    Pending,
    /// Build or rollout in progress
    Building,
    /// Terminal success
    Live,
    /// Terminal failure
    Failed,
}

impl DeployStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployStatus::Live | DeployStatus::Failed)
    }

    /// Whether moving from `self` to `next` respects the state machine
    pub fn can_transition_to(self, next: DeployStatus) -> bool {
        use DeployStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Pending, Building | Live | Failed) => true,
            (Building, Live | Failed) => true,
            _ => false,
        }
    }
}

/// Why a deploy record was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeployKind {
    Deploy,
    Rollback,
}

/// One deploy attempt of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRecord {
    /// Host-assigned id; absent when the trigger call itself failed
    pub id: Option<String>,
    pub service_id: String,
    pub triggered_at: DateTime<Utc>,
    pub status: DeployStatus,
    pub kind: DeployKind,
}

/// Returned when a status update would leave a terminal state or go backwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: DeployStatus,
    pub to: DeployStatus,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid deploy transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}

impl DeployRecord {
    /// Record for a trigger the host accepted
    pub fn accepted(
        id: String,
        service_id: String,
        status: DeployStatus,
        kind: DeployKind,
    ) -> Self {
        Self {
            id: Some(id),
            service_id,
            triggered_at: Utc::now(),
            status,
            kind,
        }
    }

    /// Record for a trigger whose call failed outright
    pub fn rejected(service_id: String) -> Self {
        Self {
            id: None,
            service_id,
            triggered_at: Utc::now(),
            status: DeployStatus::Failed,
            kind: DeployKind::Deploy,
        }
    }

    /// Apply a newly observed status
    pub fn observe(&mut self, status: DeployStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(status) {
            return Err(InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        Ok(())
    }
}

/// Why a rollback could not be performed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackUnsupportedReason {
    /// No earlier deploy of the service ever went live
    NoPriorSuccessfulDeploy,
    /// The host does not expose rollback for this service type
    EndpointUnavailable,
}

impl std::fmt::Display for RollbackUnsupportedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackUnsupportedReason::NoPriorSuccessfulDeploy => {
                write!(f, "no previous successful deploy exists")
            }
            RollbackUnsupportedReason::EndpointUnavailable => {
                write!(f, "the deploy host does not support rollback for this service")
            }
        }
    }
}

/// Outcome of a best-effort rollback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RollbackResult {
    RolledBack {
        record: DeployRecord,
        target_deploy_id: String,
    },
    Unsupported {
        reason: RollbackUnsupportedReason,
    },
}
