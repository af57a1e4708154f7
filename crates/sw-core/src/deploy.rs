// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Deploy triggering, polling and best-effort rollback

use std::sync::Arc;
use std::time::Duration;

use sw_domain_types::{
    DeployKind, DeployRecord, DeployStatus, RollbackResult, RollbackUnsupportedReason,
};
use sw_rest_client::{with_retry, DeployHost, RemoteDeploy, RetryPolicy};
use tokio::time::Instant;

use crate::error::{CoreError, CoreResult};

/// How many recent deploys are searched for a rollback target
const ROLLBACK_SEARCH_LIMIT: u32 = 20;

pub struct DeployController {
    host: Arc<dyn DeployHost>,
    retry: RetryPolicy,
    poll_interval: Duration,
    timeout: Duration,
}

impl DeployController {
    pub fn new(
        host: Arc<dyn DeployHost>,
        retry: RetryPolicy,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            host,
            retry,
            poll_interval,
            timeout,
        }
    }

    /// Start a deploy of the service's configured branch
    ///
    /// Not retried: a repeated trigger would start a second deploy.
    pub async fn trigger(&self, service_id: &str) -> CoreResult<DeployRecord> {
        let deploy = self
            .host
            .trigger_deploy(service_id)
            .await
            .map_err(|e| CoreError::remote("trigger deploy", e))?;
        tracing::info!(service_id, deploy_id = %deploy.id, status = ?deploy.status, "deploy triggered");
        Ok(record_for(service_id, deploy, DeployKind::Deploy))
    }

    /// Poll until the deploy is live or failed, or the timeout passes
    pub async fn await_outcome(&self, record: &mut DeployRecord) -> CoreResult<DeployStatus> {
        let Some(deploy_id) = record.id.clone() else {
            return Ok(record.status);
        };
        let started = Instant::now();
        let deadline = started + self.timeout;

        while !record.status.is_terminal() {
            if Instant::now() + self.poll_interval > deadline {
                return Err(CoreError::Timeout {
                    deploy_id,
                    waited_secs: started.elapsed().as_secs(),
                    last_status: record.status,
                });
            }
            tokio::time::sleep(self.poll_interval).await;

            let service_id = record.service_id.as_str();
            let id = deploy_id.as_str();
            let deploy = with_retry(&self.retry, "poll deploy", move || async move {
                self.host
                    .get_deploy(service_id, id)
                    .await
                    .map_err(|e| CoreError::remote("poll deploy", e))
            })
            .await?;

            let Some(status) = deploy.status.known_status() else {
                tracing::debug!(deploy_id = %deploy_id, "unrecognised deploy status, still waiting");
                continue;
            };
            if status != record.status {
                tracing::info!(
                    deploy_id = %deploy_id,
                    from = %record.status,
                    to = %status,
                    remote_status = ?deploy.status,
                    "deploy status changed"
                );
            }
            record.observe(status)?;
        }

        Ok(record.status)
    }

    /// Roll the service back to its most recent successful deploy
    ///
    /// Issues at most one rollback request. `failed_deploy_id` is never
    /// chosen as the target.
    pub async fn rollback(
        &self,
        service_id: &str,
        failed_deploy_id: Option<&str>,
    ) -> CoreResult<RollbackResult> {
        let deploys = with_retry(&self.retry, "list deploys", move || async move {
            self.host
                .list_deploys(service_id, ROLLBACK_SEARCH_LIMIT)
                .await
                .map_err(|e| CoreError::remote("list deploys", e))
        })
        .await?;

        let Some(target) = deploys
            .into_iter()
            .find(|d| Some(d.id.as_str()) != failed_deploy_id && d.status.was_successful())
        else {
            tracing::warn!(service_id, "no earlier successful deploy to roll back to");
            return Ok(RollbackResult::Unsupported {
                reason: RollbackUnsupportedReason::NoPriorSuccessfulDeploy,
            });
        };

        match self.host.rollback(service_id, &target.id).await {
            Ok(deploy) => {
                tracing::info!(
                    service_id,
                    target_deploy_id = %target.id,
                    rollback_deploy_id = %deploy.id,
                    "rollback requested"
                );
                Ok(RollbackResult::RolledBack {
                    record: record_for(service_id, deploy, DeployKind::Rollback),
                    target_deploy_id: target.id,
                })
            }
            Err(err) if err.is_unsupported_endpoint() => {
                tracing::warn!(service_id, error = %err, "deploy host cannot roll back this service");
                Ok(RollbackResult::Unsupported {
                    reason: RollbackUnsupportedReason::EndpointUnavailable,
                })
            }
            Err(err) => Err(CoreError::remote("rollback", err)),
        }
    }

    /// Public URL of the service, when the host reports one
    pub async fn live_url(&self, service_id: &str) -> CoreResult<Option<String>> {
        let service = with_retry(&self.retry, "get service", move || async move {
            self.host
                .get_service(service_id)
                .await
                .map_err(|e| CoreError::remote("get service", e))
        })
        .await?;
        Ok(service.into_descriptor().live_url)
    }

    /// Most recent deploys of the service
    pub async fn recent_deploys(&self, service_id: &str, limit: u32) -> CoreResult<Vec<RemoteDeploy>> {
        with_retry(&self.retry, "list deploys", move || async move {
            self.host
                .list_deploys(service_id, limit)
                .await
                .map_err(|e| CoreError::remote("list deploys", e))
        })
        .await
    }
}

fn record_for(service_id: &str, deploy: RemoteDeploy, kind: DeployKind) -> DeployRecord {
    let mut record = DeployRecord::accepted(
        deploy.id,
        service_id.to_string(),
        deploy.status.to_deploy_status(),
        kind,
    );
    if let Some(created_at) = deploy.created_at {
        record.triggered_at = created_at;
    }
    record
}
