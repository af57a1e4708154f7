// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Create-or-update of the deployable service

use std::sync::Arc;

use serde::Serialize;
use sw_domain_types::{ServiceDescriptor, ServiceSpec};
use sw_rest_client::{
    with_retry, CreateServiceDetails, CreateServiceRequest, DeployHost, EnvSpecificDetails,
    RemoteService, Retryable, RetryPolicy, UpdateServiceDetails, UpdateServiceRequest,
};

use crate::error::{CoreError, CoreResult};

const SERVICE_TYPE: &str = "web_service";

impl Retryable for CoreError {
    fn is_transient(&self) -> bool {
        match self {
            CoreError::Remote { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// What `ensure_service` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsuredService {
    pub descriptor: ServiceDescriptor,
    pub action: ServiceAction,
}

enum Lookup {
    Found(RemoteService),
    Created(RemoteService),
}

pub struct ServiceRegistry {
    host: Arc<dyn DeployHost>,
    retry: RetryPolicy,
    owner_id: Option<String>,
    auto_deploy: bool,
}

impl ServiceRegistry {
    pub fn new(host: Arc<dyn DeployHost>, retry: RetryPolicy) -> Self {
        Self {
            host,
            retry,
            owner_id: None,
            auto_deploy: false,
        }
    }

    /// Owner new services are created under; without one the first owner
    /// the key can act for is used
    pub fn with_owner_id(mut self, owner_id: Option<String>) -> Self {
        self.owner_id = owner_id;
        self
    }

    pub fn with_auto_deploy(mut self, auto_deploy: bool) -> Self {
        self.auto_deploy = auto_deploy;
        self
    }

    /// Look a service up by recorded id, falling back to an exact name match
    pub async fn find_service(
        &self,
        name: &str,
        known_id: Option<&str>,
    ) -> CoreResult<Option<ServiceDescriptor>> {
        let found = with_retry(&self.retry, "find service", move || self.lookup(name, known_id)).await?;
        Ok(found.map(RemoteService::into_descriptor))
    }

    async fn lookup(&self, name: &str, known_id: Option<&str>) -> CoreResult<Option<RemoteService>> {
        if let Some(id) = known_id {
            match self.host.get_service(id).await {
                Ok(service) => return Ok(Some(service)),
                Err(err) if err.is_not_found() => {
                    tracing::warn!(service_id = id, name, "recorded service id not found, searching by name");
                }
                Err(err) => return Err(CoreError::remote("get service", err)),
            }
        }

        let services = self
            .host
            .find_services_by_name(name)
            .await
            .map_err(|e| CoreError::remote("list services", e))?;
        Ok(services.into_iter().find(|s| s.name == name))
    }

    /// Single attempt; callers decide what is retried
    async fn resolve_owner(&self) -> CoreResult<String> {
        if let Some(owner_id) = &self.owner_id {
            return Ok(owner_id.clone());
        }
        let owners = self
            .host
            .list_owners()
            .await
            .map_err(|e| CoreError::remote("list owners", e))?;
        let owner = owners.into_iter().next().ok_or(CoreError::NoOwner)?;
        tracing::debug!(owner_id = %owner.id, owner = %owner.name, "using first owner");
        Ok(owner.id)
    }

    fn create_request(&self, spec: &ServiceSpec, owner_id: String) -> CreateServiceRequest {
        CreateServiceRequest {
            service_type: SERVICE_TYPE.to_string(),
            name: spec.name.clone(),
            owner_id,
            repo: spec.repository_ref.clone(),
            branch: spec.branch.clone(),
            auto_deploy: if self.auto_deploy { "yes" } else { "no" }.to_string(),
            service_details: CreateServiceDetails {
                runtime: spec.runtime.clone(),
                plan: spec.plan.clone(),
                region: spec.region.clone(),
                env_specific_details: commands(spec),
            },
        }
    }

    /// Create the service from `spec`
    ///
    /// A single attempt: a lost response may still have created the service,
    /// so callers that retry should go through [`ServiceRegistry::ensure_service`].
    pub async fn create_service(&self, spec: &ServiceSpec) -> CoreResult<ServiceDescriptor> {
        let owner_id = self.resolve_owner().await?;
        let service = self
            .host
            .create_service(&self.create_request(spec, owner_id))
            .await
            .map_err(|e| CoreError::remote("create service", e))?;
        tracing::info!(service_id = %service.id, name = %service.name, "created service");
        Ok(service.into_descriptor())
    }

    /// Point an existing service at the repository, branch and commands of
    /// `spec`
    pub async fn update_service(&self, id: &str, spec: &ServiceSpec) -> CoreResult<ServiceDescriptor> {
        let request = UpdateServiceRequest {
            repo: Some(spec.repository_ref.clone()),
            branch: Some(spec.branch.clone()),
            service_details: Some(UpdateServiceDetails {
                env_specific_details: commands(spec),
            }),
        };
        let request = &request;
        let service = with_retry(&self.retry, "update service", move || async move {
            self.host
                .update_service(id, request)
                .await
                .map_err(|e| CoreError::remote("update service", e))
        })
        .await?;

        let descriptor = service.into_descriptor();
        if !descriptor.matches(spec) {
            tracing::warn!(service_id = id, "service settings differ from the requested ones after update");
        }
        tracing::info!(service_id = id, "updated service");
        Ok(descriptor)
    }

    /// Find the service and update it, or create it when absent
    ///
    /// The retried unit is "find, then create if still absent": a retry after
    /// a lost create response finds the service instead of creating a second
    /// one.
    pub async fn ensure_service(
        &self,
        spec: &ServiceSpec,
        known_id: Option<&str>,
    ) -> CoreResult<EnsuredService> {
        let lookup = with_retry(&self.retry, "ensure service", move || async move {
            if let Some(service) = self.lookup(&spec.name, known_id).await? {
                return Ok::<_, CoreError>(Lookup::Found(service));
            }
            let owner_id = self.resolve_owner().await?;
            let created = self
                .host
                .create_service(&self.create_request(spec, owner_id))
                .await
                .map_err(|e| CoreError::remote("create service", e))?;
            Ok(Lookup::Created(created))
        })
        .await?;

        match lookup {
            Lookup::Created(service) => {
                tracing::info!(service_id = %service.id, name = %service.name, "created service");
                Ok(EnsuredService {
                    descriptor: service.into_descriptor(),
                    action: ServiceAction::Created,
                })
            }
            Lookup::Found(service) => {
                tracing::debug!(
                    service_id = %service.id,
                    up_to_date = service.clone().into_descriptor().matches(spec),
                    "found existing service"
                );
                let descriptor = self.update_service(&service.id, spec).await?;
                Ok(EnsuredService {
                    descriptor,
                    action: ServiceAction::Updated,
                })
            }
        }
    }
}

fn commands(spec: &ServiceSpec) -> EnvSpecificDetails {
    EnvSpecificDetails {
        build_command: Some(spec.build_command.clone()),
        start_command: Some(spec.start_command.clone()),
    }
}
