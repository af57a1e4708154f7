// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Render REST client (API v1)
//!
//! List endpoints wrap each item together with a pagination cursor, e.g.
//! `[{"service": {...}, "cursor": "..."}]`; only the first page is read
//! since lookups here are by exact name or bounded by `limit`.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{
    CreateServiceRequest, DeployHost, RemoteDeploy, RemoteOwner, RemoteService,
    UpdateServiceRequest,
};
use crate::auth::BearerToken;
use crate::client::RestClient;
use crate::error::RestClientResult;

pub const DEFAULT_RENDER_API_URL: &str = "https://api.render.com/v1";

#[derive(Debug, Deserialize)]
struct OwnerItem {
    owner: RemoteOwner,
}

#[derive(Debug, Deserialize)]
struct ServiceItem {
    service: RemoteService,
}

#[derive(Debug, Deserialize)]
struct DeployItem {
    deploy: RemoteDeploy,
}

/// `POST /services` answers with the service plus the id of the first deploy,
/// which is not used since deploys are always triggered explicitly
#[derive(Debug, Deserialize)]
struct CreateServiceResponse {
    service: RemoteService,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TriggerDeployBody {
    clear_cache: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RollbackBody<'a> {
    deploy_id: &'a str,
}

/// [`DeployHost`] backed by the Render REST API
#[derive(Debug, Clone)]
pub struct RenderClient {
    client: RestClient,
}

impl RenderClient {
    pub fn new(api_url: &str, api_key: BearerToken) -> RestClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = RestClient::new(Url::parse(api_url)?, api_key, headers)?;
        Ok(Self { client })
    }

    pub fn rest(&self) -> &RestClient {
        &self.client
    }
}

#[async_trait]
impl DeployHost for RenderClient {
    async fn list_owners(&self) -> RestClientResult<Vec<RemoteOwner>> {
        let items: Vec<OwnerItem> = self.client.get_with_query("/owners", &[("limit", "20")]).await?;
        Ok(items.into_iter().map(|item| item.owner).collect())
    }

    async fn find_services_by_name(&self, name: &str) -> RestClientResult<Vec<RemoteService>> {
        let items: Vec<ServiceItem> = self
            .client
            .get_with_query("/services", &[("name", name), ("limit", "20")])
            .await?;
        // The name filter is a prefix match on some plans
        Ok(items
            .into_iter()
            .map(|item| item.service)
            .filter(|service| service.name == name)
            .collect())
    }

    async fn get_service(&self, service_id: &str) -> RestClientResult<RemoteService> {
        self.client.get(&format!("/services/{}", service_id)).await
    }

    async fn create_service(&self, request: &CreateServiceRequest) -> RestClientResult<RemoteService> {
        let response: CreateServiceResponse = self.client.post("/services", request).await?;
        Ok(response.service)
    }

    async fn update_service(
        &self,
        service_id: &str,
        request: &UpdateServiceRequest,
    ) -> RestClientResult<RemoteService> {
        self.client
            .patch(&format!("/services/{}", service_id), request)
            .await
    }

    async fn trigger_deploy(&self, service_id: &str) -> RestClientResult<RemoteDeploy> {
        let body = TriggerDeployBody {
            clear_cache: "do_not_clear",
        };
        self.client
            .post(&format!("/services/{}/deploys", service_id), &body)
            .await
    }

    async fn get_deploy(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy> {
        self.client
            .get(&format!("/services/{}/deploys/{}", service_id, deploy_id))
            .await
    }

    async fn list_deploys(&self, service_id: &str, limit: u32) -> RestClientResult<Vec<RemoteDeploy>> {
        let limit = limit.to_string();
        let items: Vec<DeployItem> = self
            .client
            .get_with_query(
                &format!("/services/{}/deploys", service_id),
                &[("limit", limit.as_str())],
            )
            .await?;
        Ok(items.into_iter().map(|item| item.deploy).collect())
    }

    async fn rollback(&self, service_id: &str, deploy_id: &str) -> RestClientResult<RemoteDeploy> {
        self.client
            .post(
                &format!("/services/{}/rollback", service_id),
                &RollbackBody { deploy_id },
            )
            .await
    }
}
