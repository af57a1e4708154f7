// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! GitHub REST client

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use sw_domain_types::Identity;
use url::Url;

use crate::api::{AuthenticatedUser, CreateRepositoryRequest, RemoteRepository, SourceHost};
use crate::auth::BearerToken;
use crate::client::RestClient;
use crate::error::RestClientResult;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const SCOPES_HEADER: &str = "x-oauth-scopes";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// [`SourceHost`] backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: RestClient,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: BearerToken) -> RestClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );

        let client = RestClient::new(Url::parse(api_url)?, token, headers)?;
        Ok(Self { client })
    }

    pub fn rest(&self) -> &RestClient {
        &self.client
    }
}

/// Parse the comma-separated `X-OAuth-Scopes` header
fn parse_scopes(headers: &HeaderMap) -> Option<Vec<String>> {
    let raw = headers.get(SCOPES_HEADER)?.to_str().ok()?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn current_user(&self) -> RestClientResult<AuthenticatedUser> {
        let (user, headers): (GitHubUser, _) = self.client.get_with_headers("/user").await?;
        Ok(AuthenticatedUser {
            identity: Identity { login: user.login },
            scopes: parse_scopes(&headers),
        })
    }

    async fn create_repository(
        &self,
        request: &CreateRepositoryRequest,
    ) -> RestClientResult<RemoteRepository> {
        self.client.post("/user/repos", request).await
    }

    async fn get_repository(&self, owner: &str, name: &str) -> RestClientResult<RemoteRepository> {
        self.client.get(&format!("/repos/{}/{}", owner, name)).await
    }
}
