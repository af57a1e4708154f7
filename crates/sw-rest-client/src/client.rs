// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Shared JSON-over-HTTP transport

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client as HttpClient, Method, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::auth::BearerToken;
use crate::error::{RestClientError, RestClientResult};

const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated JSON client rooted at one API base URL
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: HttpClient,
    base_url: Url,
    token: BearerToken,
}

/// Error body shape shared by both hosts (`{"message": "..."}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl RestClient {
    /// Create a client whose requests all carry `default_headers` and the
    /// bearer token
    pub fn new(
        base_url: Url,
        token: BearerToken,
        default_headers: HeaderMap,
    ) -> RestClientResult<Self> {
        Self::with_timeout(base_url, token, default_headers, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: Url,
        token: BearerToken,
        default_headers: HeaderMap,
        timeout: Duration,
    ) -> RestClientResult<Self> {
        let http_client = HttpClient::builder()
            .user_agent(USER_AGENT)
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base(base_url),
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RestClientResult<T> {
        let (value, _) = self.send(Method::GET, path, &[], None::<&()>).await?;
        Ok(value)
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> RestClientResult<T> {
        let (value, _) = self.send(Method::GET, path, query, None::<&()>).await?;
        Ok(value)
    }

    /// GET that also hands back the response headers
    pub async fn get_with_headers<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> RestClientResult<(T, HeaderMap)> {
        self.send(Method::GET, path, &[], None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> RestClientResult<T> {
        let (value, _) = self.send(Method::POST, path, &[], Some(body)).await?;
        Ok(value)
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> RestClientResult<T> {
        let (value, _) = self.send(Method::PATCH, path, &[], Some(body)).await?;
        Ok(value)
    }

    /// Resolve `path` against the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> RestClientResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> RestClientResult<(T, HeaderMap)> {
        let url = self.endpoint(path)?;
        tracing::debug!(method = %method, url = %url, "sending request");

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .headers(self.token.headers()?);

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.handle_response(method, path, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        response: Response,
    ) -> RestClientResult<(T, HeaderMap)> {
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await?;

        if status.is_success() {
            // Some endpoints answer 202/204 with an empty body
            let text = if text.trim().is_empty() { "null" } else { &text };
            let value = serde_json::from_str(text)?;
            Ok((value, headers))
        } else {
            tracing::debug!(status = %status, path, "request failed");
            Err(RestClientError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status,
                message: error_message(&text),
            })
        }
    }
}

fn normalize_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { message: Some(message) }) => message,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        }
    }
}
