// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! REST client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for REST client operations
pub type RestClientResult<T> = std::result::Result<T, RestClientError>;

/// Errors produced by the REST clients
#[derive(Debug, Error)]
pub enum RestClientError {
    /// The request never produced a response (DNS, connect, TLS, timeout)
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    /// The host answered with a non-success status
    #[error("{method} {path} returned {status}: {message}")]
    Status {
        method: String,
        path: String,
        status: StatusCode,
        message: String,
    },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl RestClientError {
    /// HTTP status of the response, when there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RestClientError::Status { status, .. } => Some(*status),
            RestClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Whether repeating the same call could plausibly succeed
    ///
    /// Transport failures, 5xx responses and 429 are transient; every other
    /// status is a definite answer from the host.
    pub fn is_transient(&self) -> bool {
        match self {
            RestClientError::Http(e) => !e.is_decode() && !e.is_builder(),
            RestClientError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// 401 or 403
    pub fn is_auth(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        ) || matches!(self, RestClientError::Auth(_))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// 409, or 422 as used by GitHub for "name already exists"
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::CONFLICT) | Some(StatusCode::UNPROCESSABLE_ENTITY)
        )
    }

    /// The endpoint itself is not offered for this resource
    pub fn is_unsupported_endpoint(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::NOT_FOUND)
                | Some(StatusCode::METHOD_NOT_ALLOWED)
                | Some(StatusCode::NOT_IMPLEMENTED)
        )
    }

    /// Build a status error, mostly useful for fakes and tests
    pub fn status_error(
        method: impl Into<String>,
        path: impl Into<String>,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        RestClientError::Status {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: StatusCode) -> RestClientError {
        RestClientError::status_error("GET", "/x", status, "boom")
    }

    #[test]
    fn test_transient_classification() {
        assert!(with_status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(with_status(StatusCode::SERVICE_UNAVAILABLE).is_transient());
        assert!(with_status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert!(!with_status(StatusCode::UNAUTHORIZED).is_transient());
        assert!(!with_status(StatusCode::UNPROCESSABLE_ENTITY).is_transient());
        assert!(!RestClientError::Auth("x".into()).is_transient());
    }

    #[test]
    fn test_conflict_and_auth() {
        assert!(with_status(StatusCode::UNPROCESSABLE_ENTITY).is_conflict());
        assert!(with_status(StatusCode::CONFLICT).is_conflict());
        assert!(with_status(StatusCode::FORBIDDEN).is_auth());
        assert!(!with_status(StatusCode::NOT_FOUND).is_auth());
    }

    #[test]
    fn test_unsupported_endpoint() {
        assert!(with_status(StatusCode::METHOD_NOT_ALLOWED).is_unsupported_endpoint());
        assert!(with_status(StatusCode::NOT_IMPLEMENTED).is_unsupported_endpoint());
        assert!(!with_status(StatusCode::BAD_REQUEST).is_unsupported_endpoint());
    }

    #[test]
    fn test_display_includes_request() {
        let msg = with_status(StatusCode::BAD_REQUEST).to_string();
        assert_eq!(msg, "GET /x returned 400 Bad Request: boom");
    }
}
