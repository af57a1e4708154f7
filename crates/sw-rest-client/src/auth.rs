// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Bearer-token authentication

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{RestClientError, RestClientResult};

/// An opaque bearer token
///
/// The token is wiped from memory on drop and never shows up in `Debug`
/// output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw token, for the few places that must hand it on
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Last four characters, enough to tell two tokens apart in a log line
    pub fn hint(&self) -> String {
        let tail: String = self.0.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        if self.0.chars().count() <= 8 {
            "****".to_string()
        } else {
            format!("****{}", tail)
        }
    }

    /// `Authorization: Bearer <token>` header, marked sensitive
    pub fn headers(&self) -> RestClientResult<HeaderMap> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|_| RestClientError::Auth("token contains invalid characters".to_string()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken({})", self.hint())
    }
}
