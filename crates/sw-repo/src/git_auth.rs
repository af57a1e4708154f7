// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Header-based git authentication
//!
//! The token reaches git only through `GIT_CONFIG_COUNT` environment entries
//! that set `http.<origin>.extraHeader`. It never appears in a remote URL,
//! in argv, or in `.git/config`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sw_credentials::Credential;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Authorization header value handed to git for one remote
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct GitAuth {
    header: String,
}

impl GitAuth {
    pub fn from_credential(credential: &Credential) -> Self {
        let basic = STANDARD.encode(format!("x-access-token:{}", credential.expose_secret()));
        Self {
            header: format!("AUTHORIZATION: basic {}", basic),
        }
    }

    /// Environment entries that make git send the header to `remote_url`
    ///
    /// The header is scoped to the remote's origin so it is not replayed to
    /// other hosts (submodules, redirects). Non-HTTP remotes get no entries.
    pub fn env_for(&self, remote_url: &str) -> Vec<(String, String)> {
        let Ok(url) = Url::parse(remote_url) else {
            return Vec::new();
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Vec::new();
        }
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
            None => format!("{}://{}/", url.scheme(), host),
        };

        vec![
            ("GIT_CONFIG_COUNT".to_string(), "1".to_string()),
            ("GIT_CONFIG_KEY_0".to_string(), format!("http.{}.extraHeader", origin)),
            ("GIT_CONFIG_VALUE_0".to_string(), self.header.clone()),
        ]
    }
}

impl std::fmt::Debug for GitAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GitAuth([REDACTED])")
    }
}

/// Strip any user info from a URL before it is logged or compared
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if !url.username().is_empty() || url.password().is_some() => {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
