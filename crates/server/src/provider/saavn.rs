//! [`CatalogProvider`] backed by the JioSaavn web API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::debug;

use super::{CatalogProvider, ProviderError};

/// Parameters every web API call carries.
const COMMON_PARAMS: [(&str, &str); 4] = [
    ("_format", "json"),
    ("_marker", "0"),
    ("api_version", "4"),
    ("ctx", "web6dot0"),
];

const USER_AGENT: &str = concat!("sanvia/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the JioSaavn `api.php` endpoint.
#[derive(Clone, Debug)]
pub struct SaavnClient {
    http: reqwest::Client,
    base_url: String,
}

impl SaavnClient {
    /// Build a client talking to `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build catalog HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Invoke one `__call` method and parse the body as JSON.
    async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value, ProviderError> {
        debug!(method, "calling catalog provider");
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[("__call", method)])
            .query(&COMMON_PARAMS)
            .query(params)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{method}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "{method}: HTTP {status}"
            )));
        }

        // The API labels JSON bodies as text/html, so decode by hand.
        let body: Bytes = resp
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("{method}: {e}")))?;
        serde_json::from_slice(&body).map_err(|e| ProviderError::Malformed(format!("{method}: {e}")))
    }
}

#[async_trait]
impl CatalogProvider for SaavnClient {
    async fn get_playlist(&self, url: &str, limit: usize) -> Result<Value, ProviderError> {
        let token = playlist_token(url)?;
        let body = self
            .call(
                "webapi.get",
                &[
                    ("token", token.to_owned()),
                    ("type", "playlist".into()),
                    ("p", "1".into()),
                    ("n", limit.to_string()),
                    ("includeMetaTags", "0".into()),
                ],
            )
            .await?;
        Ok(json!({ "data": body }))
    }

    async fn get_new_releases(&self) -> Result<Value, ProviderError> {
        // content.getAlbums already answers with a top-level `data` list.
        self.call("content.getAlbums", &[("p", "1".into()), ("n", "50".into())])
            .await
    }

    async fn search_albums(&self, query: &str, limit: usize) -> Result<Value, ProviderError> {
        let body = self
            .call(
                "search.getAlbumResults",
                &[
                    ("q", query.to_owned()),
                    ("p", "1".into()),
                    ("n", limit.to_string()),
                ],
            )
            .await?;
        Ok(json!({ "data": body }))
    }

    async fn search_catalog(&self, query: &str, limit: usize) -> Result<Value, ProviderError> {
        let body = self
            .call(
                "search.getResults",
                &[
                    ("q", query.to_owned()),
                    ("p", "1".into()),
                    ("n", limit.to_string()),
                ],
            )
            .await?;
        Ok(json!({ "data": body }))
    }

    async fn get_top_artists(&self) -> Result<Value, ProviderError> {
        let body = self.call("social.getTopArtists", &[]).await?;
        Ok(json!({ "data": body }))
    }
}

/// Extract the playlist token: the last non-empty path segment of the URL.
fn playlist_token(url: &str) -> Result<&str, ProviderError> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|t| !t.is_empty() && !t.contains(':'))
        .ok_or_else(|| ProviderError::InvalidRequest(format!("no playlist token in '{url}'")))
}
