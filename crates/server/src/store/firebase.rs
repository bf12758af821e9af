//! Firebase Realtime Database over its REST interface.
//!
//! `PUT {db}/{node}.json` replaces a node, `GET {db}/{node}.json` reads it
//! back; an absent node reads as JSON `null`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{node_key, RemoteStore, StoreError};

#[derive(Clone, Debug)]
pub struct FirebaseStore {
    http: reqwest::Client,
    db_url: String,
    auth_token: Option<String>,
}

impl FirebaseStore {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(db_url: String, auth_token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Firebase HTTP client")?;
        Ok(Self {
            http,
            db_url: db_url.trim_end_matches('/').to_owned(),
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    fn node_url(&self, path: &str) -> Result<String, StoreError> {
        Ok(format!("{}/{}.json", self.db_url, node_key(path)?))
    }

    fn auth_query(&self) -> Vec<(&'static str, &str)> {
        self.auth_token
            .as_deref()
            .map(|t| vec![("auth", t)])
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn read_node(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let url = self.node_url(path)?;
        let resp = self
            .http
            .get(&url)
            .query(&self.auth_query())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StoreError::ReadFailed(format!("{path}: {e}")))?;

        let value: Value = resp
            .json()
            .await
            .map_err(|e| StoreError::ReadFailed(format!("{path}: {e}")))?;
        Ok((!value.is_null()).then_some(value))
    }

    async fn write_node(&self, path: &str, value: &Value) -> Result<(), StoreError> {
        let url = self.node_url(path)?;
        self.http
            .put(&url)
            .query(&self.auth_query())
            .json(value)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| StoreError::WriteFailed(format!("{path}: {e}")))?;
        Ok(())
    }
}
