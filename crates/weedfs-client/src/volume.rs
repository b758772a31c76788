//! Volume server administrative endpoints.

use std::time::Duration;

use reqwest::Client;
use weedfs_core::models::with_scheme;
use weedfs_core::{ClusterStatus, WeedError};

use crate::http::{build_http_client, ensure_success, json_body, transport_error};

#[derive(Debug, Clone)]
pub struct VolumeClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl VolumeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeedError> {
        Ok(Self::from_parts(build_http_client()?, base_url, timeout))
    }

    pub(crate) fn from_parts(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: with_scheme(base_url).trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /status`, passed through untouched.
    pub async fn status(&self) -> Result<ClusterStatus, WeedError> {
        let url = format!("{}/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, "volume status").await?;
        json_body(response).await.inspect_err(|e| {
            tracing::error!(url = %url, error = %e, "Could not read volume status");
        })
    }
}
