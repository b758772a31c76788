//! Shared reqwest plumbing.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use weedfs_core::WeedError;

pub(crate) fn build_http_client() -> Result<Client, WeedError> {
    Client::builder()
        .user_agent(concat!("weedfs-client/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| WeedError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Timeouts and refused connections are worth retrying; everything else is not.
pub(crate) fn transport_error(err: reqwest::Error) -> WeedError {
    let retryable = err.is_timeout() || err.is_connect();
    WeedError::transport(err.to_string(), retryable)
}

/// Read the body and decode it as JSON, whatever the status code was.
pub(crate) async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, WeedError> {
    let body = response.bytes().await.map_err(transport_error)?;
    Ok(serde_json::from_slice(&body)?)
}

/// Fail with the status and body text unless the response is 2xx.
pub(crate) async fn ensure_success(response: Response, what: &str) -> Result<Response, WeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(WeedError::transport(
        format!("{} failed with status {}: {}", what, status, error_text),
        status.is_server_error(),
    ))
}
