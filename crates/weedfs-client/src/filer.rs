//! Filer: path-addressed access on top of the blob store.
//!
//! The filer's directory schema is not modelled; listings come back as raw
//! JSON. Transport failures keep their `Transport` classification, any other
//! non-2xx reply is `WeedError::Filer`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Serialize;
use weedfs_core::models::with_scheme;
use weedfs_core::WeedError;

use crate::http::{build_http_client, json_body, transport_error};

const DIRECTORY_MARKER: &str = ".info";

/// A file fetched from the filer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilerObject {
    pub content_length: Option<u64>,
    pub content_type: String,
    #[serde(skip)]
    pub content: Bytes,
}

#[derive(Debug, Clone)]
pub struct FilerClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl FilerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WeedError> {
        Ok(Self::from_parts(build_http_client()?, base_url, timeout))
    }

    pub(crate) fn from_parts(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: with_scheme(base_url),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get(&self, path: &str) -> Result<FilerObject, WeedError> {
        let url = self.url_for(path);
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check("GET", &url, response)?;

        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content = response.bytes().await.map_err(transport_error)?;

        Ok(FilerObject {
            content_length,
            content_type,
            content,
        })
    }

    /// Upload `content` to `path`. Returns the path on success.
    pub async fn put(&self, content: impl Into<Vec<u8>>, path: &str) -> Result<String, WeedError> {
        let url = self.url_for(path);
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let form = Form::new().part("file", Part::bytes(content.into()).file_name(file_name));

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        check("POST", &url, response)?;

        tracing::info!(path = %path, "Filer put successful");
        Ok(path.to_string())
    }

    /// `Ok(false)` when the filer refused the delete.
    pub async fn delete(&self, path: &str) -> Result<bool, WeedError> {
        let url = self.url_for(path);
        let response = self
            .client
            .delete(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let ok = response.status().is_success();
        if !ok {
            tracing::warn!(path = %path, status = %response.status(), "Filer delete refused");
        }
        Ok(ok)
    }

    /// Sub-directories and files of `directory`.
    pub async fn list(&self, directory: &str) -> Result<serde_json::Value, WeedError> {
        let directory = if directory.ends_with('/') {
            directory.to_string()
        } else {
            format!("{}/", directory)
        };
        let url = self.url_for(&directory);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check("GET", &url, response)?;

        json_body(response)
            .await
            .map_err(|e| WeedError::Filer(format!("Listing {} returned bad JSON: {}", url, e)))
    }

    /// Directories exist implicitly on the filer; create one by writing a
    /// marker file into it.
    pub async fn mkdir(&self, directory: &str) -> Result<String, WeedError> {
        let marker = format!("{}/{}", directory.trim_end_matches('/'), DIRECTORY_MARKER);
        self.put(DIRECTORY_MARKER.as_bytes().to_vec(), &marker).await
    }
}

fn check(method: &str, url: &str, response: Response) -> Result<Response, WeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    tracing::error!(method, url = %url, status = %status, "Filer request failed");
    Err(WeedError::Filer(format!("{} {} failed with status {}", method, url, status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_joins_with_single_slash() {
        let filer = FilerClient::new("localhost:8888", Duration::from_secs(1)).unwrap();
        assert_eq!(filer.url_for("/images/a.png"), "http://localhost:8888/images/a.png");
        assert_eq!(filer.url_for("images/a.png"), "http://localhost:8888/images/a.png");
    }

    #[tokio::test]
    async fn get_returns_content_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/docs/readme.txt")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("hello")
            .create_async()
            .await;

        let filer = FilerClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let object = filer.get("/docs/readme.txt").await.unwrap();

        assert_eq!(object.content.as_ref(), b"hello");
        assert_eq!(object.content_type, "text/plain");
        assert_eq!(object.content_length, Some(5));
    }

    #[tokio::test]
    async fn get_missing_is_filer_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/nope")
            .with_status(404)
            .create_async()
            .await;

        let filer = FilerClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let err = filer.get("/nope").await.unwrap_err();

        assert!(matches!(err, WeedError::Filer(_)));
    }
}
