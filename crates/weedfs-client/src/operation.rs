//! CRUD operations against the cluster.
//!
//! Every call follows a fixed sequence: get a location (assign or resolve),
//! talk to the volume server, classify the reply. Failures at any step come
//! back as a Failed [`OperationResult`] carrying the error; nothing here
//! returns early with an unclassified error.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use weedfs_core::models::{DeleteReceipt, WriteReceipt, DEFAULT_UPLOAD_NAME};
use weedfs_core::{
    ClientConfig, ErrorMetadata, FileId, LogLevel, OperationResult, WeedError,
};

use crate::cache::LocationCache;
use crate::filer::FilerClient;
use crate::http::{build_http_client, ensure_success, json_body, transport_error};
use crate::master::MasterClient;
use crate::resolver::VolumeUrlResolver;
use crate::volume::VolumeClient;

/// Client for create/read/update/delete/exists/copy.
///
/// Cheap to clone; clones share the HTTP connection pool and the location cache.
#[derive(Debug, Clone)]
pub struct WeedClient {
    client: Client,
    config: ClientConfig,
    master: MasterClient,
    resolver: VolumeUrlResolver,
}

impl WeedClient {
    pub fn new(config: ClientConfig) -> Result<Self, WeedError> {
        Self::with_cache(config, LocationCache::new())
    }

    pub fn with_cache(config: ClientConfig, cache: LocationCache) -> Result<Self, WeedError> {
        config
            .validate()
            .map_err(|e| WeedError::Config(e.to_string()))?;

        let client = build_http_client()?;
        let master = MasterClient::from_parts(client.clone(), &config, cache);
        let resolver = VolumeUrlResolver::new(master.clone());

        Ok(Self {
            client,
            config,
            master,
            resolver,
        })
    }

    /// Create client from environment: WEED_MASTER_URL, WEED_CACHE_TTL_SECS, ...
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ClientConfig::from_env()?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn master(&self) -> &MasterClient {
        &self.master
    }

    pub fn resolver(&self) -> &VolumeUrlResolver {
        &self.resolver
    }

    /// Same client and cache with a different per-request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let master = self.master.with_timeout(timeout);
        Self {
            client: self.client.clone(),
            config: self.config.clone().with_request_timeout(timeout),
            resolver: VolumeUrlResolver::new(master.clone()),
            master,
        }
    }

    fn timeout(&self) -> Duration {
        self.config.request_timeout
    }

    /// Client for one volume server's administrative endpoints.
    pub fn volume(&self, base_url: &str) -> VolumeClient {
        VolumeClient::from_parts(self.client.clone(), base_url, self.timeout())
    }

    /// Client for the configured filer.
    pub fn filer(&self) -> Result<FilerClient, WeedError> {
        let filer_url = self
            .config
            .filer_url
            .as_deref()
            .ok_or_else(|| WeedError::Config("filer_url is not configured".to_string()))?;
        Ok(FilerClient::from_parts(
            self.client.clone(),
            filer_url,
            self.timeout(),
        ))
    }

    /// `count` new file ids from a single assign call.
    pub async fn acquire_fids(&self, count: u32) -> Result<Vec<FileId>, WeedError> {
        self.master.acquire_fids(count).await
    }

    /// A random volume URL for `fid`.
    pub async fn get_url(&self, fid: &str, prefer_public: bool) -> Result<String, WeedError> {
        let fid = FileId::parse(fid)?;
        self.resolver.pick_url(&fid, prefer_public).await
    }

    /// Store `content` under a newly assigned file id.
    pub async fn create(&self, content: impl Into<Vec<u8>>, name: &str) -> OperationResult {
        self.put(content, None, name).await
    }

    /// Overwrite the blob stored under `fid`.
    pub async fn update(
        &self,
        content: impl Into<Vec<u8>>,
        fid: &str,
        name: &str,
    ) -> OperationResult {
        self.put(content, Some(fid), name).await
    }

    /// Upload `content`. Without a `fid` one is assigned by the master, and the
    /// assign reply doubles as the location; with a `fid` the location is
    /// resolved through the cache.
    pub async fn put(
        &self,
        content: impl Into<Vec<u8>>,
        fid: Option<&str>,
        name: &str,
    ) -> OperationResult {
        let start = Instant::now();

        let (fid, url) = match self.write_target(fid).await {
            Ok(target) => target,
            Err(e) => return failure("put", fid.unwrap_or_default(), "", name, e),
        };
        let fid = fid.to_string();

        let receipt = match self.post(&url, content.into(), name).await {
            Ok(receipt) => receipt,
            Err(e) => return failure("put", &fid, &url, name, e),
        };

        let result = OperationResult::from_write_receipt(&fid, &url, name, receipt);
        if result.is_success() {
            tracing::info!(
                fid = %fid,
                url = %url,
                size_bytes = result.storage_size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Put successful"
            );
        } else if let Some(e) = &result.error {
            log_failure("put", &fid, &url, e);
        }
        result
    }

    async fn write_target(&self, fid: Option<&str>) -> Result<(FileId, String), WeedError> {
        match fid {
            None => {
                let key = self.master.assign(1).await?;
                let url = key.fid_url(self.config.prefer_public_url);
                tracing::debug!(fid = %key.fid, "No fid given, assigned a new one");
                Ok((key.fid, url))
            }
            Some(text) => {
                let fid = FileId::parse(text)?;
                let url = self
                    .resolver
                    .pick_url(&fid, self.config.prefer_public_url)
                    .await?;
                Ok((fid, url))
            }
        }
    }

    async fn post(&self, url: &str, content: Vec<u8>, name: &str) -> Result<WriteReceipt, WeedError> {
        let file_name = if name.is_empty() {
            DEFAULT_UPLOAD_NAME
        } else {
            name
        };
        let form = Form::new().part(
            file_name.to_string(),
            Part::bytes(content).file_name(file_name.to_string()),
        );

        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(transport_error)?;

        receipt_body(response, "POST", url).await
    }

    /// Fetch the blob stored under `fid`.
    pub async fn read(&self, fid: &str, name: &str) -> OperationResult {
        let start = Instant::now();

        let url = match self.get_url(fid, self.config.prefer_public_url).await {
            Ok(url) => url,
            Err(e) => return failure("read", fid, "", name, e),
        };

        let (content, content_type) = match self.fetch(&url).await {
            Ok(fetched) => fetched,
            Err(e) => return failure("read", fid, &url, name, e),
        };

        tracing::debug!(
            fid = %fid,
            url = %url,
            size_bytes = content.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Read successful"
        );

        let mut result = OperationResult::success(fid, url, name);
        result.storage_size = content.len() as u64;
        result.content_type = content_type;
        result.content = content;
        result
    }

    /// Content only; the failure is returned as the error.
    pub async fn read_content(&self, fid: &str) -> Result<Bytes, WeedError> {
        let result = self.read(fid, "").await;
        if result.is_success() {
            Ok(result.content)
        } else {
            Err(result
                .error
                .unwrap_or(WeedError::RemoteBusinessError(result.message)))
        }
    }

    async fn fetch(&self, url: &str) -> Result<(Bytes, String), WeedError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, &format!("GET {}", url)).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content = response.bytes().await.map_err(transport_error)?;

        Ok((content, content_type))
    }

    /// Remove the blob stored under `fid`. A blob that did not exist comes back
    /// as Failed with `storage_size == 0`; that is an ordinary outcome.
    pub async fn delete(&self, fid: &str, name: &str) -> OperationResult {
        let url = match self.get_url(fid, self.config.prefer_public_url).await {
            Ok(url) => url,
            Err(e) => return failure("delete", fid, "", name, e),
        };

        let receipt: DeleteReceipt = match self.send_delete(&url).await {
            Ok(receipt) => receipt,
            Err(e) => return failure("delete", fid, &url, name, e),
        };
        let not_found = receipt.error.is_none() && receipt.size == Some(0);

        let result = OperationResult::from_delete_receipt(fid, &url, name, receipt);
        if result.is_success() {
            tracing::info!(fid = %fid, url = %url, size_bytes = result.storage_size, "Delete successful");
        } else if not_found {
            tracing::debug!(fid = %fid, url = %url, "Delete found nothing to remove");
        } else if let Some(e) = &result.error {
            log_failure("delete", fid, &url, e);
        }
        result
    }

    async fn send_delete(&self, url: &str) -> Result<DeleteReceipt, WeedError> {
        let response = self
            .client
            .delete(url)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(transport_error)?;
        receipt_body(response, "DELETE", url).await
    }

    /// Whether `fid` exists. Malformed ids are `false` without any network
    /// call, and so is a volume the master cannot resolve.
    pub async fn exists(&self, fid: &str) -> bool {
        let fid = match FileId::parse(fid) {
            Ok(fid) => fid,
            Err(e) => {
                tracing::debug!(error = %e, "exists() on malformed fid");
                return false;
            }
        };

        let url = match self
            .resolver
            .pick_url(&fid, self.config.prefer_public_url)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(fid = %fid, error = %e, "exists() could not resolve volume");
                return false;
            }
        };

        match self
            .client
            .head(&url)
            .timeout(self.timeout())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(fid = %fid, url = %url, error = %e, "HEAD failed");
                false
            }
        }
    }

    /// Replace the blob at `dst_fid` with the blob at `src_fid`. The source is
    /// read fully into memory first; if that read fails nothing is written.
    pub async fn copy(&self, src_fid: &str, dst_fid: &str, name: &str) -> OperationResult {
        if let Err(e) = FileId::parse(dst_fid) {
            return failure("copy", dst_fid, "", name, e);
        }

        let source = self.read(src_fid, name).await;
        if !source.is_success() {
            let message = format!("Copy aborted, reading {} failed: {}", src_fid, source.message);
            let error = source
                .error
                .unwrap_or(WeedError::RemoteBusinessError(source.message));
            let mut result = OperationResult::failed(dst_fid, "", name, error);
            result.message = message;
            return result;
        }

        tracing::debug!(src_fid = %src_fid, dst_fid = %dst_fid, size_bytes = source.content.len(), "Copying");
        self.update(source.content, dst_fid, name).await
    }
}

/// Decode a volume server's JSON reply regardless of status. A non-2xx reply
/// without a JSON body is a transport failure.
async fn receipt_body<T: DeserializeOwned>(
    response: Response,
    method: &str,
    url: &str,
) -> Result<T, WeedError> {
    let status = response.status();
    match json_body(response).await {
        Ok(receipt) => Ok(receipt),
        Err(WeedError::RemoteBusinessError(_)) if !status.is_success() => Err(
            WeedError::transport(
                format!("{} {} failed with status {}", method, url, status),
                status.is_server_error(),
            ),
        ),
        Err(e) => Err(e),
    }
}

fn failure(op: &str, fid: &str, url: &str, name: &str, error: WeedError) -> OperationResult {
    log_failure(op, fid, url, &error);
    OperationResult::failed(fid, url, name, error)
}

fn log_failure(op: &str, fid: &str, url: &str, error: &WeedError) {
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(op, fid = %fid, url = %url, error = %error, code = error.error_code(), "Operation failed")
        }
        LogLevel::Warn => {
            tracing::warn!(op, fid = %fid, url = %url, error = %error, code = error.error_code(), "Operation failed")
        }
        LogLevel::Error => {
            tracing::error!(op, fid = %fid, url = %url, error = %error, code = error.error_code(), "Operation failed")
        }
    }
}
