//! Master server client.
//!
//! Assigns new file ids and resolves volume ids to volume server locations.
//! Lookups go through the [`LocationCache`] so repeated resolutions of the same
//! volume within the cache lifetime cost no network round-trip.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use weedfs_core::models::{AssignResponse, LookupResponse};
use weedfs_core::{
    volume_id_of, AssignOptions, AssignedKey, ClientConfig, ClusterStatus, FileId, LocationSet,
    WeedError,
};

use crate::cache::LocationCache;
use crate::http::{build_http_client, ensure_success, json_body, transport_error};

#[derive(Debug, Clone)]
pub struct MasterClient {
    client: Client,
    base_url: String,
    cache: LocationCache,
    cache_ttl: Duration,
    timeout: Duration,
}

impl MasterClient {
    pub fn new(config: &ClientConfig) -> Result<Self, WeedError> {
        Self::with_cache(config, LocationCache::new())
    }

    /// Use an existing cache, e.g. one shared with another client or driven by a
    /// manual clock.
    pub fn with_cache(config: &ClientConfig, cache: LocationCache) -> Result<Self, WeedError> {
        config
            .validate()
            .map_err(|e| WeedError::Config(e.to_string()))?;
        Ok(Self::from_parts(build_http_client()?, config, cache))
    }

    pub(crate) fn from_parts(client: Client, config: &ClientConfig, cache: LocationCache) -> Self {
        Self {
            client,
            base_url: config.master_base().to_string(),
            cache,
            cache_ttl: config.cache_ttl,
            timeout: config.request_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Same client, same cache, different request timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request one new file id reserving `count` consecutive keys.
    pub async fn assign(&self, count: u32) -> Result<AssignedKey, WeedError> {
        self.assign_with(&AssignOptions::with_count(count)).await
    }

    pub async fn assign_with(&self, options: &AssignOptions) -> Result<AssignedKey, WeedError> {
        let url = self.build_url("/dir/assign");
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(&options.query())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(e).into_assignment())?;
        let response = ensure_success(response, "assign")
            .await
            .map_err(WeedError::into_assignment)?;
        let body: AssignResponse = json_body(response)
            .await
            .map_err(WeedError::into_assignment)?;

        let key = AssignedKey::try_from(body).inspect_err(|e| {
            tracing::error!(error = %e, url = %url, "Master refused assign");
        })?;

        tracing::info!(
            fid = %key.fid,
            volume_url = %key.location.url,
            count = key.count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Assigned file id"
        );

        Ok(key)
    }

    /// Assign once and expand the reservation into `count` file ids locally.
    pub async fn acquire_fids(&self, count: u32) -> Result<Vec<FileId>, WeedError> {
        let key = self.assign(count).await?;
        Ok(key.fids())
    }

    /// Resolve a volume id (or any file id on that volume) to its locations.
    ///
    /// Returns `Ok(None)` when the master does not know the volume, so existence
    /// checks need no error handling. Transport failures, other non-2xx replies
    /// and unparsable bodies are `ResolutionFailed`.
    pub async fn resolve(&self, volume_id_or_fid: &str) -> Result<Option<LocationSet>, WeedError> {
        let volume_id = volume_id_of(volume_id_or_fid);
        if volume_id.is_empty() {
            return Err(WeedError::InvalidIdentifier(volume_id_or_fid.to_string()));
        }

        let result = self
            .cache
            .get_or_fetch(volume_id, self.cache_ttl, |vid| self.fetch_locations(vid))
            .await;

        match result {
            Ok(locations) => Ok(Some(locations)),
            Err(WeedError::NoLocationAvailable(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_locations(&self, volume_id: String) -> Result<LocationSet, WeedError> {
        let url = self.build_url("/dir/lookup");
        let start = Instant::now();

        let response = self
            .client
            .get(&url)
            .query(&[("volumeId", volume_id.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| transport_error(e).into_resolution())?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(volume_id = %volume_id, "Master does not know volume");
            return Err(WeedError::NoLocationAvailable(volume_id));
        }

        let response = ensure_success(response, "volume lookup")
            .await
            .map_err(WeedError::into_resolution)?;
        let body: LookupResponse = json_body(response)
            .await
            .map_err(WeedError::into_resolution)?;

        if body.locations.is_empty() {
            tracing::debug!(
                volume_id = %volume_id,
                error = body.error.as_deref().unwrap_or(""),
                "Volume lookup returned no locations"
            );
            return Err(WeedError::NoLocationAvailable(volume_id));
        }

        tracing::debug!(
            volume_id = %volume_id,
            locations = body.locations.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Volume lookup successful"
        );

        Ok(LocationSet::new(body.locations))
    }

    /// Warm the cache for the given volumes. Returns how many resolved; failures
    /// are logged and skipped.
    pub async fn prefetch<I, S>(&self, volume_ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = 0;
        for volume_id in volume_ids {
            let volume_id = volume_id.as_ref();
            match self.resolve(volume_id).await {
                Ok(Some(_)) => resolved += 1,
                Ok(None) => {
                    tracing::debug!(volume_id = %volume_id, "Prefetch skipped unknown volume")
                }
                Err(e) => {
                    tracing::warn!(volume_id = %volume_id, error = %e, "Prefetch failed")
                }
            }
        }
        resolved
    }

    /// Force garbage collection on the cluster. Passthrough, not cached.
    pub async fn vacuum(&self, garbage_threshold: Option<f64>) -> Result<ClusterStatus, WeedError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(threshold) = garbage_threshold {
            query.push(("garbageThreshold", threshold.to_string()));
        }
        tracing::info!(garbage_threshold = ?garbage_threshold, "Triggering vacuum");
        self.get_status("/vol/vacuum", &query).await
    }

    /// Topology and version of the cluster as reported by `/dir/status`.
    pub async fn status(&self) -> Result<ClusterStatus, WeedError> {
        self.get_status("/dir/status", &[]).await
    }

    async fn get_status(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ClusterStatus, WeedError> {
        let url = self.build_url(path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;
        let response = ensure_success(response, path).await?;
        json_body(response).await
    }
}
