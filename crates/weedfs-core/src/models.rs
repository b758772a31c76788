//! Wire and result types shared by the weedfs client.
//!
//! Master and volume responses are deserialized into typed records here. The
//! JSON shapes follow the master/volume HTTP API; unknown fields are ignored.

use bytes::Bytes;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::WeedError;
use crate::fid::FileId;

/// Default multipart file name when the caller supplies none.
pub const DEFAULT_UPLOAD_NAME: &str = "a.unknown";

/// Passthrough JSON returned by status and vacuum endpoints.
pub type ClusterStatus = serde_json::Value;

/// One reachable volume server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub url: String,
    #[serde(rename = "publicUrl", default)]
    pub public_url: String,
}

impl Location {
    pub fn new(url: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_url: public_url.into(),
        }
    }

    /// Base URL of this server with a scheme and no trailing slash. Falls back to
    /// the internal address when no public one was advertised.
    pub fn base_url(&self, prefer_public: bool) -> String {
        let addr = if prefer_public && !self.public_url.is_empty() {
            &self.public_url
        } else {
            &self.url
        };
        with_scheme(addr)
    }

    /// `base_url + "/" + fid`
    pub fn fid_url(&self, fid: &FileId, prefer_public: bool) -> String {
        format!("{}/{}", self.base_url(prefer_public), fid)
    }
}

/// Master addresses come back as `host:port`; prefix `http://` unless a scheme
/// is already present.
pub fn with_scheme(addr: &str) -> String {
    let addr = addr.trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

/// Interchangeable replicas serving one volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationSet {
    locations: Vec<Location>,
}

impl LocationSet {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter()
    }

    /// Uniform random pick over the whole set, fresh on every call.
    pub fn choose(&self) -> Option<&Location> {
        self.choose_with(&mut rand::rng())
    }

    pub fn choose_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Location> {
        self.locations.choose(rng)
    }
}

impl From<Vec<Location>> for LocationSet {
    fn from(locations: Vec<Location>) -> Self {
        Self::new(locations)
    }
}

/// `GET /dir/lookup?volumeId=ID`
#[derive(Debug, Clone, Deserialize)]
pub struct LookupResponse {
    #[serde(rename = "volumeId", default)]
    pub volume_id: Option<String>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /dir/assign`
#[derive(Debug, Clone, Deserialize)]
pub struct AssignResponse {
    #[serde(default)]
    pub fid: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "publicUrl", default)]
    pub public_url: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Query parameters for an assign call. Only set fields are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignOptions {
    pub count: u32,
    pub collection: Option<String>,
    pub replication: Option<String>,
    pub ttl: Option<String>,
    pub data_center: Option<String>,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            count: 1,
            collection: None,
            replication: None,
            ttl: None,
            data_center: None,
        }
    }
}

impl AssignOptions {
    pub fn with_count(count: u32) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("count", self.count.max(1).to_string())];
        if let Some(collection) = &self.collection {
            query.push(("collection", collection.clone()));
        }
        if let Some(replication) = &self.replication {
            query.push(("replication", replication.clone()));
        }
        if let Some(ttl) = &self.ttl {
            query.push(("ttl", ttl.clone()));
        }
        if let Some(data_center) = &self.data_center {
            query.push(("dataCenter", data_center.clone()));
        }
        query
    }
}

/// A freshly assigned file id and the volume server that will hold it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedKey {
    pub fid: FileId,
    pub location: Location,
    pub count: u32,
}

impl AssignedKey {
    /// All ids reserved by the assign call, base id first.
    pub fn fids(&self) -> Vec<FileId> {
        self.fid.derive_batch(self.count.max(1))
    }

    pub fn fid_url(&self, prefer_public: bool) -> String {
        self.location.fid_url(&self.fid, prefer_public)
    }
}

impl TryFrom<AssignResponse> for AssignedKey {
    type Error = WeedError;

    fn try_from(response: AssignResponse) -> Result<Self, Self::Error> {
        if let Some(error) = response.error.filter(|e| !e.is_empty()) {
            return Err(WeedError::assignment(error));
        }
        if response.url.is_empty() {
            return Err(WeedError::assignment("assign response has no volume url"));
        }
        let fid = FileId::parse(&response.fid)
            .map_err(|e| WeedError::assignment(format!("master returned {}", e)))?;

        Ok(AssignedKey {
            fid,
            location: Location::new(response.url, response.public_url),
            count: response.count.max(1),
        })
    }
}

/// `POST {volume}/{fid}` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WriteReceipt {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "eTag", default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `DELETE {volume}/{fid}` response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteReceipt {
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failed,
}

/// Outcome of one CRUD call. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub status: OperationStatus,
    pub message: String,
    pub fid: String,
    pub url: String,
    pub name: String,
    pub storage_size: u64,
    pub etag: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Bytes,
    #[serde(skip)]
    pub error: Option<WeedError>,
}

impl OperationResult {
    pub fn success(fid: impl Into<String>, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Success,
            message: "ok".to_string(),
            fid: fid.into(),
            url: url.into(),
            name: name.into(),
            storage_size: 0,
            etag: String::new(),
            content_type: String::new(),
            content: Bytes::new(),
            error: None,
        }
    }

    pub fn failed(
        fid: impl Into<String>,
        url: impl Into<String>,
        name: impl Into<String>,
        error: WeedError,
    ) -> Self {
        Self {
            status: OperationStatus::Failed,
            message: error.to_string(),
            error: Some(error),
            ..Self::success(fid, url, name)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Success
    }

    /// Classify a volume server's reply to a write. The body decides, not the
    /// HTTP status: an `error` field or a missing/zero `size` is a failure.
    pub fn from_write_receipt(
        fid: impl Into<String>,
        url: impl Into<String>,
        name: &str,
        receipt: WriteReceipt,
    ) -> Self {
        let fid = fid.into();
        let url = url.into();
        let stored_name = receipt
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| name.to_string());
        let size = receipt.size.unwrap_or(0);

        let mut result = if let Some(error) = receipt.error.filter(|e| !e.is_empty()) {
            Self::failed(&fid, &url, stored_name, WeedError::RemoteBusinessError(error))
        } else if size == 0 {
            Self::failed(
                &fid,
                &url,
                stored_name,
                WeedError::RemoteBusinessError(format!("volume stored 0 bytes at {}", url)),
            )
        } else {
            Self::success(&fid, &url, stored_name)
        };
        result.storage_size = size;
        result.etag = receipt.etag.unwrap_or_default();
        result
    }

    /// Classify a volume server's reply to a delete. `size == 0` means the
    /// blob did not exist, reported as Failed with `storage_size == 0`.
    pub fn from_delete_receipt(
        fid: impl Into<String>,
        url: impl Into<String>,
        name: &str,
        receipt: DeleteReceipt,
    ) -> Self {
        let fid = fid.into();
        let url = url.into();

        let mut result = match (receipt.error.filter(|e| !e.is_empty()), receipt.size) {
            (Some(error), _) => {
                Self::failed(&fid, &url, name, WeedError::RemoteBusinessError(error))
            }
            (None, Some(size)) if size > 0 => Self::success(&fid, &url, name),
            (None, Some(_)) => Self::failed(
                &fid,
                &url,
                name,
                WeedError::RemoteBusinessError(format!("fid {} does not exist", fid)),
            ),
            (None, None) => Self::failed(
                &fid,
                &url,
                name,
                WeedError::RemoteBusinessError("delete response has no size".to_string()),
            ),
        };
        result.storage_size = receipt.size.unwrap_or(0);
        result
    }
}
