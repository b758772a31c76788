//! Turns a file id into the URL of one volume server holding it.

use weedfs_core::{FileId, Location, WeedError};

use crate::master::MasterClient;

/// Picks a replica uniformly at random on every call. The client knows nothing
/// about replica health, so load is spread blindly; there is no affinity and
/// no retry against another replica.
#[derive(Debug, Clone)]
pub struct VolumeUrlResolver {
    master: MasterClient,
}

impl VolumeUrlResolver {
    pub fn new(master: MasterClient) -> Self {
        Self { master }
    }

    pub fn master(&self) -> &MasterClient {
        &self.master
    }

    /// One location serving `volume_id`. Unknown volumes and empty location
    /// sets are `NoLocationAvailable`; lookup failures propagate.
    pub async fn pick_location(&self, volume_id: &str) -> Result<Location, WeedError> {
        let locations = self
            .master
            .resolve(volume_id)
            .await?
            .ok_or_else(|| WeedError::NoLocationAvailable(volume_id.to_string()))?;

        locations
            .choose()
            .cloned()
            .ok_or_else(|| WeedError::NoLocationAvailable(volume_id.to_string()))
    }

    /// `http://<volume server>/<fid>`
    pub async fn pick_url(&self, fid: &FileId, prefer_public: bool) -> Result<String, WeedError> {
        let location = self.pick_location(fid.volume_id()).await?;
        Ok(location.fid_url(fid, prefer_public))
    }
}
