//! weedfs Core Library
//!
//! Identifier model, wire types, error taxonomy and client configuration shared
//! by the weedfs client and CLI.

pub mod config;
pub mod error;
pub mod fid;
pub mod models;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{ErrorMetadata, LogLevel, WeedError, WeedResult};
pub use fid::{volume_id_of, FileId};
pub use models::{
    AssignOptions, AssignedKey, ClusterStatus, Location, LocationSet, OperationResult,
    OperationStatus,
};
