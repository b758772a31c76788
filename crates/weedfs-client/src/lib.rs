//! Async client for a master/volume/filer blob store.
//!
//! The master assigns file ids and knows which volume servers hold which
//! volume; volume servers hold the bytes. [`WeedClient`] ties the two together
//! for create/read/update/delete, resolving volume locations through a
//! time-bounded [`LocationCache`] so a hot volume costs one master lookup per
//! cache lifetime.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use weedfs_client::WeedClient;
//! use weedfs_core::ClientConfig;
//!
//! let client = WeedClient::new(ClientConfig::new("http://localhost:9333"))?;
//! let created = client.create(b"hello".to_vec(), "hello.txt").await;
//! let read = client.read(&created.fid, "hello.txt").await;
//! assert_eq!(read.content.as_ref(), b"hello");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod filer;
mod http;
pub mod master;
pub mod operation;
pub mod resolver;
pub mod volume;

pub use cache::{Clock, LocationCache, ManualClock, SystemClock};
pub use filer::{FilerClient, FilerObject};
pub use master::MasterClient;
pub use operation::WeedClient;
pub use resolver::VolumeUrlResolver;
pub use volume::VolumeClient;
