//! The engine's four external collaborators, as injected trait handles:
//! the relational store, the compound-write RPC endpoint, the blob store,
//! and the realtime change-event subscription service. Hosts construct the
//! real implementations; tests substitute [`fake`] ones.

pub mod blobs;
pub mod rpc;
pub mod store;
pub mod subscription;

#[cfg(test)]
pub(crate) mod fake;

pub use blobs::{BlobStore, SignedUrl, SIGNED_URL_TTL};
pub use rpc::ChatRpc;
pub use store::ChatQueries;
pub use subscription::{Realtime, Topic};

use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("permission denied by the remote store")]
    Denied,
    #[error("remote call failed: {0}")]
    Transport(String),
    #[error("malformed remote payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Bundle of collaborator handles passed to the engine constructor.
#[derive(Clone)]
pub struct Remote {
    pub store: Arc<dyn ChatQueries>,
    pub rpc: Arc<dyn ChatRpc>,
    pub blobs: Arc<dyn BlobStore>,
    pub realtime: Arc<dyn Realtime>,
}
