use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::RemoteError;

pub const SIGNED_URL_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub path: String,
    pub url: String,
}

/// Bucket+path addressed blob storage that can mint time-limited read URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, mime_type: &str, content: Bytes) -> Result<(), RemoteError>;

    async fn sign(&self, bucket: &str, path: &str, ttl: Duration) -> Result<SignedUrl, RemoteError>;

    async fn sign_batch(&self, bucket: &str, paths: &[String], ttl: Duration) -> Result<Vec<SignedUrl>, RemoteError>;

    /// Best-effort; callers log and carry on when this fails.
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), RemoteError>;
}
