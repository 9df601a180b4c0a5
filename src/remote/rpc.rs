use async_trait::async_trait;
use uuid::Uuid;

use super::RemoteError;
use crate::messages::{CreateThread, SendMessage, ThreadCreated};

/// The two compound writes. Generated identifiers come back to the caller so
/// the sender can mirror its own message without waiting for the change
/// stream to echo it.
#[async_trait]
pub trait ChatRpc: Send + Sync {
    async fn send_message(&self, params: &SendMessage) -> Result<Uuid, RemoteError>;

    async fn create_thread(&self, params: &CreateThread) -> Result<ThreadCreated, RemoteError>;
}
