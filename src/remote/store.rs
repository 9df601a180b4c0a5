use async_trait::async_trait;
use uuid::Uuid;

use super::RemoteError;
use crate::messages::{Attachment, Message, Reaction, Thread};
use crate::users::ProfileSummary;

/// Filter/sort/limit reads and row writes against the remote relational
/// store. Row-level authorization happens server-side; a denial surfaces as
/// [`RemoteError::Denied`].
#[async_trait]
pub trait ChatQueries: Send + Sync {
    /// Non-tombstoned messages of a channel, creation time ascending, capped.
    async fn messages_by_channel(&self, channel_id: Uuid, limit: usize) -> Result<Vec<Message>, RemoteError>;

    /// Non-archived threads of a channel, creation time descending, capped.
    async fn threads_by_channel(&self, channel_id: Uuid, limit: usize) -> Result<Vec<Thread>, RemoteError>;

    async fn attachments_by_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Attachment>, RemoteError>;

    async fn reactions_by_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Reaction>, RemoteError>;

    async fn profiles_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileSummary>, RemoteError>;

    /// Must be idempotent for an identical (message, user, emoji) triple.
    async fn insert_reaction(&self, reaction: &Reaction) -> Result<(), RemoteError>;

    async fn remove_reaction(&self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<(), RemoteError>;

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), RemoteError>;

    async fn delete_message(&self, message_id: Uuid) -> Result<(), RemoteError>;
}
