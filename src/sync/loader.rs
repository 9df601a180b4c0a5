use itertools::Itertools;
use uuid::Uuid;

use crate::error::AppError;
use crate::media::CHAT_MEDIA_BUCKET;
use crate::remote::{Remote, SignedUrl, SIGNED_URL_TTL};
use crate::store::{Snapshot, MESSAGE_CAP, THREAD_CAP};

pub(crate) struct LoadedChannel {
    pub snapshot: Snapshot,
    pub urls: Vec<SignedUrl>,
}

/// Bulk load of one channel: rows, referenced profiles and one batch signing
/// request. Nothing is mutated by this function; any query failure aborts
/// the whole load and the previous local state stays visible.
pub(crate) async fn load_channel(remote: &Remote, channel_id: Uuid) -> Result<LoadedChannel, AppError> {
    let messages = remote.store.messages_by_channel(channel_id, MESSAGE_CAP).await?;
    let threads = remote.store.threads_by_channel(channel_id, THREAD_CAP).await?;

    let message_ids: Vec<Uuid> = messages.iter().map(|message| message.id).collect();
    let attachments = remote.store.attachments_by_messages(&message_ids).await?;
    let reactions = remote.store.reactions_by_messages(&message_ids).await?;

    let user_ids: Vec<Uuid> = messages
        .iter()
        .map(|message| message.sender_id)
        .chain(reactions.iter().map(|reaction| reaction.user_id))
        .chain(threads.iter().map(|thread| thread.creator_id))
        .unique()
        .collect();
    let profiles = remote.store.profiles_by_ids(&user_ids).await?;

    let paths: Vec<String> = attachments
        .iter()
        .filter(|attachment| attachment.is_chat_media())
        .map(|attachment| attachment.path.clone())
        .collect();
    let urls = if paths.is_empty() {
        Vec::new()
    } else {
        remote.blobs.sign_batch(CHAT_MEDIA_BUCKET, &paths, SIGNED_URL_TTL).await?
    };

    Ok(LoadedChannel {
        snapshot: Snapshot {
            channel_id,
            messages,
            threads,
            attachments,
            reactions,
            profiles,
        },
        urls,
    })
}
