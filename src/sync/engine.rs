use std::time::Duration;

use bytes::Bytes;
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::channels::Channel;
use crate::error::AppError;
use crate::events::{reconciler, ChangeEvent, FollowUp, PendingBuffer};
use crate::media::{self, MediaUrlCache, CHAT_MEDIA_BUCKET};
use crate::messages::{Attachment, AttachmentKind, CreateThread, Message, MessageKind, Reaction, SendMessage, ThreadCreated, Thread};
use crate::remote::{Remote, Topic};
use crate::store::ChatStore;
use crate::sync::loader;
use crate::utils;
use crate::validators::{EMOJI, MESSAGE_BODY, THREAD_TITLE};

/// Delay before a media message missing its attachment rows is re-fetched.
/// Long enough for the attachment's own change event to win the race.
pub const HYDRATION_DEBOUNCE: Duration = Duration::from_millis(650);

/// A deferred attachment check handed to the driver. The generation pins it
/// to the channel that was current when the message arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationTicket {
    pub message_id: Uuid,
    pub generation: u64,
}

/// A blob heading for the chat-media bucket.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub content: Bytes,
    pub mime_type: String,
    pub ext: String,
    pub kind: AttachmentKind,
    pub width: Option<i32>,
    pub height: Option<i32>,
}

/// The synchronization engine for one user's chat view. Single writer: all
/// mutations funnel through `&mut self`, and every completion that crossed an
/// await re-validates the channel generation before touching state.
pub struct ChatSync {
    remote: Remote,
    user_id: Uuid,
    city_id: Uuid,
    store: ChatStore,
    pending: PendingBuffer,
    media: MediaUrlCache,
    channel: Option<Channel>,
    generation: u64,
    events_refresh: u64,
}

impl ChatSync {
    pub fn new(remote: Remote, user_id: Uuid, city_id: Uuid) -> ChatSync {
        ChatSync {
            remote,
            user_id,
            city_id,
            store: ChatStore::default(),
            pending: PendingBuffer::default(),
            media: MediaUrlCache::default(),
            channel: None,
            generation: 0,
            events_refresh: 0,
        }
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn media(&self) -> &MediaUrlCache {
        &self.media
    }

    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped on every city-side event; the host reloads its events screen
    /// whenever it observes a change.
    pub fn events_refresh(&self) -> u64 {
        self.events_refresh
    }

    pub fn set_active_thread(&mut self, thread_id: Option<Uuid>) {
        self.store.set_active_thread(thread_id);
    }

    pub fn set_reply_to(&mut self, message_id: Option<Uuid>) {
        self.store.set_reply_to(message_id);
    }

    pub fn select_message(&mut self, message_id: Option<Uuid>) {
        self.store.select_message(message_id);
    }

    pub async fn subscribe_city_events(&self) -> Result<mpsc::Receiver<ChangeEvent>, AppError> {
        let receiver = self.remote.realtime.subscribe(Topic::city_events(self.city_id)).await?;
        Ok(receiver)
    }

    /// Switch the channel being viewed. The old topic is torn down before the
    /// new load begins so a late event can never leak across channels; the
    /// pending buffer dies with the old channel. Returns the new channel's
    /// event receiver for the driver to pump.
    pub async fn select_channel(&mut self, channel: Option<Channel>) -> Result<Option<mpsc::Receiver<ChangeEvent>>, AppError> {
        if let Some(old) = self.channel.take() {
            let topic = Topic::chat(old.id);
            if let Err(e) = self.remote.realtime.unsubscribe(topic.clone()).await {
                log::warn!("Failed to unsubscribe {}: {}", topic, e);
            }
        }
        self.generation += 1;
        self.pending.clear();

        let Some(channel) = channel else {
            self.store.clear();
            self.media.clear();
            return Ok(None);
        };
        let channel_id = channel.id;
        self.channel = Some(channel);

        let loaded = loader::load_channel(&self.remote, channel_id).await?;
        self.store.replace(loaded.snapshot);
        self.media.replace(loaded.urls);

        let receiver = self.remote.realtime.subscribe(Topic::chat(channel_id)).await?;
        Ok(Some(receiver))
    }

    /// Re-run the snapshot load for the current channel, replacing local
    /// state wholesale on success.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        let Some(channel_id) = self.channel.as_ref().map(|channel| channel.id) else {
            return Ok(());
        };
        let loaded = loader::load_channel(&self.remote, channel_id).await?;
        self.store.replace(loaded.snapshot);
        self.media.replace(loaded.urls);
        // The reload may have brought in parents of buffered children.
        let known: Vec<Uuid> = self.store.messages().iter().map(|message| message.id).collect();
        for message_id in known {
            reconciler::drain_pending(&mut self.store, &mut self.pending, &message_id);
        }
        Ok(())
    }

    /// Apply one change-stream event. Events tagged with a superseded
    /// generation belong to a channel no longer being viewed and are
    /// discarded; city-side events are generation-free.
    pub async fn handle_event(&mut self, generation: u64, event: ChangeEvent) -> Vec<HydrationTicket> {
        if !event.is_city_side() && generation != self.generation {
            return Vec::new();
        }
        let follow_ups = reconciler::apply(&mut self.store, &mut self.pending, &mut self.media, event);
        let mut tickets = Vec::new();
        for follow_up in follow_ups {
            match follow_up {
                FollowUp::FetchProfile(user_id) => self.fetch_profile(user_id).await,
                FollowUp::ScheduleHydration { message_id } => tickets.push(HydrationTicket {
                    message_id,
                    generation: self.generation,
                }),
                FollowUp::CityEventsChanged => self.events_refresh += 1,
            }
        }
        tickets
    }

    async fn fetch_profile(&mut self, user_id: Uuid) {
        match self.remote.store.profiles_by_ids(&[user_id]).await {
            Ok(profiles) => {
                for profile in profiles {
                    self.store.upsert_profile(profile);
                }
            }
            // Missing labels are cosmetic; the next snapshot fills them in.
            Err(e) => log::warn!("Failed to fetch profile {}: {}", user_id, e),
        }
    }

    /// Debounced completion of a [`FollowUp::ScheduleHydration`]. No-ops when
    /// the channel changed, the message is gone, or attachments arrived on
    /// the stream while the timer ran.
    pub async fn hydrate(&mut self, ticket: HydrationTicket) {
        if ticket.generation != self.generation {
            return;
        }
        if self.store.message(&ticket.message_id).is_none() {
            return;
        }
        if !self.store.attachments_of(&ticket.message_id).is_empty() {
            return;
        }
        let ids = [ticket.message_id];
        let attachments = match self.remote.store.attachments_by_messages(&ids).await {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("Hydration fetch failed for {}: {}", ticket.message_id, e);
                return;
            }
        };
        let reactions = match self.remote.store.reactions_by_messages(&ids).await {
            Ok(rows) => rows,
            Err(e) => {
                log::warn!("Hydration fetch failed for {}: {}", ticket.message_id, e);
                return;
            }
        };
        // The world may have moved while the fetches ran.
        if ticket.generation != self.generation || self.store.message(&ticket.message_id).is_none() {
            return;
        }
        let mut paths = Vec::new();
        for attachment in attachments {
            if attachment.message_id != ticket.message_id || attachment.check().is_err() {
                continue;
            }
            if attachment.is_chat_media() {
                paths.push(attachment.path.clone());
            }
            self.store.upsert_attachment(attachment);
        }
        for reaction in reactions {
            if reaction.message_id == ticket.message_id {
                self.store.upsert_reaction(reaction);
            }
        }
        for path in paths {
            if let Err(e) = self.media.ensure(self.remote.blobs.as_ref(), CHAT_MEDIA_BUCKET, &path).await {
                log::warn!("Failed to sign hydrated attachment {}: {}", path, e);
            }
        }
    }

    /// Add or remove the current user's reaction, local-first. On a failed
    /// network call the mutation is inverted; a later authoritative event
    /// converges either way since store merges are idempotent.
    pub async fn toggle_reaction(&mut self, message_id: Uuid, emoji: &str) -> Result<(), AppError> {
        let emoji = emoji.trim();
        EMOJI.run(emoji)?;
        if self.store.message(&message_id).is_none() {
            return Err(AppError::NotFound("message"));
        }
        if self.store.has_reaction(&message_id, &self.user_id, emoji) {
            let removed = self.store.remove_reaction(&message_id, &self.user_id, emoji);
            if let Err(e) = self.remote.store.remove_reaction(message_id, self.user_id, emoji).await {
                if let Some(reaction) = removed {
                    self.store.upsert_reaction(reaction);
                }
                return Err(e.into());
            }
        } else {
            let reaction = Reaction {
                message_id,
                user_id: self.user_id,
                emoji: emoji.to_string(),
                created: utils::now(),
            };
            self.store.upsert_reaction(reaction.clone());
            if let Err(e) = self.remote.store.insert_reaction(&reaction).await {
                self.store.remove_reaction(&message_id, &self.user_id, emoji);
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub async fn send_text(&mut self, body: &str, thread_id: Option<Uuid>, reply_to: Option<Uuid>) -> Result<Uuid, AppError> {
        let channel_id = self.require_channel()?;
        MESSAGE_BODY.run(body)?;
        let thread_id = self.resolve_thread(thread_id, reply_to)?;
        let params = SendMessage {
            channel_id,
            body: Some(body.to_string()),
            kind: MessageKind::Text,
            thread_id,
            reply_to,
            metadata: None,
        };
        let message_id = self.remote.rpc.send_message(&params).await?;
        self.apply_local_message(Message {
            id: message_id,
            channel_id,
            sender_id: self.user_id,
            thread_id,
            reply_to,
            kind: MessageKind::Text,
            body: body.to_string(),
            metadata: JsonValue::Null,
            deleted: None,
            created: utils::now(),
        });
        Ok(message_id)
    }

    /// Keyboard gifs are remote URLs carried in metadata; nothing is uploaded.
    pub async fn send_gif(
        &mut self,
        gif_url: &str,
        source_url: Option<&str>,
        thread_id: Option<Uuid>,
        reply_to: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        let channel_id = self.require_channel()?;
        if gif_url.trim().is_empty() {
            return Err(AppError::ValidationFail("Gif url cannot be blank.".to_string()));
        }
        let thread_id = self.resolve_thread(thread_id, reply_to)?;
        let mut metadata = serde_json::json!({ "gif_url": gif_url });
        if let Some(source_url) = source_url {
            metadata["source_url"] = source_url.into();
        }
        let params = SendMessage {
            channel_id,
            body: None,
            kind: MessageKind::Gif,
            thread_id,
            reply_to,
            metadata: Some(metadata.clone()),
        };
        let message_id = self.remote.rpc.send_message(&params).await?;
        self.apply_local_message(Message {
            id: message_id,
            channel_id,
            sender_id: self.user_id,
            thread_id,
            reply_to,
            kind: MessageKind::Gif,
            body: String::new(),
            metadata,
            deleted: None,
            created: utils::now(),
        });
        Ok(message_id)
    }

    /// Upload to the structured object path, send, then mirror the message
    /// and its attachment row locally with the server-minted message id.
    pub async fn send_media(&mut self, upload: MediaUpload, thread_id: Option<Uuid>, reply_to: Option<Uuid>) -> Result<Uuid, AppError> {
        let channel_id = self.require_channel()?;
        if upload.content.is_empty() {
            return Err(AppError::ValidationFail("Upload is empty.".to_string()));
        }
        if upload.mime_type.parse::<mime::Mime>().is_err() {
            return Err(AppError::ValidationFail("Unrecognized content type.".to_string()));
        }
        let thread_id = self.resolve_thread(thread_id, reply_to)?;
        let path = media::object_path(channel_id, self.user_id, &upload.ext);

        self.remote
            .blobs
            .upload(CHAT_MEDIA_BUCKET, &path, &upload.mime_type, upload.content.clone())
            .await?;

        let kind = if upload.kind == AttachmentKind::Gif {
            MessageKind::Gif
        } else {
            MessageKind::Image
        };
        let params = SendMessage {
            channel_id,
            body: None,
            kind,
            thread_id,
            reply_to,
            metadata: None,
        };
        let message_id = self.remote.rpc.send_message(&params).await?;

        let attachment = Attachment {
            id: utils::id(),
            message_id,
            uploader_id: self.user_id,
            kind: upload.kind,
            bucket: CHAT_MEDIA_BUCKET.to_string(),
            path: path.clone(),
            mime_type: upload.mime_type.clone(),
            size: upload.content.len() as i64,
            width: upload.width,
            height: upload.height,
            created: utils::now(),
        };
        self.remote.store.insert_attachment(&attachment).await?;

        self.apply_local_message(Message {
            id: message_id,
            channel_id,
            sender_id: self.user_id,
            thread_id,
            reply_to,
            kind,
            body: String::new(),
            metadata: JsonValue::Null,
            deleted: None,
            created: utils::now(),
        });
        self.store.upsert_attachment(attachment);
        if let Err(e) = self.media.ensure(self.remote.blobs.as_ref(), CHAT_MEDIA_BUCKET, &path).await {
            log::warn!("Failed to sign fresh upload {}: {}", path, e);
        }
        Ok(message_id)
    }

    /// Create a thread together with its root message, then mirror both.
    pub async fn create_thread(&mut self, title: Option<&str>, body: &str, kind: MessageKind) -> Result<ThreadCreated, AppError> {
        let channel_id = self.require_channel()?;
        Message::check_body(kind, body)?;
        let title = title.map(utils::merge_blank).filter(|title| !title.is_empty());
        if let Some(title) = &title {
            THREAD_TITLE.run(title.as_str())?;
        }
        let params = CreateThread {
            channel_id,
            body: body.to_string(),
            title: title.clone(),
            kind,
        };
        let created = self.remote.rpc.create_thread(&params).await?;
        let now = utils::now();
        self.store.upsert_thread(Thread {
            id: created.thread_id,
            channel_id,
            creator_id: self.user_id,
            title,
            archived: None,
            created: now,
        });
        self.apply_local_message(Message {
            id: created.message_id,
            channel_id,
            sender_id: self.user_id,
            thread_id: Some(created.thread_id),
            reply_to: None,
            kind,
            body: body.to_string(),
            metadata: JsonValue::Null,
            deleted: None,
            created: now,
        });
        Ok(created)
    }

    /// Remove one's own message: optimistic local removal, best-effort blob
    /// cleanup, then the row delete. A failed row delete resynchronizes with
    /// a full snapshot, since a half-finished blob cleanup can't be inverted.
    pub async fn delete_message(&mut self, message_id: Uuid) -> Result<(), AppError> {
        let sender_id = self
            .store
            .message(&message_id)
            .map(|message| message.sender_id)
            .ok_or(AppError::NotFound("message"))?;
        if sender_id != self.user_id {
            return Err(AppError::NoPermission);
        }
        let paths: Vec<String> = self
            .store
            .attachments_of(&message_id)
            .iter()
            .filter(|attachment| attachment.is_chat_media())
            .map(|attachment| attachment.path.clone())
            .collect();

        self.store.remove_message(&message_id);
        for path in &paths {
            self.media.evict(path);
        }
        if !paths.is_empty() {
            if let Err(e) = self.remote.blobs.remove(CHAT_MEDIA_BUCKET, &paths).await {
                log::warn!("Best-effort media cleanup failed for {}: {}", message_id, e);
            }
        }
        if let Err(e) = self.remote.store.delete_message(message_id).await {
            if let Err(reload) = self.refresh().await {
                log::warn!("Resync after failed deletion also failed: {}", reload);
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Signed URL for a chat-media path, signing on a cache miss.
    pub async fn media_url(&mut self, path: &str) -> Result<String, AppError> {
        let url = self.media.ensure(self.remote.blobs.as_ref(), CHAT_MEDIA_BUCKET, path).await?;
        Ok(url.to_string())
    }

    fn require_channel(&self) -> Result<Uuid, AppError> {
        self.channel.as_ref().map(|channel| channel.id).ok_or(AppError::NotFound("channel"))
    }

    /// Replies inherit the target's thread when the caller passed none; a
    /// conflicting explicit thread is a caller bug, not something to paper
    /// over silently.
    fn resolve_thread(&self, thread_id: Option<Uuid>, reply_to: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
        let Some(target_id) = reply_to else {
            return Ok(thread_id);
        };
        let target = self.store.message(&target_id).ok_or(AppError::NotFound("reply target"))?;
        if Some(target.channel_id) != self.store.channel_id() {
            return Err(AppError::ValidationFail(
                "Reply target belongs to another channel.".to_string(),
            ));
        }
        match (thread_id, target.thread_id) {
            (None, inherited) => Ok(inherited),
            (Some(thread), Some(target_thread)) if thread == target_thread => Ok(Some(thread)),
            _ => Err(AppError::ValidationFail(
                "Reply target is not in that thread.".to_string(),
            )),
        }
    }

    fn apply_local_message(&mut self, message: Message) {
        let message_id = message.id;
        self.store.upsert_message(message);
        reconciler::drain_pending(&mut self.store, &mut self.pending, &message_id);
    }
}
