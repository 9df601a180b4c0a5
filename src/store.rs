use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::messages::{Attachment, Message, Reaction, Thread};
use crate::users::ProfileSummary;

pub const MESSAGE_CAP: usize = 250;
pub const THREAD_CAP: usize = 60;

/// One entry of a per-message reaction tally.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionCount {
    pub emoji: String,
    pub count: usize,
    pub mine: bool,
}

/// One-hop resolution of a reply target; never recurses into chains.
#[derive(Debug)]
pub enum ReplyPreview<'a> {
    Message(&'a Message),
    /// The target was evicted, tombstoned, or never loaded. Rendered as an
    /// "original message" placeholder.
    Unavailable,
}

/// A freshly loaded channel state, installed wholesale by [`ChatStore::replace`].
#[derive(Debug)]
pub struct Snapshot {
    pub channel_id: Uuid,
    pub messages: Vec<Message>,
    pub threads: Vec<Thread>,
    pub attachments: Vec<Attachment>,
    pub reactions: Vec<Reaction>,
    pub profiles: Vec<ProfileSummary>,
}

/// In-memory mirror of one channel. Only ever mutated through idempotent
/// upsert/remove primitives keyed by stable ids, so replayed or re-ordered
/// change events converge.
#[derive(Default, Debug)]
pub struct ChatStore {
    channel_id: Option<Uuid>,
    messages: Vec<Message>,
    threads: Vec<Thread>,
    attachments: HashMap<Uuid, Vec<Attachment>>,
    reactions: HashMap<Uuid, Vec<Reaction>>,
    profiles: HashMap<Uuid, ProfileSummary>,
    active_thread: Option<Uuid>,
    reply_to: Option<Uuid>,
    selected: Option<Uuid>,
}

impl ChatStore {
    pub fn channel_id(&self) -> Option<Uuid> {
        self.channel_id
    }

    pub fn message(&self, id: &Uuid) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == *id)
    }

    pub fn thread(&self, id: &Uuid) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.id == *id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn profile(&self, id: &Uuid) -> Option<&ProfileSummary> {
        self.profiles.get(id)
    }

    pub fn active_thread(&self) -> Option<Uuid> {
        self.active_thread
    }

    pub fn set_active_thread(&mut self, thread_id: Option<Uuid>) {
        self.active_thread = thread_id.filter(|id| self.thread(id).is_some());
    }

    pub fn reply_to(&self) -> Option<Uuid> {
        self.reply_to
    }

    pub fn set_reply_to(&mut self, message_id: Option<Uuid>) {
        self.reply_to = message_id.filter(|id| self.message(id).is_some());
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn select_message(&mut self, message_id: Option<Uuid>) {
        self.selected = message_id.filter(|id| self.message(id).is_some());
    }

    pub fn attachments_of(&self, message_id: &Uuid) -> &[Attachment] {
        self.attachments.get(message_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reactions_of(&self, message_id: &Uuid) -> &[Reaction] {
        self.reactions.get(message_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_reaction(&self, message_id: &Uuid, user_id: &Uuid, emoji: &str) -> bool {
        self.reactions_of(message_id)
            .iter()
            .any(|reaction| reaction.user_id == *user_id && reaction.emoji == emoji)
    }

    pub fn upsert_message(&mut self, message: Message) {
        if let Some(slot) = self.messages.iter_mut().find(|slot| slot.id == message.id) {
            *slot = message;
        } else {
            self.messages.push(message);
        }
        self.messages
            .sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        while self.messages.len() > MESSAGE_CAP {
            // Ascending order: the stale end is the front.
            let evicted = self.messages.remove(0);
            self.drop_message_refs(&evicted.id);
        }
    }

    pub fn remove_message(&mut self, id: &Uuid) {
        self.messages.retain(|message| message.id != *id);
        self.drop_message_refs(id);
    }

    fn drop_message_refs(&mut self, id: &Uuid) {
        self.attachments.remove(id);
        self.reactions.remove(id);
        if self.reply_to == Some(*id) {
            self.reply_to = None;
        }
        if self.selected == Some(*id) {
            self.selected = None;
        }
    }

    pub fn upsert_thread(&mut self, thread: Thread) {
        if let Some(slot) = self.threads.iter_mut().find(|slot| slot.id == thread.id) {
            *slot = thread;
        } else {
            self.threads.push(thread);
        }
        self.threads
            .sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        while self.threads.len() > THREAD_CAP {
            // Descending order: the stale end is the back.
            let evicted = self.threads.pop();
            if let Some(evicted) = evicted {
                if self.active_thread == Some(evicted.id) {
                    self.active_thread = None;
                }
            }
        }
    }

    pub fn remove_thread(&mut self, id: &Uuid) {
        self.threads.retain(|thread| thread.id != *id);
        if self.active_thread == Some(*id) {
            self.active_thread = None;
        }
    }

    pub fn upsert_attachment(&mut self, attachment: Attachment) {
        let list = self.attachments.entry(attachment.message_id).or_default();
        if let Some(slot) = list.iter_mut().find(|slot| slot.id == attachment.id) {
            *slot = attachment;
        } else {
            list.push(attachment);
        }
        list.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
    }

    pub fn remove_attachment(&mut self, message_id: &Uuid, attachment_id: &Uuid) -> Option<Attachment> {
        let list = self.attachments.get_mut(message_id)?;
        let index = list.iter().position(|attachment| attachment.id == *attachment_id)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.attachments.remove(message_id);
        }
        Some(removed)
    }

    pub fn upsert_reaction(&mut self, reaction: Reaction) {
        let list = self.reactions.entry(reaction.message_id).or_default();
        if let Some(slot) = list.iter_mut().find(|slot| slot.same_identity(&reaction)) {
            *slot = reaction;
        } else {
            list.push(reaction);
        }
    }

    pub fn remove_reaction(&mut self, message_id: &Uuid, user_id: &Uuid, emoji: &str) -> Option<Reaction> {
        let list = self.reactions.get_mut(message_id)?;
        let index = list
            .iter()
            .position(|reaction| reaction.user_id == *user_id && reaction.emoji == emoji)?;
        let removed = list.remove(index);
        if list.is_empty() {
            self.reactions.remove(message_id);
        }
        Some(removed)
    }

    pub fn upsert_profile(&mut self, profile: ProfileSummary) {
        self.profiles.insert(profile.id, profile);
    }

    /// Messages of the current selection: the active thread's, or the main
    /// channel stream when no thread is active. Tombstoned rows never show.
    pub fn visible_messages(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|message| !message.is_tombstoned() && message.thread_id == self.active_thread)
            .collect()
    }

    pub fn thread_counts(&self) -> HashMap<Uuid, usize> {
        let mut counts = HashMap::new();
        for message in &self.messages {
            if message.is_tombstoned() {
                continue;
            }
            if let Some(thread_id) = message.thread_id {
                *counts.entry(thread_id).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Grouped by emoji in first-seen order, flagging the current user.
    pub fn reaction_tally(&self, message_id: &Uuid, me: &Uuid) -> Vec<ReactionCount> {
        let mut tally: Vec<ReactionCount> = Vec::new();
        for reaction in self.reactions_of(message_id) {
            if let Some(entry) = tally.iter_mut().find(|entry| entry.emoji == reaction.emoji) {
                entry.count += 1;
                entry.mine = entry.mine || reaction.user_id == *me;
            } else {
                tally.push(ReactionCount {
                    emoji: reaction.emoji.clone(),
                    count: 1,
                    mine: reaction.user_id == *me,
                });
            }
        }
        tally
    }

    pub fn reply_preview(&self, message: &Message) -> Option<ReplyPreview> {
        let target_id = message.reply_to?;
        match self.message(&target_id) {
            Some(target) if !target.is_tombstoned() => Some(ReplyPreview::Message(target)),
            _ => Some(ReplyPreview::Unavailable),
        }
    }

    /// Full replace with a fresh snapshot. The active thread survives only if
    /// it is still present; reply/selection references likewise.
    pub fn replace(&mut self, snapshot: Snapshot) {
        let Snapshot {
            channel_id,
            mut messages,
            mut threads,
            attachments,
            reactions,
            profiles,
        } = snapshot;
        messages.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        threads.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        messages.truncate(MESSAGE_CAP);
        threads.truncate(THREAD_CAP);

        self.channel_id = Some(channel_id);
        self.messages = messages;
        self.threads = threads;
        self.attachments = HashMap::new();
        self.reactions = HashMap::new();
        for attachment in attachments {
            if self.message(&attachment.message_id).is_some() {
                self.upsert_attachment(attachment);
            }
        }
        for reaction in reactions {
            if self.message(&reaction.message_id).is_some() {
                self.upsert_reaction(reaction);
            }
        }
        self.profiles = profiles.into_iter().map(|profile| (profile.id, profile)).collect();

        self.active_thread = self.active_thread.filter(|id| self.thread(id).is_some());
        self.reply_to = self.reply_to.filter(|id| self.message(id).is_some());
        self.selected = self.selected.filter(|id| self.message(id).is_some());
    }

    pub fn clear(&mut self) {
        *self = ChatStore::default();
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;
    use crate::messages::{AttachmentKind, MessageKind};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::Value as JsonValue;

    pub fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + millis).unwrap()
    }

    pub fn message(channel_id: Uuid, millis: i64) -> Message {
        Message {
            id: Uuid::new_v4(),
            channel_id,
            sender_id: Uuid::new_v4(),
            thread_id: None,
            reply_to: None,
            kind: MessageKind::Text,
            body: format!("message at {}", millis),
            metadata: JsonValue::Null,
            deleted: None,
            created: at(millis),
        }
    }

    pub fn thread(channel_id: Uuid, millis: i64) -> Thread {
        Thread {
            id: Uuid::new_v4(),
            channel_id,
            creator_id: Uuid::new_v4(),
            title: None,
            archived: None,
            created: at(millis),
        }
    }

    pub fn attachment(message_id: Uuid, millis: i64) -> Attachment {
        Attachment {
            id: Uuid::new_v4(),
            message_id,
            uploader_id: Uuid::new_v4(),
            kind: AttachmentKind::Image,
            bucket: crate::media::CHAT_MEDIA_BUCKET.to_string(),
            path: format!("c/u/{}-feedbeef.jpg", millis),
            mime_type: "image/jpeg".to_string(),
            size: 2048,
            width: Some(800),
            height: Some(600),
            created: at(millis),
        }
    }

    pub fn reaction(message_id: Uuid, user_id: Uuid, emoji: &str) -> Reaction {
        Reaction {
            message_id,
            user_id,
            emoji: emoji.to_string(),
            created: at(0),
        }
    }

    pub fn profile(id: Uuid, nickname: &str) -> ProfileSummary {
        ProfileSummary {
            id,
            nickname: nickname.to_string(),
            avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    fn store_with_channel(channel_id: Uuid) -> ChatStore {
        let mut store = ChatStore::default();
        store.replace(Snapshot {
            channel_id,
            messages: Vec::new(),
            threads: Vec::new(),
            attachments: Vec::new(),
            reactions: Vec::new(),
            profiles: Vec::new(),
        });
        store
    }

    #[test]
    fn upsert_is_idempotent() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let m = message(channel_id, 1);
        store.upsert_message(m.clone());
        store.upsert_message(m.clone());
        assert_eq!(store.messages().len(), 1);

        let a = attachment(m.id, 2);
        store.upsert_attachment(a.clone());
        store.upsert_attachment(a.clone());
        assert_eq!(store.attachments_of(&m.id).len(), 1);

        let user_id = Uuid::new_v4();
        let r = reaction(m.id, user_id, "🌻");
        store.upsert_reaction(r.clone());
        store.upsert_reaction(r);
        assert_eq!(store.reactions_of(&m.id).len(), 1);
    }

    #[test]
    fn message_retention_cap() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let mut ids = Vec::new();
        for i in 0..300 {
            let m = message(channel_id, i);
            ids.push(m.id);
            store.upsert_message(m);
        }
        assert_eq!(store.messages().len(), MESSAGE_CAP);
        // Exactly the 250 most recent survive, ascending.
        let surviving: Vec<Uuid> = store.messages().iter().map(|m| m.id).collect();
        assert_eq!(surviving, ids[50..].to_vec());
        for window in store.messages().windows(2) {
            assert!(window[0].created <= window[1].created);
        }
    }

    #[test]
    fn eviction_drops_dependents() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let oldest = message(channel_id, 0);
        let oldest_id = oldest.id;
        store.upsert_message(oldest);
        store.upsert_attachment(attachment(oldest_id, 0));
        for i in 1..=MESSAGE_CAP as i64 {
            store.upsert_message(message(channel_id, i));
        }
        assert!(store.message(&oldest_id).is_none());
        assert!(store.attachments_of(&oldest_id).is_empty());
    }

    #[test]
    fn thread_retention_cap() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let oldest = thread(channel_id, 0);
        let oldest_id = oldest.id;
        store.upsert_thread(oldest);
        store.set_active_thread(Some(oldest_id));
        assert_eq!(store.active_thread(), Some(oldest_id));
        for i in 1..=THREAD_CAP as i64 {
            store.upsert_thread(thread(channel_id, i));
        }
        assert_eq!(store.threads().len(), THREAD_CAP);
        assert!(store.thread(&oldest_id).is_none());
        // Evicting the active thread clears the pointer.
        assert_eq!(store.active_thread(), None);
        // Descending by creation.
        for window in store.threads().windows(2) {
            assert!(window[0].created >= window[1].created);
        }
    }

    #[test]
    fn remove_message_cascades() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let m = message(channel_id, 1);
        let id = m.id;
        store.upsert_message(m);
        store.upsert_attachment(attachment(id, 2));
        store.upsert_reaction(reaction(id, Uuid::new_v4(), "🌵"));
        store.set_reply_to(Some(id));
        store.select_message(Some(id));

        store.remove_message(&id);
        assert!(store.message(&id).is_none());
        assert!(store.attachments_of(&id).is_empty());
        assert!(store.reactions_of(&id).is_empty());
        assert_eq!(store.reply_to(), None);
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn remove_thread_clears_active() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let t = thread(channel_id, 1);
        let id = t.id;
        store.upsert_thread(t);
        store.set_active_thread(Some(id));
        store.remove_thread(&id);
        assert_eq!(store.active_thread(), None);
        // Setting an unknown thread is ignored.
        store.set_active_thread(Some(Uuid::new_v4()));
        assert_eq!(store.active_thread(), None);
    }

    #[test]
    fn visible_messages_follow_selection() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let t = thread(channel_id, 0);
        let thread_id = t.id;
        store.upsert_thread(t);

        let main = message(channel_id, 1);
        let mut threaded = message(channel_id, 2);
        threaded.thread_id = Some(thread_id);
        let main_id = main.id;
        let threaded_id = threaded.id;
        store.upsert_message(main);
        store.upsert_message(threaded);

        let visible: Vec<Uuid> = store.visible_messages().iter().map(|m| m.id).collect();
        assert_eq!(visible, vec![main_id]);

        store.set_active_thread(Some(thread_id));
        let visible: Vec<Uuid> = store.visible_messages().iter().map(|m| m.id).collect();
        assert_eq!(visible, vec![threaded_id]);

        assert_eq!(store.thread_counts().get(&thread_id), Some(&1));
    }

    #[test]
    fn reaction_tally_test() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let m = message(channel_id, 1);
        let id = m.id;
        store.upsert_message(m);

        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.upsert_reaction(reaction(id, other, "🌻"));
        store.upsert_reaction(reaction(id, me, "🌻"));
        store.upsert_reaction(reaction(id, other, "🥕"));

        let tally = store.reaction_tally(&id, &me);
        assert_eq!(
            tally,
            vec![
                ReactionCount { emoji: "🌻".to_string(), count: 2, mine: true },
                ReactionCount { emoji: "🥕".to_string(), count: 1, mine: false },
            ]
        );
    }

    #[test]
    fn reply_preview_branches() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let target = message(channel_id, 1);
        let target_id = target.id;
        store.upsert_message(target);

        let mut reply = message(channel_id, 2);
        reply.reply_to = Some(target_id);
        store.upsert_message(reply.clone());

        match store.reply_preview(&reply) {
            Some(ReplyPreview::Message(m)) => assert_eq!(m.id, target_id),
            other => panic!("expected resolved preview, got {:?}", other),
        }

        // Target deleted after the reply was created: placeholder, one hop.
        store.remove_message(&target_id);
        match store.reply_preview(&reply) {
            Some(ReplyPreview::Unavailable) => {}
            other => panic!("expected placeholder, got {:?}", other),
        }

        let plain = message(channel_id, 3);
        assert!(store.reply_preview(&plain).is_none());
    }

    #[test]
    fn replace_resets_dangling_selection() {
        let channel_id = Uuid::new_v4();
        let mut store = store_with_channel(channel_id);
        let t = thread(channel_id, 1);
        let old_thread = t.id;
        store.upsert_thread(t);
        store.set_active_thread(Some(old_thread));

        let surviving = thread(channel_id, 2);
        let surviving_id = surviving.id;
        store.replace(Snapshot {
            channel_id,
            messages: vec![message(channel_id, 3)],
            threads: vec![surviving],
            attachments: Vec::new(),
            reactions: Vec::new(),
            profiles: Vec::new(),
        });
        // The previously active thread vanished from the fresh set.
        assert_eq!(store.active_thread(), None);
        assert!(store.thread(&surviving_id).is_some());
    }
}
