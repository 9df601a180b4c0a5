use uuid::Uuid;

use crate::events::{Change, ChangeEvent, ChangeOp, PendingBuffer, PendingChild};
use crate::media::MediaUrlCache;
use crate::messages::{Attachment, Message, Reaction, Thread};
use crate::store::ChatStore;

/// Asynchronous work an applied event asks the engine to do. The reconciler
/// itself never awaits and never fails: malformed events are logged and
/// skipped so a bad payload can't take the UI down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    FetchProfile(Uuid),
    /// Debounced check for a media message that arrived without attachment
    /// rows; covers a dropped or never-buffered attachment event.
    ScheduleHydration { message_id: Uuid },
    CityEventsChanged,
}

pub fn apply(
    store: &mut ChatStore,
    pending: &mut PendingBuffer,
    media: &mut MediaUrlCache,
    event: ChangeEvent,
) -> Vec<FollowUp> {
    match event {
        ChangeEvent::Messages(change) => apply_message(store, pending, media, change),
        ChangeEvent::Threads(change) => apply_thread(store, change),
        ChangeEvent::Attachments(change) => {
            apply_attachment(store, pending, media, change);
            Vec::new()
        }
        ChangeEvent::Reactions(change) => {
            apply_reaction(store, pending, change);
            Vec::new()
        }
        ChangeEvent::Events(_) | ChangeEvent::Attendees(_) => vec![FollowUp::CityEventsChanged],
    }
}

/// Replay buffered children for a message that just became known locally.
pub(crate) fn drain_pending(store: &mut ChatStore, pending: &mut PendingBuffer, message_id: &Uuid) {
    for child in pending.take(message_id) {
        match child {
            PendingChild::Attachment(attachment) => store.upsert_attachment(attachment),
            PendingChild::Reaction(reaction) => store.upsert_reaction(reaction),
        }
    }
}

fn remove_message(store: &mut ChatStore, media: &mut MediaUrlCache, message_id: &Uuid) {
    let paths: Vec<String> = store
        .attachments_of(message_id)
        .iter()
        .filter(|attachment| attachment.is_chat_media())
        .map(|attachment| attachment.path.clone())
        .collect();
    store.remove_message(message_id);
    for path in &paths {
        media.evict(path);
    }
}

fn apply_message(
    store: &mut ChatStore,
    pending: &mut PendingBuffer,
    media: &mut MediaUrlCache,
    change: Change<Message>,
) -> Vec<FollowUp> {
    let Some(row) = change.key_row() else {
        log::warn!("Dropping message event without a row");
        return Vec::new();
    };
    if Some(row.channel_id) != store.channel_id() {
        return Vec::new();
    }
    if change.op == ChangeOp::Delete || row.is_tombstoned() {
        let message_id = row.id;
        remove_message(store, media, &message_id);
        return Vec::new();
    }
    let Some(row) = change.new else {
        log::warn!("Dropping {:?} message event without a new row", change.op);
        return Vec::new();
    };

    let mut follow_ups = Vec::new();
    let message_id = row.id;
    let sender_id = row.sender_id;
    let is_media = row.kind.is_media();
    store.upsert_message(row);
    drain_pending(store, pending, &message_id);

    if store.profile(&sender_id).is_none() {
        follow_ups.push(FollowUp::FetchProfile(sender_id));
    }
    if change.op == ChangeOp::Insert && is_media && store.attachments_of(&message_id).is_empty() {
        follow_ups.push(FollowUp::ScheduleHydration { message_id });
    }
    follow_ups
}

fn apply_thread(store: &mut ChatStore, change: Change<Thread>) -> Vec<FollowUp> {
    let Some(row) = change.key_row() else {
        log::warn!("Dropping thread event without a row");
        return Vec::new();
    };
    if Some(row.channel_id) != store.channel_id() {
        return Vec::new();
    }
    if change.op == ChangeOp::Delete || row.is_archived() {
        let thread_id = row.id;
        store.remove_thread(&thread_id);
        return Vec::new();
    }
    let Some(row) = change.new else {
        log::warn!("Dropping {:?} thread event without a new row", change.op);
        return Vec::new();
    };
    let creator_id = row.creator_id;
    store.upsert_thread(row);
    if store.profile(&creator_id).is_none() {
        vec![FollowUp::FetchProfile(creator_id)]
    } else {
        Vec::new()
    }
}

fn apply_attachment(
    store: &mut ChatStore,
    pending: &mut PendingBuffer,
    media: &mut MediaUrlCache,
    change: Change<Attachment>,
) {
    match change.op {
        ChangeOp::Delete => {
            let Some(row) = change.key_row() else {
                log::warn!("Dropping attachment delete without a row");
                return;
            };
            // Unknown parent: nothing local to remove, drop it.
            if let Some(removed) = store.remove_attachment(&row.message_id, &row.id) {
                if removed.is_chat_media() {
                    media.evict(&removed.path);
                }
            }
        }
        ChangeOp::Insert | ChangeOp::Update => {
            let Some(row) = change.new else {
                log::warn!("Dropping {:?} attachment event without a new row", change.op);
                return;
            };
            if let Err(e) = row.check() {
                log::warn!("Dropping invalid attachment {}: {}", row.id, e);
                return;
            }
            if store.message(&row.message_id).is_some() {
                store.upsert_attachment(row);
            } else {
                pending.push(PendingChild::Attachment(row));
            }
        }
    }
}

fn apply_reaction(store: &mut ChatStore, pending: &mut PendingBuffer, change: Change<Reaction>) {
    match change.op {
        ChangeOp::Delete => {
            let Some(row) = change.key_row() else {
                log::warn!("Dropping reaction delete without a row");
                return;
            };
            store.remove_reaction(&row.message_id, &row.user_id, &row.emoji);
        }
        ChangeOp::Insert | ChangeOp::Update => {
            let Some(row) = change.new else {
                log::warn!("Dropping {:?} reaction event without a new row", change.op);
                return;
            };
            if row.emoji.trim().is_empty() {
                log::warn!("Dropping reaction with blank emoji on {}", row.message_id);
                return;
            }
            if store.message(&row.message_id).is_some() {
                store.upsert_reaction(row);
            } else {
                pending.push(PendingChild::Reaction(row));
            }
        }
    }
}
