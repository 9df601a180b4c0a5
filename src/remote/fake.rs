//! In-memory collaborators for tests: canned rows, recorded writes, and
//! failure injection switches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{BlobStore, ChatQueries, ChatRpc, Realtime, Remote, RemoteError, SignedUrl, Topic};
use crate::events::ChangeEvent;
use crate::messages::{Attachment, CreateThread, Message, Reaction, SendMessage, Thread, ThreadCreated};
use crate::users::ProfileSummary;

#[derive(Default)]
pub struct FakeBackend {
    pub messages: Mutex<Vec<Message>>,
    pub threads: Mutex<Vec<Thread>>,
    pub attachments: Mutex<Vec<Attachment>>,
    pub reactions: Mutex<Vec<Reaction>>,
    pub profiles: Mutex<Vec<ProfileSummary>>,

    pub sent: Mutex<Vec<SendMessage>>,
    pub created_threads: Mutex<Vec<CreateThread>>,
    pub inserted_attachments: Mutex<Vec<Attachment>>,
    pub deleted_messages: Mutex<Vec<Uuid>>,
    pub uploads: Mutex<Vec<(String, String)>>,
    pub removed_blobs: Mutex<Vec<String>>,
    pub unsubscribed: Mutex<Vec<String>>,
    pub attachment_queries: AtomicUsize,

    senders: Mutex<HashMap<String, mpsc::Sender<ChangeEvent>>>,

    pub fail_reactions: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_loads: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Arc<FakeBackend> {
        Arc::new(FakeBackend::default())
    }

    pub fn remote(self: &Arc<FakeBackend>) -> Remote {
        Remote {
            store: self.clone(),
            rpc: self.clone(),
            blobs: self.clone(),
            realtime: self.clone(),
        }
    }

    fn check(flag: &AtomicBool) -> Result<(), RemoteError> {
        if flag.load(Ordering::SeqCst) {
            Err(RemoteError::Transport("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    /// Deliver an event on a subscribed topic; false when nobody listens.
    pub async fn push(&self, topic: &Topic, event: ChangeEvent) -> bool {
        let sender = self.senders.lock().unwrap().get(topic.as_str()).cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.senders.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ChatQueries for FakeBackend {
    async fn messages_by_channel(&self, channel_id: Uuid, limit: usize) -> Result<Vec<Message>, RemoteError> {
        FakeBackend::check(&self.fail_loads)?;
        let mut rows: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.channel_id == channel_id && !row.is_tombstoned())
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created.cmp(&b.created));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn threads_by_channel(&self, channel_id: Uuid, limit: usize) -> Result<Vec<Thread>, RemoteError> {
        FakeBackend::check(&self.fail_loads)?;
        let mut rows: Vec<Thread> = self
            .threads
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.channel_id == channel_id && !row.is_archived())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created.cmp(&a.created));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn attachments_by_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Attachment>, RemoteError> {
        self.attachment_queries.fetch_add(1, Ordering::SeqCst);
        FakeBackend::check(&self.fail_loads)?;
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .iter()
            .filter(|row| message_ids.contains(&row.message_id))
            .cloned()
            .collect())
    }

    async fn reactions_by_messages(&self, message_ids: &[Uuid]) -> Result<Vec<Reaction>, RemoteError> {
        FakeBackend::check(&self.fail_loads)?;
        Ok(self
            .reactions
            .lock()
            .unwrap()
            .iter()
            .filter(|row| message_ids.contains(&row.message_id))
            .cloned()
            .collect())
    }

    async fn profiles_by_ids(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileSummary>, RemoteError> {
        FakeBackend::check(&self.fail_loads)?;
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|row| user_ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn insert_reaction(&self, reaction: &Reaction) -> Result<(), RemoteError> {
        FakeBackend::check(&self.fail_reactions)?;
        let mut rows = self.reactions.lock().unwrap();
        // Idempotent on the identity triple.
        if !rows.iter().any(|row| row.same_identity(reaction)) {
            rows.push(reaction.clone());
        }
        Ok(())
    }

    async fn remove_reaction(&self, message_id: Uuid, user_id: Uuid, emoji: &str) -> Result<(), RemoteError> {
        FakeBackend::check(&self.fail_reactions)?;
        self.reactions
            .lock()
            .unwrap()
            .retain(|row| !(row.message_id == message_id && row.user_id == user_id && row.emoji == emoji));
        Ok(())
    }

    async fn insert_attachment(&self, attachment: &Attachment) -> Result<(), RemoteError> {
        self.inserted_attachments.lock().unwrap().push(attachment.clone());
        self.attachments.lock().unwrap().push(attachment.clone());
        Ok(())
    }

    async fn delete_message(&self, message_id: Uuid) -> Result<(), RemoteError> {
        FakeBackend::check(&self.fail_delete)?;
        self.deleted_messages.lock().unwrap().push(message_id);
        self.messages.lock().unwrap().retain(|row| row.id != message_id);
        Ok(())
    }
}

#[async_trait]
impl ChatRpc for FakeBackend {
    async fn send_message(&self, params: &SendMessage) -> Result<Uuid, RemoteError> {
        self.sent.lock().unwrap().push(params.clone());
        Ok(Uuid::new_v4())
    }

    async fn create_thread(&self, params: &CreateThread) -> Result<ThreadCreated, RemoteError> {
        self.created_threads.lock().unwrap().push(params.clone());
        Ok(ThreadCreated {
            thread_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
        })
    }
}

#[async_trait]
impl BlobStore for FakeBackend {
    async fn upload(&self, _bucket: &str, path: &str, mime_type: &str, _content: Bytes) -> Result<(), RemoteError> {
        self.uploads.lock().unwrap().push((path.to_string(), mime_type.to_string()));
        Ok(())
    }

    async fn sign(&self, _bucket: &str, path: &str, _ttl: Duration) -> Result<SignedUrl, RemoteError> {
        Ok(SignedUrl {
            path: path.to_string(),
            url: format!("https://blobs.test/{}?token=signed", path),
        })
    }

    async fn sign_batch(&self, bucket: &str, paths: &[String], ttl: Duration) -> Result<Vec<SignedUrl>, RemoteError> {
        let mut urls = Vec::with_capacity(paths.len());
        for path in paths {
            urls.push(self.sign(bucket, path, ttl).await?);
        }
        Ok(urls)
    }

    async fn remove(&self, _bucket: &str, paths: &[String]) -> Result<(), RemoteError> {
        self.removed_blobs.lock().unwrap().extend(paths.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl Realtime for FakeBackend {
    async fn subscribe(&self, topic: Topic) -> Result<mpsc::Receiver<ChangeEvent>, RemoteError> {
        let (tx, rx) = mpsc::channel(64);
        self.senders.lock().unwrap().insert(topic.as_str().to_string(), tx);
        Ok(rx)
    }

    async fn unsubscribe(&self, topic: Topic) -> Result<(), RemoteError> {
        self.senders.lock().unwrap().remove(topic.as_str());
        self.unsubscribed.lock().unwrap().push(topic.as_str().to_string());
        Ok(())
    }
}
