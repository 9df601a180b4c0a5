use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::ValidationFailed;
use crate::validators::MESSAGE_BODY;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Text,
    Image,
    Gif,
    System,
}

impl MessageKind {
    /// Media messages carry their content in attachment rows, which may lag
    /// behind the message itself on the change stream.
    pub fn is_media(self) -> bool {
        matches!(self, MessageKind::Image | MessageKind::Gif)
    }
}

impl Default for MessageKind {
    fn default() -> MessageKind {
        MessageKind::Text
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub thread_id: Option<Uuid>,
    pub reply_to: Option<Uuid>,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    #[serde(with = "crate::date_format::option")]
    pub deleted: Option<DateTime<Utc>>,
    #[serde(with = "crate::date_format")]
    pub created: DateTime<Utc>,
}

impl Message {
    pub fn is_tombstoned(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn gif_url(&self) -> Option<&str> {
        self.metadata.get("gif_url").and_then(JsonValue::as_str)
    }

    pub fn source_url(&self) -> Option<&str> {
        self.metadata.get("source_url").and_then(JsonValue::as_str)
    }

    /// Text messages must carry a non-blank body; other kinds may leave it empty.
    pub fn check_body(kind: MessageKind, body: &str) -> Result<(), ValidationFailed> {
        if kind == MessageKind::Text {
            MESSAGE_BODY.run(body)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub creator_id: Uuid,
    pub title: Option<String>,
    #[serde(default)]
    #[serde(with = "crate::date_format::option")]
    pub archived: Option<DateTime<Utc>>,
    #[serde(with = "crate::date_format")]
    pub created: DateTime<Utc>,
}

impl Thread {
    pub fn is_archived(&self) -> bool {
        self.archived.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentKind {
    Image,
    Gif,
    File,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: Uuid,
    pub message_id: Uuid,
    pub uploader_id: Uuid,
    pub kind: AttachmentKind,
    pub bucket: String,
    pub path: String,
    pub mime_type: String,
    pub size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    #[serde(with = "crate::date_format")]
    pub created: DateTime<Utc>,
}

impl Attachment {
    pub fn is_chat_media(&self) -> bool {
        self.bucket == crate::media::CHAT_MEDIA_BUCKET
    }

    pub fn check(&self) -> Result<(), ValidationFailed> {
        if self.size <= 0 {
            return Err(ValidationFailed("Attachment size must be positive."));
        }
        if matches!(self.width, Some(w) if w <= 0) || matches!(self.height, Some(h) if h <= 0) {
            return Err(ValidationFailed("Attachment dimensions must be positive."));
        }
        if self.mime_type.parse::<mime::Mime>().is_err() {
            return Err(ValidationFailed("Unrecognized attachment content type."));
        }
        Ok(())
    }
}

/// Identity is the (message, user, emoji) triple; there is no surrogate id.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    #[serde(with = "crate::date_format")]
    pub created: DateTime<Utc>,
}

impl Reaction {
    pub fn same_identity(&self, other: &Reaction) -> bool {
        self.message_id == other.message_id && self.user_id == other.user_id && self.emoji == other.emoji
    }
}
