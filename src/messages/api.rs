use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::MessageKind;

/// Parameters of the "send message" compound write. The message id is minted
/// server-side and returned.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub channel_id: Uuid,
    pub body: Option<String>,
    #[serde(default)]
    pub kind: MessageKind,
    pub thread_id: Option<Uuid>,
    pub reply_to: Option<Uuid>,
    pub metadata: Option<JsonValue>,
}

/// Parameters of the "create thread" compound write; the thread and its root
/// message are created atomically.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateThread {
    pub channel_id: Uuid,
    pub body: String,
    pub title: Option<String>,
    #[serde(default)]
    pub kind: MessageKind,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct ThreadCreated {
    pub thread_id: Uuid,
    pub message_id: Uuid,
}
