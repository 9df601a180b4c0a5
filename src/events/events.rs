use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messages::{Attachment, Message, Reaction, Thread};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One row change. Inserts/updates carry the new row; deletes carry the old
/// one. Either may be absent on a malformed event; consumers skip those.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Change<T> {
    #[serde(rename = "operation")]
    pub op: ChangeOp,
    #[serde(default, rename = "oldRow")]
    pub old: Option<T>,
    #[serde(default, rename = "newRow")]
    pub new: Option<T>,
}

impl<T> Change<T> {
    pub fn insert(row: T) -> Change<T> {
        Change {
            op: ChangeOp::Insert,
            old: None,
            new: Some(row),
        }
    }

    pub fn update(row: T) -> Change<T> {
        Change {
            op: ChangeOp::Update,
            old: None,
            new: Some(row),
        }
    }

    pub fn delete(row: T) -> Change<T> {
        Change {
            op: ChangeOp::Delete,
            old: Some(row),
            new: None,
        }
    }

    /// The row identifying what the event is about, regardless of operation.
    pub fn key_row(&self) -> Option<&T> {
        self.new.as_ref().or(self.old.as_ref())
    }
}

/// City-side rows are opaque to the chat engine beyond their owning city;
/// a change only triggers a full reload of the (out-of-scope) events screen.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CityEventRow {
    pub id: Uuid,
    pub city_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeRow {
    pub event_id: Uuid,
    pub user_id: Uuid,
}

/// A change-stream payload, tagged by source table.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "table", rename_all = "camelCase")]
pub enum ChangeEvent {
    Messages(Change<Message>),
    Threads(Change<Thread>),
    Attachments(Change<Attachment>),
    Reactions(Change<Reaction>),
    Events(Change<CityEventRow>),
    Attendees(Change<AttendeeRow>),
}

impl ChangeEvent {
    pub fn op(&self) -> ChangeOp {
        match self {
            ChangeEvent::Messages(change) => change.op,
            ChangeEvent::Threads(change) => change.op,
            ChangeEvent::Attachments(change) => change.op,
            ChangeEvent::Reactions(change) => change.op,
            ChangeEvent::Events(change) => change.op,
            ChangeEvent::Attendees(change) => change.op,
        }
    }

    /// City-side events bypass the per-channel generation check.
    pub fn is_city_side(&self) -> bool {
        matches!(self, ChangeEvent::Events(_) | ChangeEvent::Attendees(_))
    }
}
