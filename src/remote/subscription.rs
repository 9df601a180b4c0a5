use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::RemoteError;
use crate::events::ChangeEvent;

/// Subscription key. One per active channel plus one per city.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Message/thread events filtered server-side by channel id, plus
    /// unfiltered attachment/reaction events resolved client-side by parent.
    pub fn chat(channel_id: Uuid) -> Topic {
        Topic(format!("chat-{}", channel_id))
    }

    /// City event/attendee changes; the client reacts with a full reload.
    pub fn city_events(city_id: Uuid) -> Topic {
        Topic(format!("events-{}", city_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The change-event push channel. Delivery preserves server commit order
/// within one topic; nothing is guaranteed across tables.
#[async_trait]
pub trait Realtime: Send + Sync {
    async fn subscribe(&self, topic: Topic) -> Result<mpsc::Receiver<ChangeEvent>, RemoteError>;

    async fn unsubscribe(&self, topic: Topic) -> Result<(), RemoteError>;
}

#[test]
fn topic_test() {
    let id = Uuid::nil();
    assert_eq!(
        Topic::chat(id).as_str(),
        "chat-00000000-0000-0000-0000-000000000000"
    );
    assert_eq!(
        Topic::city_events(id).to_string(),
        "events-00000000-0000-0000-0000-000000000000"
    );
}
