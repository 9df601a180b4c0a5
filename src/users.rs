use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only projection used to label senders, reactors and thread creators
/// without refetching full profiles.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: Uuid,
    pub nickname: String,
    pub avatar: Option<String>,
}
