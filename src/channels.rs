use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who can read a channel is derived from city/team membership server-side;
/// the client only carries the owning scope around.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ChannelScope {
    City,
    Team,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    pub scope: ChannelScope,
    pub city_id: Uuid,
    pub team_id: Option<Uuid>,
    pub name: String,
    #[serde(with = "crate::date_format")]
    pub created: DateTime<Utc>,
}

#[test]
fn channel_serde_test() {
    let channel = Channel {
        id: Uuid::new_v4(),
        scope: ChannelScope::Team,
        city_id: Uuid::new_v4(),
        team_id: Some(Uuid::new_v4()),
        name: "Compost Crew".to_string(),
        created: crate::utils::now(),
    };
    let encoded = serde_json::to_value(&channel).unwrap();
    assert_eq!(encoded["scope"], "team");
    assert!(encoded["cityId"].is_string());
    assert!(encoded["created"].is_i64());
    let decoded: Channel = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded.id, channel.id);
    assert_eq!(decoded.scope, ChannelScope::Team);
}
