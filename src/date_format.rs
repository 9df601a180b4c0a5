use chrono::{DateTime, TimeZone, Utc};
use serde::{self, Deserialize, Deserializer, Serializer};

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(date.timestamp_millis())
}

pub fn millis_to_date_time(timestamp: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(timestamp).single()
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = i64::deserialize(deserializer)?;
    millis_to_date_time(timestamp).ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}

pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if let Some(date) = date {
            serializer.serialize_i64(date.timestamp_millis())
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let timestamp = Option::<i64>::deserialize(deserializer)?;
        if let Some(timestamp) = timestamp {
            super::millis_to_date_time(timestamp)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
        } else {
            Ok(None)
        }
    }
}

#[test]
fn millis_round_trip() {
    let now = Utc::now();
    let millis = now.timestamp_millis();
    let back = millis_to_date_time(millis).unwrap();
    assert_eq!(back.timestamp_millis(), millis);
}
