use chrono::{DateTime, Utc};
use uuid::Uuid;

macro_rules! regex {
    ($pattern: expr) => {{
        use once_cell::sync::OnceCell;
        use regex::Regex;
        static CELL: OnceCell<Regex> = OnceCell::new();
        CELL.get_or_init(|| Regex::new($pattern).unwrap())
    }};
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn id() -> Uuid {
    Uuid::new_v4()
}

/// Random, filename-safe token for blob object names.
pub fn token() -> String {
    Uuid::new_v4().to_simple().to_string()
}

pub fn merge_blank(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[test]
fn merge_blank_test() {
    assert_eq!(merge_blank("  hello   the \n world\t"), "hello the world");
    assert_eq!(merge_blank("   "), "");
}

#[test]
fn token_test() {
    let token = token();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}
