use std::env;

use once_cell::sync::OnceCell;

static DEBUG: OnceCell<bool> = OnceCell::new();

fn env_bool<T: AsRef<str>>(s: T) -> bool {
    let s = s.as_ref().trim();
    !(s.is_empty() || s == "0" || s.to_ascii_lowercase() == "false")
}

pub fn debug() -> bool {
    *DEBUG.get_or_init(|| env::var("DEBUG").map(env_bool).unwrap_or(false))
}

#[test]
fn env_bool_test() {
    assert!(env_bool("1"));
    assert!(env_bool("yes"));
    assert!(!env_bool("0"));
    assert!(!env_bool("false"));
    assert!(!env_bool(" "));
}
