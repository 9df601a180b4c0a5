use crate::error::ValidationFailed;

pub struct Validator<'a, T: ?Sized>(&'a [(&'static str, &'a (dyn Fn(&T) -> bool + Sync))]);

impl<'a, T: ?Sized> Validator<'a, T> {
    pub fn run<U: AsRef<T>>(&self, value: U) -> Result<(), ValidationFailed> {
        let Validator(sub_validators) = *self;
        for (message, validator) in sub_validators {
            if !validator(value.as_ref()) {
                return Err(ValidationFailed(message));
            }
        }
        Ok(())
    }
}

macro_rules! max {
    ($n: expr) => {
        |s| s.len() <= $n
    };
}

macro_rules! chars_min {
    ($n: expr) => {
        |s: &str| s.chars().count() >= $n
    };
}

macro_rules! chars_max {
    ($n: expr) => {
        |s: &str| s.chars().count() <= $n
    };
}

pub static MESSAGE_BODY: Validator<str> = Validator(&[
    ("Message cannot be blank.", &|s: &str| !s.trim().is_empty()),
    ("Message shall not be more than 4096 bytes.", &max!(4096)),
]);

/// Run against the emoji after trimming.
pub static EMOJI: Validator<str> = Validator(&[
    ("Emoji cannot be empty.", &chars_min!(1)),
    ("Emoji shall not be more than 32 characters.", &chars_max!(32)),
]);

pub static THREAD_TITLE: Validator<str> = Validator(&[(
    "Title shall not be more than 120 bytes.",
    &max!(120),
)]);

#[test]
fn validator_test() {
    assert_eq!(MESSAGE_BODY.run("hello, neighbors"), Ok(()));
    assert!(MESSAGE_BODY.run("   \n\t ").is_err());
    assert!(MESSAGE_BODY.run("").is_err());
    let long = "a".repeat(4097);
    assert!(MESSAGE_BODY.run(&*long).is_err());

    assert_eq!(EMOJI.run("🌱"), Ok(()));
    assert_eq!(EMOJI.run("👍🏽"), Ok(()));
    assert!(EMOJI.run("").is_err());
    let too_many = "🌱".repeat(33);
    assert!(EMOJI.run(&*too_many).is_err());

    assert_eq!(THREAD_TITLE.run("Tomato swap on Saturday"), Ok(()));
    let long = "t".repeat(121);
    assert!(THREAD_TITLE.run(&*long).is_err());
}
