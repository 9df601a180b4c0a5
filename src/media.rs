use std::collections::HashMap;

use uuid::Uuid;

use crate::error::ValidationFailed;
use crate::remote::{BlobStore, RemoteError, SignedUrl, SIGNED_URL_TTL};
use crate::utils::{timestamp, token};

pub const CHAT_MEDIA_BUCKET: &str = "chat-media";

/// Object name for a chat upload. The server validates that the uploader
/// matches the user segment and the channel matches the channel segment.
pub fn object_path(channel_id: Uuid, user_id: Uuid, ext: &str) -> String {
    format!("{}/{}/{}-{}.{}", channel_id, user_id, timestamp(), token(), ext)
}

pub fn check_object_path(path: &str, channel_id: Uuid, user_id: Uuid) -> Result<(), ValidationFailed> {
    let pattern = regex!(r"^([0-9a-f-]{36})/([0-9a-f-]{36})/\d+-[0-9a-f]{32}\.[A-Za-z0-9]{1,8}$");
    let captures = pattern
        .captures(path)
        .ok_or(ValidationFailed("Malformed media object path."))?;
    let path_channel: Uuid = captures[1]
        .parse()
        .map_err(|_| ValidationFailed("Malformed media object path."))?;
    let path_user: Uuid = captures[2]
        .parse()
        .map_err(|_| ValidationFailed("Malformed media object path."))?;
    if path_channel != channel_id {
        return Err(ValidationFailed("Media object path names another channel."));
    }
    if path_user != user_id {
        return Err(ValidationFailed("Media object path names another uploader."));
    }
    Ok(())
}

/// Signed read URLs by storage path. Misses sign lazily; signing is
/// idempotent, so concurrent misses for one path are allowed to race.
#[derive(Default, Debug)]
pub struct MediaUrlCache {
    urls: HashMap<String, SignedUrl>,
}

impl MediaUrlCache {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.urls.get(path).map(|signed| signed.url.as_str())
    }

    pub fn insert(&mut self, signed: SignedUrl) {
        self.urls.insert(signed.path.clone(), signed);
    }

    pub fn replace(&mut self, urls: Vec<SignedUrl>) {
        self.urls.clear();
        for signed in urls {
            self.insert(signed);
        }
    }

    pub fn evict(&mut self, path: &str) {
        self.urls.remove(path);
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub async fn ensure(&mut self, blobs: &dyn BlobStore, bucket: &str, path: &str) -> Result<&str, RemoteError> {
        if !self.urls.contains_key(path) {
            let signed = blobs.sign(bucket, path, SIGNED_URL_TTL).await?;
            self.urls.insert(path.to_string(), signed);
        }
        match self.urls.get(path) {
            Some(signed) => Ok(&signed.url),
            None => Err(RemoteError::Transport("signing yielded no url".to_string())),
        }
    }
}
