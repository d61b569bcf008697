//! Object-store change notifications as delivered by S3 event routing.

use crate::error::AppError;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageRecord>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_time: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Deserialize, Clone)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ObjectRef {
    /// Percent-encoded, with `+` standing for a space.
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sequencer: Option<String>,
}

impl StorageEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body)
            .map_err(|e| AppError::Decode(format!("malformed storage notification: {}", e)))
    }
}

impl StorageRecord {
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn raw_key(&self) -> &str {
        &self.s3.object.key
    }

    pub fn decoded_key(&self) -> Result<String, AppError> {
        decode_object_key(self.raw_key())
    }
}

/// Decodes a notification key: `+` is a literal space, then percent-escapes are resolved.
/// A literal `+` in the original key arrives as `%2B`.
pub fn decode_object_key(raw: &str) -> Result<String, AppError> {
    let spaced = raw.replace('+', " ");
    if let Some(position) = malformed_escape(&spaced) {
        return Err(AppError::Decode(format!(
            "object key '{}' has a malformed escape at byte {}",
            raw, position
        )));
    }
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| AppError::Decode(format!("object key '{}' is not valid UTF-8: {}", raw, e)))
}

fn malformed_escape(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Some(i);
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    None
}

/// Zero-byte "folder" objects created by consoles end with the path separator.
pub fn is_folder_placeholder(key: &str) -> bool {
    key.ends_with('/')
}
