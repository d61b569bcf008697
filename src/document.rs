use crate::error::AppError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// The part of an indexed document the search path reads back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoredImage {
    pub key: String,
    pub bucket: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SearchHit {
    pub key: String,
    pub labels: Vec<String>,
    pub url: String,
}

pub fn encode(key: &str, bucket: &str, labels: &[String], timestamp: DateTime<Utc>) -> Value {
    json!({
        "key": key,
        "bucket": bucket,
        "labels": labels,
        "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Stable document id for an object, so re-uploads overwrite instead of duplicating.
pub fn document_id(bucket: &str, key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bucket.as_bytes());
    hasher.update(b"/");
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Selects every document whose `key` equals `key` exactly.
pub fn build_delete_query(key: &str) -> Value {
    json!({
        "query": {
            "term": {
                "key": key
            }
        }
    })
}

pub fn build_label_query(label: &str, size: i64) -> Value {
    json!({
        "query": {
            "match": {
                "labels": label
            }
        },
        "size": size
    })
}

pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "key": { "type": "keyword" },
                "bucket": { "type": "keyword" },
                "labels": { "type": "keyword" },
                "timestamp": { "type": "date" }
            }
        }
    })
}

/// Reads `hits.hits[]._source` in store order. Hits without a source are skipped.
pub fn decode_hits(body: &Value) -> Result<Vec<StoredImage>, AppError> {
    let mut images = Vec::new();
    if let Some(hits) = body["hits"]["hits"].as_array() {
        for hit in hits {
            if let Some(source) = hit.get("_source") {
                let image: StoredImage = serde_json::from_value(source.clone()).map_err(|e| {
                    AppError::MalformedHit(format!("{}: {}", hit["_id"], e))
                })?;
                images.push(image);
            } else {
                log::warn!("Search hit {} has no _source; skipping", hit["_id"]);
            }
        }
    }
    Ok(images)
}
