#![allow(dead_code)]

use async_trait::async_trait;
use photo_indexer::config::AppConfig;
use photo_indexer::error::AppError;
use photo_indexer::labels::LabelOracle;
use photo_indexer::notification::StorageEvent;
use photo_indexer::search::{SearchTransport, StoreMethod, StoreRequest};
use photo_indexer::storage::ObjectStore;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type FailRule = Box<dyn Fn(&StoreRequest) -> bool + Send + Sync>;

/// In-memory stand-in for the search store: PUT-by-id, term delete-by-query,
/// label match search, index HEAD/PUT.
#[derive(Default)]
pub struct MemorySearchStore {
    indices: Mutex<HashSet<String>>,
    documents: Mutex<BTreeMap<String, Value>>,
    requests: Mutex<Vec<StoreRequest>>,
    failures: Mutex<Vec<(FailRule, u16, String)>>,
}

impl MemorySearchStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_when<F>(&self, rule: F, status: u16, body: &str)
    where
        F: Fn(&StoreRequest) -> bool + Send + Sync + 'static,
    {
        self.failures
            .lock()
            .unwrap()
            .push((Box::new(rule), status, body.to_string()));
    }

    /// Inserts a document under a store-assigned style id, bypassing the handlers.
    pub fn insert_raw(&self, id: &str, document: Value) {
        self.documents.lock().unwrap().insert(id.to_string(), document);
    }

    pub fn documents(&self) -> Vec<Value> {
        self.documents.lock().unwrap().values().cloned().collect()
    }

    pub fn documents_for_key(&self, key: &str) -> Vec<Value> {
        self.documents()
            .into_iter()
            .filter(|doc| doc["key"] == json!(key))
            .collect()
    }

    pub fn requests(&self) -> Vec<StoreRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.indices.lock().unwrap().contains(index)
    }

    fn dispatch(&self, request: &StoreRequest) -> Result<Value, AppError> {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (StoreMethod::Head, [index]) => {
                if self.has_index(index) {
                    Ok(Value::Null)
                } else {
                    Err(AppError::RemoteStore {
                        status: 404,
                        body: String::new(),
                    })
                }
            }
            (StoreMethod::Put, [index]) => {
                self.indices.lock().unwrap().insert(index.to_string());
                Ok(json!({ "acknowledged": true, "index": index }))
            }
            (StoreMethod::Put, [_, "_doc", id]) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let previous = self.documents.lock().unwrap().insert(id.to_string(), body);
                let result = if previous.is_some() { "updated" } else { "created" };
                Ok(json!({ "_id": id, "result": result }))
            }
            (StoreMethod::Post, [_, "_delete_by_query"]) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let key = body["query"]["term"]["key"].clone();
                let mut documents = self.documents.lock().unwrap();
                let before = documents.len();
                documents.retain(|_, doc| doc["key"] != key);
                Ok(json!({ "deleted": before - documents.len(), "version_conflicts": 0 }))
            }
            (StoreMethod::Post, [_, "_search"]) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let label = body["query"]["match"]["labels"].clone();
                let size = body["size"].as_u64().unwrap_or(10) as usize;
                let hits: Vec<Value> = self
                    .documents
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|(_, doc)| {
                        doc["labels"]
                            .as_array()
                            .map(|labels| labels.contains(&label))
                            .unwrap_or(false)
                    })
                    .take(size)
                    .map(|(id, doc)| json!({ "_id": id, "_score": 1.0, "_source": doc }))
                    .collect();
                Ok(json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } }))
            }
            _ => Err(AppError::RemoteStore {
                status: 400,
                body: format!("unsupported {} {}", request.method, request.path),
            }),
        }
    }
}

#[async_trait]
impl SearchTransport for MemorySearchStore {
    async fn send(&self, request: StoreRequest) -> Result<Value, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        for (rule, status, body) in self.failures.lock().unwrap().iter() {
            if rule(&request) {
                return Err(AppError::RemoteStore {
                    status: *status,
                    body: body.clone(),
                });
            }
        }
        self.dispatch(&request)
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_presign: Mutex<bool>,
    calls: Mutex<usize>,
}

impl MemoryObjectStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), bytes.to_vec());
    }

    pub fn fail_presigning(&self) {
        *self.fail_presign.lock().unwrap() = true;
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError> {
        *self.calls.lock().unwrap() += 1;
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| AppError::ObjectStore(format!("NoSuchKey: s3://{}/{}", bucket, key)))
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, AppError> {
        *self.calls.lock().unwrap() += 1;
        if *self.fail_presign.lock().unwrap() {
            return Err(AppError::ObjectStore("presigning is unavailable".into()));
        }
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            bucket,
            urlencoding::encode(key),
            expires_in.as_secs()
        ))
    }
}

/// Labels keyed by image content; unknown content is rejected like a corrupt image.
#[derive(Default)]
pub struct ScriptedOracle {
    answers: Mutex<HashMap<Vec<u8>, Vec<String>>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<usize>,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, image: &[u8], labels: &[&str]) {
        self.answers.lock().unwrap().insert(
            image.to_vec(),
            labels.iter().map(|label| label.to_string()).collect(),
        );
    }

    /// Every later call waits this long before answering.
    pub fn respond_after(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LabelOracle for ScriptedOracle {
    async fn detect_labels(&self, image: Vec<u8>) -> Result<Vec<String>, AppError> {
        *self.calls.lock().unwrap() += 1;
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.answers
            .lock()
            .unwrap()
            .get(&image)
            .cloned()
            .ok_or_else(|| AppError::Oracle("InvalidImageFormatException: request has unsupported image format".into()))
    }
}

pub fn test_config() -> AppConfig {
    test_config_with(&[])
}

pub fn test_config_with(overrides: &[(&str, i64)]) -> AppConfig {
    let mut builder = AppConfig::with_defaults(config::Config::builder())
        .and_then(|b| b.set_override("opensearch_endpoint", "search-photos.us-east-1.es.amazonaws.com"))
        .expect("defaults must apply");
    for (key, value) in overrides {
        builder = builder.set_override(*key, *value).expect("override must apply");
    }
    AppConfig::from_config(builder.build().expect("config must build")).expect("config must load")
}

pub fn event(records: &[(&str, &str)]) -> StorageEvent {
    let records: Vec<Value> = records
        .iter()
        .map(|(bucket, key)| {
            json!({
                "eventName": "ObjectCreated:Put",
                "s3": { "bucket": { "name": bucket }, "object": { "key": key } }
            })
        })
        .collect();
    serde_json::from_value(json!({ "Records": records })).expect("event must parse")
}
