use crate::document::{build_label_query, decode_hits, SearchHit, StoredImage};
use crate::error::AppError;
use crate::search::{SearchTransport, StoreRequest};
use crate::storage::ObjectStore;
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const SEARCH_KEY_HEADER: &str = "search-key";
pub const MISSING_SEARCH_KEY: &str = "Missing search-key";

/// Label search over the index, returning hits with fresh access URLs.
pub struct SearchHandler {
    search: Arc<dyn SearchTransport>,
    store: Arc<dyn ObjectStore>,
    index: String,
    size: i64,
    url_expiry: Duration,
}

impl SearchHandler {
    pub fn new(
        search: Arc<dyn SearchTransport>,
        store: Arc<dyn ObjectStore>,
        index: impl Into<String>,
        size: i64,
        url_expiry: Duration,
    ) -> Self {
        Self {
            search,
            store,
            index: index.into(),
            size,
            url_expiry,
        }
    }

    /// Hits come back in the store's relevance order. A URL that cannot be
    /// minted fails the whole search rather than dropping the hit.
    pub async fn search(&self, label: &str) -> Result<Vec<SearchHit>, AppError> {
        let label = label.to_lowercase();
        log::debug!("Searching index '{}' for label: {}", self.index, label);

        let body = self
            .search
            .send(StoreRequest::search(&self.index, build_label_query(&label, self.size)))
            .await?;
        let images = decode_hits(&body)?;

        let hits = try_join_all(images.into_iter().map(|image| self.with_url(image))).await?;
        log::debug!("Found {} images for label: {}", hits.len(), label);
        Ok(hits)
    }

    async fn with_url(&self, image: StoredImage) -> Result<SearchHit, AppError> {
        let url = self
            .store
            .presign_get(&image.bucket, &image.key, self.url_expiry)
            .await?;
        Ok(SearchHit {
            key: image.key,
            labels: image.labels,
            url,
        })
    }
}

/// Picks the search label from the `search-key` header, then body `q`, then
/// body `search-key`. Empty values count as absent.
pub fn extract_search_key(header: Option<&str>, body: &[u8]) -> Result<String, AppError> {
    if let Some(value) = header.map(str::trim).filter(|v| !v.is_empty()) {
        return Ok(value.to_string());
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest(MISSING_SEARCH_KEY.to_string()));
    }

    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Decode(format!("request body is not valid JSON: {}", e)))?;

    ["q", SEARCH_KEY_HEADER]
        .iter()
        .filter_map(|field| parsed.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(MISSING_SEARCH_KEY.to_string()))
}
