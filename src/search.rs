use crate::document::index_mapping;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl fmt::Display for StoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreMethod::Get => "GET",
            StoreMethod::Head => "HEAD",
            StoreMethod::Post => "POST",
            StoreMethod::Put => "PUT",
            StoreMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// One REST call against the search store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRequest {
    pub method: StoreMethod,
    pub path: String,
    pub params: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl StoreRequest {
    /// Create-or-replace under a caller-chosen id.
    pub fn upsert(index: &str, id: &str, document: Value) -> Self {
        Self {
            method: StoreMethod::Put,
            path: format!("/{}/_doc/{}", index, id),
            params: Vec::new(),
            body: Some(document),
        }
    }

    pub fn delete_by_query(index: &str, query: Value) -> Self {
        Self {
            method: StoreMethod::Post,
            path: format!("/{}/_delete_by_query", index),
            // A concurrent upsert must not abort the whole removal.
            params: vec![("conflicts", "proceed".to_string())],
            body: Some(query),
        }
    }

    pub fn search(index: &str, query: Value) -> Self {
        Self {
            method: StoreMethod::Post,
            path: format!("/{}/_search", index),
            params: Vec::new(),
            body: Some(query),
        }
    }

    pub fn index_exists(index: &str) -> Self {
        Self {
            method: StoreMethod::Head,
            path: format!("/{}", index),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn create_index(index: &str, settings: Value) -> Self {
        Self {
            method: StoreMethod::Put,
            path: format!("/{}", index),
            params: Vec::new(),
            body: Some(settings),
        }
    }
}

/// Authenticated access to the search store's REST surface.
///
/// Implementations resolve with the response body for statuses below 300 and
/// fail with [`AppError::RemoteStore`] otherwise. They never retry.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn send(&self, request: StoreRequest) -> Result<Value, AppError>;
}

/// Parsed JSON, the raw text as a JSON string when it is not JSON, or `null` when empty.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Creates `index` with the keyword mapping unless it already exists.
pub async fn ensure_index_exists(transport: &dyn SearchTransport, index: &str) -> Result<(), AppError> {
    log::debug!("Checking if search index '{}' exists.", index);
    match transport.send(StoreRequest::index_exists(index)).await {
        Ok(_) => {
            log::debug!("Search index '{}' already exists.", index);
            Ok(())
        }
        Err(AppError::RemoteStore { status: 404, .. }) => {
            log::info!("Search index '{}' does not exist. Creating it.", index);
            match transport
                .send(StoreRequest::create_index(index, index_mapping()))
                .await
            {
                Ok(_) => {
                    log::info!("Search index '{}' created successfully.", index);
                    Ok(())
                }
                // Another instance won the race.
                Err(AppError::RemoteStore { status: 400, body })
                    if body.contains("resource_already_exists_exception") =>
                {
                    log::debug!("Search index '{}' was created concurrently.", index);
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
