use crate::config::AppConfig;
use crate::error::AppError;
use crate::search::{parse_body, SearchTransport, StoreMethod, StoreRequest};
use async_trait::async_trait;
use aws_config::SdkConfig;
use config::ConfigError;
use opensearch::{
    auth::Credentials,
    http::{
        headers::{HeaderMap, HeaderValue, CONTENT_TYPE},
        transport::{SingleNodeConnectionPool, TransportBuilder},
        Method,
    },
    OpenSearch,
};
use serde_json::Value;
use url::Url;

/// SigV4 service name for managed OpenSearch domains.
const SERVICE_NAME: &str = "es";

/// Search store client that signs every request with the given AWS credentials.
pub struct SignedSearchClient {
    client: OpenSearch,
}

impl SignedSearchClient {
    pub fn new(config: &AppConfig, sdk_config: &SdkConfig) -> Result<Self, AppError> {
        log::debug!(
            "Creating signed OpenSearch client for endpoint: {} (region {})",
            config.opensearch_endpoint,
            config.aws_region
        );
        let url = Url::parse(&config.opensearch_endpoint).map_err(|e| {
            ConfigError::Message(format!(
                "invalid opensearch_endpoint '{}': {}",
                config.opensearch_endpoint, e
            ))
        })?;
        let credentials = Credentials::try_from(sdk_config.clone()).map_err(|e| {
            ConfigError::Message(format!("cannot derive request signing credentials: {}", e))
        })?;

        let conn_pool = SingleNodeConnectionPool::new(url);
        let transport = TransportBuilder::new(conn_pool)
            .auth(credentials)
            .service_name(SERVICE_NAME)
            .disable_proxy()
            .build()
            .map_err(|e| AppError::Transport(e.to_string()))?;
        log::trace!("Signed OpenSearch client created successfully.");
        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }
}

fn to_method(method: StoreMethod) -> Method {
    match method {
        StoreMethod::Get => Method::Get,
        StoreMethod::Head => Method::Head,
        StoreMethod::Post => Method::Post,
        StoreMethod::Put => Method::Put,
        StoreMethod::Delete => Method::Delete,
    }
}

#[async_trait]
impl SearchTransport for SignedSearchClient {
    async fn send(&self, request: StoreRequest) -> Result<Value, AppError> {
        log::debug!("Sending signed {} {}", request.method, request.path);

        // Serialized exactly once: these bytes are both signed and transmitted.
        let body = request.body.as_ref().map(serde_json::to_vec).transpose()?;
        if let Some(bytes) = &body {
            log::trace!("Request body ({} bytes): {}", bytes.len(), String::from_utf8_lossy(bytes));
        }

        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let params = if request.params.is_empty() {
            None
        } else {
            Some(&request.params)
        };

        let response = self
            .client
            .send(to_method(request.method), &request.path, headers, params, body, None)
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        let status = response.status_code().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        log::trace!("Search store answered {} {} with {}: {}", request.method, request.path, status, text);
        normalize_response(status, text)
    }
}

/// Anything at or above 300 is a store error carrying the body verbatim.
fn normalize_response(status: u16, text: String) -> Result<Value, AppError> {
    if status >= 300 {
        return Err(AppError::RemoteStore { status, body: text });
    }
    Ok(parse_body(&text))
}
