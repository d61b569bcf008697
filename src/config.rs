use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub opensearch_endpoint: String,
    pub index: String,
    pub aws_region: String,
    pub url_expiry_secs: u64,
    pub max_labels: i32,
    pub min_confidence: f32,
    pub search_size: i64,
    pub invocation_timeout_secs: u64,
    pub ensure_index: bool,
    pub web_port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Loads `{config_dir}/default`, `{config_dir}/{RUN_MODE}`, `{config_dir}/local`
    /// and finally the process environment, later sources winning.
    pub fn new(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", config_dir, env)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_dir)).required(false))
            .add_source(Environment::default())
            .build()?;

        Self::from_config(s)
    }

    pub fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_default("index", "photos")?
            .set_default("aws_region", "us-east-1")?
            .set_default("url_expiry_secs", 3600)?
            .set_default("max_labels", 10)?
            .set_default("min_confidence", 75.0)?
            .set_default("search_size", 20)?
            .set_default("invocation_timeout_secs", 30)?
            .set_default("ensure_index", true)?
            .set_default("web_port", 8080)?
            .set_default("log_level", "info")
    }

    /// Deserializes a built configuration and normalizes the endpoint once.
    pub fn from_config(settings: Config) -> Result<Self, ConfigError> {
        let mut config: AppConfig = settings.try_deserialize()?;
        config.opensearch_endpoint = normalize_endpoint(&config.opensearch_endpoint)?;
        if config.index.trim().is_empty() {
            return Err(ConfigError::Message("index must not be empty".into()));
        }
        log::trace!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    pub fn url_expiry(&self) -> Duration {
        Duration::from_secs(self.url_expiry_secs)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }
}

/// Prepends `https://` to a bare host and strips trailing slashes.
pub fn normalize_endpoint(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Message(
            "opensearch_endpoint must not be empty".into(),
        ));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| {
        ConfigError::Message(format!("invalid opensearch_endpoint '{}': {}", raw, e))
    })?;
    if url.host_str().is_none() {
        return Err(ConfigError::Message(format!(
            "opensearch_endpoint '{}' has no host",
            raw
        )));
    }

    Ok(candidate)
}
