use super::IngestError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// Header carrying the feed API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Source feed configuration
#[derive(Clone, Debug, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// UTC offset of the feed's local `created`/`updated` timestamps
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    /// Attribution stamped on exercise trails
    #[serde(default)]
    pub attribution: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_utc_offset_minutes() -> i32 {
    60
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
            utc_offset_minutes: default_utc_offset_minutes(),
            attribution: None,
        }
    }
}

/// Fetches the raw facility feed.
pub async fn fetch_source(config: &SourceConfig) -> Result<Vec<u8>, IngestError> {
    let unavailable = |reason: String| IngestError::SourceUnavailable(reason);

    if config.url.is_empty() {
        return Err(unavailable("no source URL configured".to_string()));
    }
    if config.timeout_seconds == 0 {
        return Err(unavailable("source timeout must be at least one second".to_string()));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| unavailable(format!("failed to build HTTP client: {}", e)))?;

    info!(url = %config.url, "Loading source feed");

    let mut request = client.get(&config.url);
    if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
        request = request.header(API_KEY_HEADER, key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| unavailable(format!("request to {} failed: {}", config.url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(format!(
            "loading data from {} failed with status {}",
            config.url, status
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| unavailable(format!("failed to read body from {}: {}", config.url, e)))?;

    info!(bytes = body.len(), "Source feed downloaded");

    Ok(body.to_vec())
}
