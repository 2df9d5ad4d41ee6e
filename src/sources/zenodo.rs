//! Zenodo API.
//!
//! API documentation: <https://developers.zenodo.org>

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient};

const ZENODO_API_URL: &str = "https://zenodo.org/api/";

/// Zenodo source, authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct ZenodoSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
    token: String,
}

impl ZenodoSource {
    /// Create a source using `ZENODO_API_KEY`
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings.zenodo_api_key()?;
        Ok(Self::with_client(Arc::new(HttpClient::new()?), token))
    }

    pub fn with_client(client: Arc<HttpClient>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: ZENODO_API_URL.to_string(),
            timeout: Duration::from_secs(15),
            token: token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query relative to the API root, e.g. `records/10050311`
    pub async fn query(&self, query: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, query))
            .header("Authorization", format!("Bearer {}", self.token))
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}
