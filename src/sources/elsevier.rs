//! Elsevier content API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient};

const ELSEVIER_API_URL: &str = "https://api.elsevier.com/content/";

/// Elsevier source, authenticated with an `X-ELS-APIKey` header
#[derive(Debug, Clone)]
pub struct ElsevierSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
    api_key: String,
}

impl ElsevierSource {
    /// Create a source using `ELSEVIER_API_KEY`
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let api_key = settings.elsevier_api_key()?;
        Ok(Self::with_client(Arc::new(HttpClient::new()?), api_key))
    }

    pub fn with_client(client: Arc<HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: ELSEVIER_API_URL.to_string(),
            timeout: Duration::from_secs(15),
            api_key: api_key.into(),
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

    /// Content query relative to the API root, e.g. `abstract/doi/10.1016/j.cell.2020.01.001`
    pub async fn content(&self, query: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, query))
            .header("X-ELS-APIKey", self.api_key.as_str())
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}
