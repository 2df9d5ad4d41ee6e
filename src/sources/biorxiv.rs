//! bioRxiv details API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const BIORXIV_API_URL: &str = "https://api.biorxiv.org/details/biorxiv/";

/// bioRxiv source
#[derive(Debug, Clone)]
pub struct BiorxivSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl BiorxivSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: BIORXIV_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
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

    /// Preprint details for a DOI
    pub async fn details(&self, doi: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, doi))
            .header("Accept", "application/json")
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}
