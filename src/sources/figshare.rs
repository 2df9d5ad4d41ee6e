//! Figshare articles API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const FIGSHARE_API_URL: &str = "https://api.figshare.com/v2/";

/// Figshare source
#[derive(Debug, Clone)]
pub struct FigshareSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl FigshareSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: FIGSHARE_API_URL.to_string(),
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

    /// Articles carrying the given DOI
    pub async fn articles_by_doi(&self, doi: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!(
            "{}articles?doi={}",
            self.base_url,
            urlencoding::encode(doi)
        ))
        .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}
