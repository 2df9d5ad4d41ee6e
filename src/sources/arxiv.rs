//! arXiv query API.
//!
//! The API answers with an Atom feed, so results come back as the generic
//! XML mapping rather than JSON.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::{ResponseFormat, SourceError};
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

/// Base URL for arXiv API queries
const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query?search_query=";

/// arXiv source
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
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

    /// Run a search query, e.g. `ti:"neural circuits"+AND+au:smith`.
    ///
    /// The query is appended verbatim; callers encode it the way the arXiv API expects.
    pub async fn query(&self, query: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, query))
            .timeout(self.timeout)
            .format(ResponseFormat::Xml);
        self.client.fetch(&request).await
    }
}
