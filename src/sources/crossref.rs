//! Crossref works API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const CROSSREF_API_URL: &str = "https://api.crossref.org/works/";

/// Crossref source
///
/// When a contact address is configured it is sent in a `mailto` header, which
/// Crossref uses to route requests to its "polite" pool.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
    mailto: Option<String>,
}

impl CrossrefSource {
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?))
            .with_mailto(settings.contact_email().map(str::to_string)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            mailto: None,
        }
    }

    pub fn with_mailto(mut self, mailto: Option<String>) -> Self {
        self.mailto = mailto;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Work metadata for a DOI
    pub async fn work(&self, doi: &str) -> Result<Value, SourceError> {
        let mut request =
            FetchRequest::new(format!("{}{}", self.base_url, doi)).timeout(self.timeout);
        if let Some(mailto) = &self.mailto {
            request = request.header("mailto", mailto.as_str());
        }
        self.client.fetch(&request).await
    }
}
