//! ORCID public API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const ORCID_API_URL: &str = "https://pub.orcid.org/v3.0/";

/// ORCID source
#[derive(Debug, Clone)]
pub struct OrcidSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl OrcidSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: ORCID_API_URL.to_string(),
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

    /// Public record for an ORCID iD. Sub-resources can be requested with a path
    /// suffix, e.g. `0000-0002-1825-0097/works`.
    pub async fn record(&self, orcid: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, orcid))
            .header("Accept", "application/json")
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_record() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v3.0/0000-0002-1825-0097")
            .match_header("Accept", "application/json")
            .with_status(200)
            .with_body(r#"{"orcid-identifier": {"path": "0000-0002-1825-0097"}}"#)
            .create_async()
            .await;

        let source = OrcidSource::with_client(Arc::new(HttpClient::new().unwrap()))
            .with_base_url(format!("{}/v3.0/", server.url()));
        let record = source.record("0000-0002-1825-0097").await.unwrap();

        assert_eq!(record["orcid-identifier"]["path"], "0000-0002-1825-0097");
    }
}
