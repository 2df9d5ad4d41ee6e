//! DataCite DOIs API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

const DATACITE_API_URL: &str = "https://api.datacite.org/dois/";

/// DataCite source
#[derive(Debug, Clone)]
pub struct DataciteSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl DataciteSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?)))
    }

    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: DATACITE_API_URL.to_string(),
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

    /// DOI record
    pub async fn doi(&self, doi: &str) -> Result<Value, SourceError> {
        let request =
            FetchRequest::new(format!("{}{}", self.base_url, doi)).timeout(self.timeout);
        self.client.fetch(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn test_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/dois/10.25378/janelia.1")
            .with_status(502)
            .create_async()
            .await;

        let source = DataciteSource::with_client(Arc::new(HttpClient::new().unwrap()))
            .with_base_url(format!("{}/dois/", server.url()));
        let err = source.doi("10.25378/janelia.1").await.unwrap_err();

        assert_eq!(err.status(), Some(502));
    }
}
