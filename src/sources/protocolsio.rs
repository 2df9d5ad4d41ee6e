//! protocols.io API.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::SourceError;
use crate::utils::{FetchRequest, HttpClient};

const PROTOCOLSIO_API_URL: &str = "https://www.protocols.io/api/v3/";

/// protocols.io source, authenticated with a bearer token
#[derive(Debug, Clone)]
pub struct ProtocolsIoSource {
    client: Arc<HttpClient>,
    base_url: String,
    timeout: Duration,
    token: String,
}

impl ProtocolsIoSource {
    /// Create a source using `PROTOCOLS_API_TOKEN`
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings.protocols_api_token()?;
        Ok(Self::with_client(Arc::new(HttpClient::new()?), token))
    }

    pub fn with_client(client: Arc<HttpClient>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: PROTOCOLSIO_API_URL.to_string(),
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

    /// Query relative to the API root, e.g. `protocols?filter=public&key=janelia`
    pub async fn query(&self, query: &str) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, query))
            .header("Authorization", format!("Bearer {}", self.token))
            .timeout(self.timeout);
        self.client.fetch(&request).await
    }
}
