//! HTTP client utilities and the generic fetch helper.

use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::sources::{ResponseFormat, SourceError};
use crate::utils::xml;

/// Timeout used when a request does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameters whose values never appear in errors or logs
const SECRET_QUERY_KEYS: &[&str] = &["api_key", "apikey", "token", "access_token"];

/// The value returned for an allowed-empty status code
pub fn empty_result() -> Value {
    Value::Object(Map::new())
}

/// Whether a fetch result is the allowed-empty marker (an empty object)
pub fn is_empty_result(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// A single GET request description
#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
    format: ResponseFormat,
    allow: Vec<u16>,
}

impl FetchRequest {
    /// JSON request with a 10 second timeout that treats 404 as empty
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            format: ResponseFormat::Json,
            allow: vec![404],
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the set of status codes answered with an empty result
    pub fn allow(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.allow = codes.into_iter().collect();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn allows(&self, status: u16) -> bool {
        self.allow.contains(&status)
    }
}

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                SourceError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Perform exactly one GET and parse the body.
    ///
    /// - 200: body parsed in the declared format, or [`SourceError::Decode`]
    /// - status in the allowed-empty set: [`empty_result`]
    /// - any other status: [`SourceError::HttpStatus`]
    /// - no response at all: [`SourceError::Transport`] wrapping the reqwest error
    pub async fn fetch(&self, request: &FetchRequest) -> Result<Value, SourceError> {
        let url = Url::parse(&request.url).map_err(|e| {
            SourceError::Configuration(format!("Invalid URL {}: {}", request.url, e))
        })?;

        let shown_url = redact_url(&request.url);

        let mut builder = self.client.get(url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(url = %shown_url, format = %request.format, "GET");

        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::transport(&shown_url, e))?;

        let status = response.status();
        if status == StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|e| SourceError::transport(&shown_url, e))?;
            return decode_body(&shown_url, request.format, &body);
        }

        if request.allows(status.as_u16()) {
            return Ok(empty_result());
        }

        Err(SourceError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            url: shown_url,
        })
    }
}

/// Replace the values of credential query parameters such as `api_key` with `REDACTED`
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if !pairs.iter().any(|(key, _)| is_secret_key(key)) {
        return url.to_string();
    }

    parsed.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(key, value)| {
        if is_secret_key(key) {
            (key.as_str(), "REDACTED")
        } else {
            (key.as_str(), value.as_str())
        }
    }));
    parsed.into()
}

fn is_secret_key(key: &str) -> bool {
    SECRET_QUERY_KEYS
        .iter()
        .any(|secret| key.eq_ignore_ascii_case(secret))
}

/// Parse a response body in the declared format
pub fn decode_body(url: &str, format: ResponseFormat, body: &str) -> Result<Value, SourceError> {
    let parsed = match format {
        ResponseFormat::Json => serde_json::from_str(body).map_err(|e| e.to_string()),
        ResponseFormat::Xml => xml::to_value(body).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| SourceError::Decode {
        url: url.to_string(),
        format,
        message,
    })
}
