//! Institutional People directory API.
//!
//! The directory is slow to answer under load, so every call is retried on
//! timeouts with [`people_retry_policy`]. GETs are idempotent, so this is safe.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::SourceError;
use crate::utils::{
    is_empty_result, people_retry_policy, with_retry, FetchRequest, HttpClient, RetryPolicy,
};

const PEOPLE_API_URL: &str = "https://hhmipeople-prod.azurewebsites.net/People/";

/// People directory source, authenticated with an `APIKey` header
#[derive(Debug, Clone)]
pub struct PeopleSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    /// Overrides the per-operation timeouts when set
    timeout: Option<Duration>,
}

impl PeopleSource {
    /// Create a source using `PEOPLE_API_KEY`
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        let api_key = settings.people_api_key()?;
        Ok(Self::with_client(Arc::new(HttpClient::new()?), api_key))
    }

    pub fn with_client(client: Arc<HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: PEOPLE_API_URL.to_string(),
            api_key: api_key.into(),
            retry: people_retry_policy(),
            timeout: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use one timeout for every operation instead of the 5 s / 10 s defaults
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn get(
        &self,
        label: &str,
        path: String,
        timeout: Duration,
    ) -> Result<Value, SourceError> {
        let request = FetchRequest::new(format!("{}{}", self.base_url, path))
            .header("APIKey", self.api_key.as_str())
            .header("Content-Type", "application/json")
            .timeout(self.timeout.unwrap_or(timeout));
        with_retry(&self.retry, label, || self.client.fetch(&request)).await
    }

    /// Person record by employee ID.
    ///
    /// An unknown ID gives the empty result; a record without a first name is not a
    /// usable person and gives `None`.
    pub async fn by_id(&self, employee_id: &str) -> Result<Option<Value>, SourceError> {
        let response = self
            .get(
                "people_by_id",
                format!("Person/GetById/{}", urlencoding::encode(employee_id)),
                Duration::from_secs(5),
            )
            .await?;

        if !is_empty_result(&response) && !has_first_name(&response) {
            return Ok(None);
        }
        Ok(Some(response))
    }

    /// People matching a name
    pub async fn by_name(&self, name: &str) -> Result<Value, SourceError> {
        self.get(
            "people_by_name",
            format!("Search/ByName/{}", urlencoding::encode(name)),
            Duration::from_secs(5),
        )
        .await
    }

    /// One page (starting at 0) of the members of a supervisory organization
    pub async fn by_org(&self, code: &str, page: u32) -> Result<Value, SourceError> {
        self.get(
            "people_by_suporg",
            format!("GetByOrg/{}/{}", urlencoding::encode(code), page),
            Duration::from_secs(10),
        )
        .await
    }
}

fn has_first_name(record: &Value) -> bool {
    record
        .get("nameFirst")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty())
}
