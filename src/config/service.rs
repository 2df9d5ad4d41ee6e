//! Client for the central configuration service.
//!
//! Configurations are fetched with `GET {CONFIG_SERVER_URL}/config/{name}` and the
//! `config` member of the response is returned. Typed access deserializes straight into
//! a known structure so missing fields fail at fetch time.

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::Settings;
use crate::sources::{ResponseFormat, SourceError};
use crate::utils::{FetchRequest, HttpClient};

const CONFIG_TIMEOUT: Duration = Duration::from_secs(10);

/// `servers` configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServersConfig {
    pub mail: MailServer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailServer {
    /// `host` or `host:port` of the SMTP relay
    pub address: String,
}

/// `workday` configuration: login name to person record
pub type WorkdayConfig = HashMap<String, WorkdayRecord>;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkdayRecord {
    pub first: String,
    pub last: String,
}

/// Configuration service client
#[derive(Debug, Clone)]
pub struct ConfigClient {
    client: Arc<HttpClient>,
    base_url: String,
}

impl ConfigClient {
    /// Create a client for the service at `base_url`
    pub fn new(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Create a client from `CONFIG_SERVER_URL`
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let base_url = settings.config_server_url()?;
        Ok(Self::new(Arc::new(HttpClient::new()?), base_url))
    }

    fn config_url(&self, name: &str) -> String {
        format!(
            "{}/config/{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(name)
        )
    }

    /// Fetch a named configuration as an untyped tree
    pub async fn get_config_value(&self, name: &str) -> Result<Value, SourceError> {
        let url = self.config_url(name);
        let request = FetchRequest::new(&url)
            .timeout(CONFIG_TIMEOUT)
            .allow(std::iter::empty());

        let mut response = self.client.fetch(&request).await?;
        response
            .get_mut("config")
            .map(Value::take)
            .ok_or_else(|| SourceError::Decode {
                url,
                format: ResponseFormat::Json,
                message: "response has no config member".to_string(),
            })
    }

    /// Fetch a named configuration and deserialize it
    pub async fn get_config<T: DeserializeOwned>(&self, name: &str) -> Result<T, SourceError> {
        let value = self.get_config_value(name).await?;
        serde_json::from_value(value).map_err(|e| SourceError::Decode {
            url: self.config_url(name),
            format: ResponseFormat::Json,
            message: e.to_string(),
        })
    }
}

/// Login name of the user running the program
pub fn login_name() -> Option<String> {
    ["LOGNAME", "USER", "LNAME", "USERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.is_empty())
}

/// Name of the user running the program, as "First Last" when the `workday`
/// configuration knows the login name
pub async fn get_user_name(config: &ConfigClient) -> Result<Option<String>, SourceError> {
    let Some(user) = login_name() else {
        return Ok(None);
    };

    let workday: WorkdayConfig = config.get_config("workday").await?;
    Ok(Some(match workday.get(&user) {
        Some(record) => format!("{} {}", record.first, record.last),
        None => user,
    }))
}

/// Run banner with program name and version, user and date/time
pub async fn get_run_data(
    program: &str,
    version: &str,
    config: &ConfigClient,
) -> Result<String, SourceError> {
    let user = get_user_name(config).await?;
    Ok(format_run_data(program, version, user.as_deref(), Local::now()))
}

pub fn format_run_data(
    program: &str,
    version: &str,
    user: Option<&str>,
    at: DateTime<Local>,
) -> String {
    let program = Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.to_string());
    let at = at.format("%Y-%m-%d %H:%M:%S%.6f");

    match user {
        Some(user) => format!("{} (version {}) run by {} at {}\n", program, version, user, at),
        None => format!("{} (version {}) run at {}\n", program, version, at),
    }
}
