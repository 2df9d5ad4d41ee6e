//! Configuration management.
//!
//! Two layers:
//!
//! - [`Settings`]: secrets and URLs taken from the process environment
//!   (`CONFIG_SERVER_URL`, `ELSEVIER_API_KEY`, `PEOPLE_API_KEY`, `PROTOCOLS_API_TOKEN`,
//!   `ZENODO_API_KEY`, `NCBI_API_KEY`, `JRC_CONTACT_EMAIL`)
//! - [`ConfigClient`]: named configurations served by the central configuration service

mod service;

pub use service::{
    format_run_data, get_run_data, get_user_name, login_name, ConfigClient, MailServer,
    ServersConfig, WorkdayConfig, WorkdayRecord,
};

use serde::Deserialize;

use crate::sources::SourceError;

/// Environment-derived settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Base URL of the configuration service
    #[serde(default, alias = "CONFIG_SERVER_URL")]
    pub config_server_url: Option<String>,

    #[serde(default, alias = "ELSEVIER_API_KEY")]
    pub elsevier_api_key: Option<String>,

    #[serde(default, alias = "PEOPLE_API_KEY")]
    pub people_api_key: Option<String>,

    #[serde(default, alias = "PROTOCOLS_API_TOKEN")]
    pub protocols_api_token: Option<String>,

    #[serde(default, alias = "ZENODO_API_KEY")]
    pub zenodo_api_key: Option<String>,

    /// Gates the PubMed search fallback of PMID resolution
    #[serde(default, alias = "NCBI_API_KEY")]
    pub ncbi_api_key: Option<String>,

    /// Contact address sent to Crossref and NCBI
    #[serde(default, rename = "jrc_contact_email", alias = "JRC_CONTACT_EMAIL")]
    pub contact_email: Option<String>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::load(config::Environment::default())
    }

    /// Load settings from an explicit set of variables instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(config::Environment::default().source(Some(vars)))
    }

    fn load(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    pub fn config_server_url(&self) -> Result<&str, SourceError> {
        require(&self.config_server_url, "CONFIG_SERVER_URL")
    }

    pub fn elsevier_api_key(&self) -> Result<&str, SourceError> {
        require(&self.elsevier_api_key, "ELSEVIER_API_KEY")
    }

    pub fn people_api_key(&self) -> Result<&str, SourceError> {
        require(&self.people_api_key, "PEOPLE_API_KEY")
    }

    pub fn protocols_api_token(&self) -> Result<&str, SourceError> {
        require(&self.protocols_api_token, "PROTOCOLS_API_TOKEN")
    }

    pub fn zenodo_api_key(&self) -> Result<&str, SourceError> {
        require(&self.zenodo_api_key, "ZENODO_API_KEY")
    }

    pub fn ncbi_api_key(&self) -> Option<&str> {
        non_empty(&self.ncbi_api_key)
    }

    pub fn contact_email(&self) -> Option<&str> {
        non_empty(&self.contact_email)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn require<'a>(value: &'a Option<String>, var: &str) -> Result<&'a str, SourceError> {
    non_empty(value).ok_or_else(|| SourceError::missing_env(var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_vars() {
        let settings = Settings::from_vars([
            ("CONFIG_SERVER_URL", "https://config.example.org"),
            ("NCBI_API_KEY", "ncbi"),
            ("JRC_CONTACT_EMAIL", "library@example.org"),
            ("UNRELATED", "ignored"),
        ])
        .unwrap();

        assert_eq!(
            settings.config_server_url().unwrap(),
            "https://config.example.org"
        );
        assert_eq!(settings.ncbi_api_key(), Some("ncbi"));
        assert_eq!(settings.contact_email(), Some("library@example.org"));
        assert!(settings.zenodo_api_key().is_err());
    }

    #[test]
    fn test_missing_values_are_configuration_errors() {
        let settings = Settings {
            people_api_key: Some(String::new()),
            ..Settings::default()
        };

        match settings.people_api_key() {
            Err(SourceError::Configuration(msg)) => {
                assert_eq!(msg, "Missing environment variable PEOPLE_API_KEY")
            }
            other => panic!("Expected Configuration error, got {:?}", other),
        }
        assert!(settings.elsevier_api_key().is_err());
        assert!(settings.protocols_api_token().is_err());
        assert_eq!(settings.ncbi_api_key(), None);
    }
}
