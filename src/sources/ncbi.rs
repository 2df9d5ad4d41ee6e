//! NCBI identifier services: PMC ID conversion and PubMed E-utilities search.
//!
//! DOI to PMID resolution tries the ID conversion service first. Only when that is
//! silent and an `NCBI_API_KEY` is configured does it fall back to an ESearch query
//! on the DOI field, whose response shape is noisier and needs classifying.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::sources::{ResponseFormat, SourceError};
use crate::utils::{FetchRequest, HttpClient, DEFAULT_TIMEOUT};

/// PMC ID conversion API
const IDCONV_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/";
/// PubMed E-utilities search API
const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
/// Tool name reported to NCBI
const TOOL: &str = "jrc_common";

/// Identifier requested from [`NcbiSource::convert_pmid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertTarget {
    Pmcid,
    Doi,
}

impl ConvertTarget {
    fn field(self) -> &'static str {
        match self {
            ConvertTarget::Pmcid => "pmcid",
            ConvertTarget::Doi => "doi",
        }
    }
}

/// NCBI source
#[derive(Debug, Clone)]
pub struct NcbiSource {
    client: Arc<HttpClient>,
    idconv_url: String,
    esearch_url: String,
    timeout: Duration,
    api_key: Option<String>,
    email: Option<String>,
}

impl NcbiSource {
    /// Create a source using `NCBI_API_KEY` and `JRC_CONTACT_EMAIL` when present
    pub fn new(settings: &Settings) -> Result<Self, SourceError> {
        Ok(Self::with_client(Arc::new(HttpClient::new()?))
            .with_api_key(settings.ncbi_api_key().map(str::to_string))
            .with_email(settings.contact_email().map(str::to_string)))
    }

    /// Create with a custom HTTP client and no credentials
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            idconv_url: IDCONV_URL.to_string(),
            esearch_url: ESEARCH_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            email: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|email| !email.is_empty());
        self
    }

    /// Point the source at other ID conversion and ESearch endpoints
    pub fn with_base_urls(
        mut self,
        idconv_url: impl Into<String>,
        esearch_url: impl Into<String>,
    ) -> Self {
        self.idconv_url = idconv_url.into();
        self.esearch_url = esearch_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn idconv_request(&self, id: &str) -> FetchRequest {
        let mut url = format!("{}?tool={}&format=json", self.idconv_url, TOOL);
        if let Some(email) = &self.email {
            url.push_str(&format!("&email={}", urlencoding::encode(email)));
        }
        url.push_str(&format!("&ids={}", urlencoding::encode(id)));

        FetchRequest::new(url)
            .timeout(self.timeout)
            .allow([400, 403, 404])
    }

    /// Resolve a DOI to a PubMed identifier.
    ///
    /// Returns `Ok(None)` when the ID conversion service has no PMID and no API key is
    /// configured, or when PubMed reports a single hit whose identifier is not numeric.
    /// PubMed misses and unexpected responses are [`SourceError::NotFound`] with the
    /// upstream diagnostics attached.
    pub async fn get_pmid(&self, doi: &str) -> Result<Option<String>, SourceError> {
        let response = self.client.fetch(&self.idconv_request(doi)).await?;
        if let Some(pmid) = record_field(&response, "pmid") {
            return Ok(Some(pmid));
        }

        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        self.search_pubmed(doi, api_key).await
    }

    async fn search_pubmed(
        &self,
        doi: &str,
        api_key: &str,
    ) -> Result<Option<String>, SourceError> {
        let url = format!(
            "{}?db=pubmed&api_key={}&term={}",
            self.esearch_url,
            urlencoding::encode(api_key),
            urlencoding::encode(&format!("{}[DOI]", doi))
        );
        let request = FetchRequest::new(url)
            .timeout(self.timeout)
            .format(ResponseFormat::Xml)
            .allow(std::iter::empty());

        let data = match self.client.fetch(&request).await {
            Ok(data) => data,
            Err(SourceError::HttpStatus { status, .. }) => {
                return Err(SourceError::NotFound {
                    message: format!("Could not find PMID for {}", doi),
                    details: format!("Status: {}", status),
                })
            }
            Err(err) => return Err(err),
        };

        classify_esearch(doi, &data)
    }

    /// Convert a PMID to a PMCID or DOI; `Ok(None)` when NCBI has no such identifier
    pub async fn convert_pmid(
        &self,
        pmid: &str,
        target: ConvertTarget,
    ) -> Result<Option<String>, SourceError> {
        let response = self.client.fetch(&self.idconv_request(pmid)).await?;
        Ok(record_field(&response, target.field()))
    }
}

/// Field of the first record of an "ok" ID conversion response
fn record_field(response: &Value, field: &str) -> Option<String> {
    if response.get("status").and_then(Value::as_str) != Some("ok") {
        return None;
    }

    match response.get("records")?.get(0)?.get(field)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn is_numeric(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

fn not_found(message: String, details: &Value) -> SourceError {
    SourceError::NotFound {
        message,
        details: details.to_string(),
    }
}

/// Interpret a parsed ESearch response
fn classify_esearch(doi: &str, data: &Value) -> Result<Option<String>, SourceError> {
    let result = data.get("eSearchResult");
    let count = result.and_then(|r| r.get("Count")).and_then(Value::as_str);

    match (result, count) {
        (Some(result), Some("1")) => {
            if let Some(id) = result.get("IdList").and_then(|list| list.get("Id")) {
                return Ok(id.as_str().filter(|id| is_numeric(id)).map(str::to_string));
            }
        }
        (Some(result), Some("0")) => {
            let details = ["ErrorList", "WarningList"]
                .iter()
                .find_map(|key| result.get(*key))
                .unwrap_or(data);
            return Err(not_found(format!("No PMID found for {}", doi), details));
        }
        _ => {}
    }

    Err(not_found(format!("Invalid PMID for {}", doi), data))
}
