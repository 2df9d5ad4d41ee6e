//! Upstream scholarly-metadata and directory services.
//!
//! Every service in this module is a thin wrapper that builds a
//! [`FetchRequest`](crate::utils::FetchRequest) and hands it to the shared
//! [`HttpClient`](crate::utils::HttpClient). They differ only in base URL, headers,
//! default timeout and response format:
//!
//! - [`ArxivSource`]: arXiv query API (XML)
//! - [`BiorxivSource`]: bioRxiv details API
//! - [`CrossrefSource`]: Crossref works API
//! - [`DataciteSource`]: DataCite DOIs API
//! - [`ElsevierSource`]: Elsevier content API (`ELSEVIER_API_KEY`)
//! - [`FigshareSource`]: Figshare articles API
//! - [`NcbiSource`]: NCBI ID conversion and PubMed search (`NCBI_API_KEY`, optional)
//! - [`OaSource`]: OA.Works report API
//! - [`OrcidSource`]: ORCID public API
//! - [`PeopleSource`]: institutional People directory (`PEOPLE_API_KEY`), retried on timeouts
//! - [`ProtocolsIoSource`]: protocols.io API (`PROTOCOLS_API_TOKEN`)
//! - [`ZenodoSource`]: Zenodo API (`ZENODO_API_KEY`)
//!
//! All of them return the parsed response tree as a [`serde_json::Value`]. A status code
//! in the request's allowed-empty set yields an empty object rather than an error; use
//! [`is_empty_result`](crate::utils::is_empty_result) to tell it apart from data.

mod arxiv;
mod biorxiv;
mod crossref;
mod datacite;
mod elsevier;
mod figshare;
mod ncbi;
mod oa;
mod orcid;
mod people;
mod protocolsio;
mod zenodo;

pub use arxiv::ArxivSource;
pub use biorxiv::BiorxivSource;
pub use crossref::CrossrefSource;
pub use datacite::DataciteSource;
pub use elsevier::ElsevierSource;
pub use figshare::FigshareSource;
pub use ncbi::{ConvertTarget, NcbiSource};
pub use oa::OaSource;
pub use orcid::OrcidSource;
pub use people::PeopleSource;
pub use protocolsio::ProtocolsIoSource;
pub use zenodo::ZenodoSource;

use std::fmt;
use std::str::FromStr;

/// Declared format of a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Json,
    Xml,
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseFormat::Json => f.write_str("JSON"),
            ResponseFormat::Xml => f.write_str("XML"),
        }
    }
}

impl FromStr for ResponseFormat {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ResponseFormat::Json),
            "xml" => Ok(ResponseFormat::Xml),
            _ => Err(SourceError::Configuration(format!("Unknown format: {}", s))),
        }
    }
}

/// Class of a transport-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Timed out while establishing the connection
    ConnectTimeout,
    /// Timed out while reading the response body
    ReadTimeout,
    /// Any other timeout (typically waiting for response headers)
    Timeout,
    /// Connection refused, DNS failure and friends
    Connect,
    /// Everything else (bad header value, redirect loop, ...)
    Other,
}

impl TransportKind {
    /// Classify a reqwest error
    pub fn of(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            if err.is_connect() {
                TransportKind::ConnectTimeout
            } else if err.is_body() || err.is_decode() {
                TransportKind::ReadTimeout
            } else {
                TransportKind::Timeout
            }
        } else if err.is_connect() {
            TransportKind::Connect
        } else {
            TransportKind::Other
        }
    }

    pub fn is_timeout(self) -> bool {
        matches!(
            self,
            TransportKind::ConnectTimeout | TransportKind::ReadTimeout | TransportKind::Timeout
        )
    }
}

/// Errors that can occur when talking to an upstream service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request never produced a response (timeout, DNS, refused, ...)
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        kind: TransportKind,
        #[source]
        source: reqwest::Error,
    },

    /// A 200 response whose body does not parse in the declared format
    #[error("Could not decode {format} response from {url} : {message}")]
    Decode {
        url: String,
        format: ResponseFormat,
        message: String,
    },

    /// A status code that is neither 200 nor in the allowed-empty set
    #[error("Request failed with status {status} ({reason}) for {url}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    /// Domain lookup that found nothing usable; `details` carries the upstream diagnostics
    #[error("{message}")]
    NotFound { message: String, details: String },

    /// Missing or invalid local configuration, raised before any network call
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SourceError {
    /// The reqwest error loses its own copy of the URL, which may hold credentials
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        SourceError::Transport {
            url: url.to_string(),
            kind: TransportKind::of(&source),
            source: source.without_url(),
        }
    }

    pub(crate) fn missing_env(var: &str) -> Self {
        SourceError::Configuration(format!("Missing environment variable {}", var))
    }

    /// Transport class, if this is a transport failure
    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            SourceError::Transport { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// HTTP status carried by a [`SourceError::HttpStatus`]
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic payload carried by a [`SourceError::NotFound`]
    pub fn details(&self) -> Option<&str> {
        match self {
            SourceError::NotFound { details, .. } => Some(details),
            _ => None,
        }
    }
}
