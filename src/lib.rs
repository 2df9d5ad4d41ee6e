//! # jrc-common
//!
//! Shared plumbing for scholarly-metadata batch programs: resilient HTTP fetching of
//! JSON and XML services, DOI to PMID resolution, configuration, database, mail and
//! logging glue.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`utils`]: HTTP fetcher, retry wrapper, XML conversion and small helpers
//! - [`sources`]: Upstream service wrappers and the shared [`SourceError`]
//! - [`config`]: Environment settings and the configuration service client
//! - [`db`]: MongoDB, MySQL and PostgreSQL connections from configuration
//! - [`email`]: SMTP notification emails
//! - [`token`]: JSON Web Token expiry checks
//! - [`logging`]: Console logging setup

pub mod config;
pub mod db;
pub mod email;
pub mod logging;
pub mod sources;
pub mod token;
pub mod utils;

// Re-export commonly used types
pub use config::{ConfigClient, Settings};
pub use sources::{NcbiSource, ResponseFormat, SourceError};
pub use utils::{FetchRequest, HttpClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
