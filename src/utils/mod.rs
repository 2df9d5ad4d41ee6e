//! Utility modules supporting the upstream service wrappers.
//!
//! - [`HttpClient`]: shared reqwest client with the generic [`HttpClient::fetch`] helper
//! - [`FetchRequest`]: URL, headers, timeout, format and allowed-empty status codes of one GET
//! - [`RetryPolicy`] / [`with_retry`]: exponential backoff for timeout-class failures
//! - [`xml::to_value`]: generic XML to mapping conversion
//! - [`convert_diacritics`]: ASCII folding of accented names
//! - [`wall_timer`]: log the wall-clock time of an async operation
//!
//! # Fetch with Retry
//!
//! ```rust,no_run
//! use jrc_common::utils::{with_retry, FetchRequest, HttpClient, RetryPolicy};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let request = FetchRequest::new("https://api.crossref.org/works/10.1038/nature12373");
//! let work = with_retry(&RetryPolicy::default(), "crossref", || client.fetch(&request)).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;
mod text;
mod timer;
pub mod xml;

pub use http::{
    decode_body, empty_result, is_empty_result, redact_url, FetchRequest, HttpClient,
    DEFAULT_TIMEOUT,
};
pub use retry::{people_retry_policy, with_retry, RetryPolicy, Retryable};
pub use text::convert_diacritics;
pub use timer::{format_elapsed, wall_timer};
