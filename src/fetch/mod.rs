//! Network access: metadata page fetches and short-link redirects.
//!
//! # Features
//!
//! - [`MetadataSource`] seam between the pipelines and the network
//! - [`HttpClient`], the reqwest-backed source used in production
//! - Failure classification and exponential backoff ([`RetryPolicy`])
//! - Cancellable retry driver ([`with_retry`])
//!
//! Every call takes a per-attempt timeout; nothing in this module holds
//! state between attempts.

mod client;
mod constants;
mod error;
mod retry;

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::link::VideoId;

pub use client::{Endpoints, HttpClient, parse_header_line};
pub use constants::{DEFAULT_METADATA_BASE, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ClientError, FetchError};
pub use retry::{
    Attempted, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, FailureType,
    RetryDecision, RetryPolicy, classify_error, with_retry,
};

/// Source of raw metadata pages.
///
/// One call is one network attempt; retries are layered on top by
/// [`with_retry`]. Implementations must be safe to call from many pipelines
/// at once.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Follows a short link and returns the final URL after redirects.
    async fn resolve_redirect(&self, short_link: &Url, timeout: Duration) -> Result<Url, FetchError>;

    /// Fetches the raw metadata page for a video id.
    ///
    /// Any 2xx response yields its body; every other outcome is a
    /// classified [`FetchError`].
    async fn fetch(&self, id: &VideoId, timeout: Duration) -> Result<String, FetchError>;
}
