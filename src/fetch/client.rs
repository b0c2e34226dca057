//! HTTP client for the platform's metadata pages and short-link redirects.
//!
//! The client is created once per run and shared by every pipeline, taking
//! advantage of connection pooling. It is stateless with respect to earlier
//! attempts; retry state lives in [`super::RetryPolicy`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, REFERER,
    USER_AGENT,
};
use reqwest::{Client, RequestBuilder, redirect};
use tracing::{debug, instrument, trace};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_METADATA_BASE, MAX_REDIRECTS};
use super::error::{ClientError, FetchError};
use super::{MetadataSource, constants};
use crate::link::VideoId;
use crate::user_agent;

/// Browser-style Accept header for page requests.
const PAGE_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8";

/// Accept-Language matching the platform's primary audience.
const PAGE_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Where the client sends its requests.
///
/// `metadata_base` receives the video id as its last path segment.
/// `redirect_base`, when set, replaces scheme/host/port of short links before
/// following them; tests use it to point short links at a local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    metadata_base: Url,
    redirect_base: Option<Url>,
}

impl Default for Endpoints {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            metadata_base: Url::parse(DEFAULT_METADATA_BASE)
                .expect("default metadata endpoint is valid"), // Static URL, safe to panic
            redirect_base: None,
        }
    }
}

impl Endpoints {
    /// Creates endpoints with a custom metadata base.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] if the base is not an absolute
    /// http(s) URL.
    pub fn new(metadata_base: &str) -> Result<Self, ClientError> {
        Ok(Self {
            metadata_base: parse_base(metadata_base)?,
            redirect_base: None,
        })
    }

    /// Rebases short links onto `base` before following them.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidEndpoint`] if the base is not an absolute
    /// http(s) URL.
    pub fn with_redirect_base(mut self, base: &str) -> Result<Self, ClientError> {
        self.redirect_base = Some(parse_base(base)?);
        Ok(self)
    }

    /// Returns the metadata page URL for a video id.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Connection`] if the URL cannot be assembled.
    pub fn metadata_url(&self, id: &VideoId) -> Result<Url, FetchError> {
        self.metadata_base
            .join(id.as_str())
            .map_err(|e| FetchError::connection(self.metadata_base.as_str(), e.to_string()))
    }

    /// Returns the URL actually requested when following `short_link`.
    #[must_use]
    pub fn redirect_request_url(&self, short_link: &Url) -> Url {
        let Some(base) = &self.redirect_base else {
            return short_link.clone();
        };
        let mut rebased = base.clone();
        rebased.set_path(short_link.path());
        rebased.set_query(short_link.query());
        rebased
    }
}

fn parse_base(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw).map_err(|e| ClientError::invalid_endpoint(raw, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ClientError::invalid_endpoint(
                raw,
                format!("scheme '{scheme}' is not supported"),
            ));
        }
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Splits a `Name: value` header line as given on the command line.
///
/// # Errors
///
/// Returns [`ClientError::InvalidHeader`] when the separator or name is missing.
pub fn parse_header_line(line: &str) -> Result<(String, String), ClientError> {
    let Some((name, value)) = line.split_once(':') else {
        return Err(ClientError::invalid_header(line, "expected 'Name: value'"));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::invalid_header(line, "header name is empty"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// HTTP client for metadata pages and short-link redirects.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use vidmeta_core::fetch::{Endpoints, HttpClient, MetadataSource};
/// use vidmeta_core::link::VideoId;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(Endpoints::default(), &[])?;
/// let id = VideoId::parse("3xyi7vy99zwwnnw").ok_or("bad id")?;
/// let page = client.fetch(&id, Duration::from_secs(15)).await?;
/// println!("{} bytes", page.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    endpoints: Endpoints,
    /// The caller supplied a User-Agent; the rotating one is not sent.
    custom_user_agent: bool,
}

impl HttpClient {
    /// Creates a client for `endpoints`, sending `extra_headers` on every request.
    ///
    /// Extra headers override the built-in browser headers of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if a header is invalid or reqwest rejects the
    /// builder configuration.
    #[instrument(level = "debug", skip(extra_headers), fields(extra_headers = extra_headers.len()))]
    pub fn new(endpoints: Endpoints, extra_headers: &[(String, String)]) -> Result<Self, ClientError> {
        let headers = build_default_headers(extra_headers)?;
        let custom_user_agent = headers.contains_key(USER_AGENT);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .default_headers(headers)
            .gzip(true)
            .build()?;

        debug!(metadata_base = %endpoints.metadata_base, custom_user_agent, "created HTTP client");
        Ok(Self {
            client,
            endpoints,
            custom_user_agent,
        })
    }

    /// Returns the configured endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    fn get(&self, url: Url, timeout: Duration) -> RequestBuilder {
        let request = self.client.get(url).timeout(timeout);
        if self.custom_user_agent {
            request
        } else {
            request.header(USER_AGENT, user_agent::random_mobile_user_agent())
        }
    }
}

fn build_default_headers(extra_headers: &[(String, String)]) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(PAGE_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(PAGE_ACCEPT_LANGUAGE));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(REFERER, HeaderValue::from_static(constants::REFERER));

    for (name, value) in extra_headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::invalid_header(name.as_str(), e.to_string()))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::invalid_header(name.as_str(), e.to_string()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[async_trait]
impl MetadataSource for HttpClient {
    #[instrument(skip(self), fields(url = %short_link))]
    async fn resolve_redirect(&self, short_link: &Url, timeout: Duration) -> Result<Url, FetchError> {
        let request_url = self.endpoints.redirect_request_url(short_link);
        let response = self
            .get(request_url.clone(), timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(request_url.as_str(), &e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            debug!(status = status.as_u16(), "short link request rejected");
            return Err(FetchError::http_status(request_url.as_str(), status.as_u16()));
        }

        let target = response.url().clone();
        trace!(status = status.as_u16(), target = %target, "short link followed");
        Ok(target)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn fetch(&self, id: &VideoId, timeout: Duration) -> Result<String, FetchError> {
        let url = self.endpoints.metadata_url(id)?;
        let response = self
            .get(url.clone(), timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "metadata request rejected");
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), &e))?;
        trace!(bytes = body.len(), "metadata page received");
        Ok(body)
    }
}
