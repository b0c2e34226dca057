//! Error types for the fetch module.
//!
//! [`FetchError`] is the classified failure of a single network attempt.
//! [`ClientError`] covers HTTP client construction, which is a setup problem
//! rather than an item failure.

use thiserror::Error;

/// Classified failure of one network attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within the request timeout.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Connection-level failure (DNS, refused, reset, TLS, body read).
    #[error("connection error requesting {url}: {detail}")]
    Connection {
        /// The URL that failed.
        url: String,
        /// Underlying error text.
        detail: String,
    },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The run was cancelled while this attempt was pending.
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a connection error.
    pub fn connection(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Maps a reqwest error onto the fetch taxonomy.
    pub fn from_reqwest(url: impl Into<String>, error: &reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            Self::Timeout { url }
        } else if let Some(status) = error.status() {
            Self::HttpStatus {
                url,
                status: status.as_u16(),
            }
        } else {
            Self::Connection {
                url,
                detail: error.to_string(),
            }
        }
    }

    /// Short, URL-free label for per-row failure reasons.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Timeout { .. } => "request timed out".to_string(),
            Self::Connection { .. } => "connection error".to_string(),
            Self::HttpStatus { status, .. } => format!("HTTP status {status}"),
            Self::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Errors building the HTTP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// reqwest refused the builder configuration.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),

    /// A caller-supplied header could not be used.
    #[error("invalid header '{header}': {reason}")]
    InvalidHeader {
        /// The header as supplied.
        header: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An endpoint base URL is not a usable absolute http(s) URL.
    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as supplied.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ClientError {
    /// Creates an `InvalidHeader` error.
    pub fn invalid_header(header: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            header: header.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidEndpoint` error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_includes_url() {
        let err = FetchError::http_status("https://m.gifshow.com/fw/photo/abc", 404);
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("m.gifshow.com"));
    }

    #[test]
    fn test_fetch_error_labels_are_short_and_stable() {
        assert_eq!(FetchError::timeout("u").label(), "request timed out");
        assert_eq!(
            FetchError::connection("u", "refused").label(),
            "connection error"
        );
        assert_eq!(FetchError::http_status("u", 503).label(), "HTTP status 503");
        assert_eq!(FetchError::Cancelled.label(), "cancelled");
    }

    #[test]
    fn test_client_error_messages() {
        let err = ClientError::invalid_header("Cookie", "missing ':'");
        assert!(err.to_string().contains("Cookie"));
        let err = ClientError::invalid_endpoint("ftp://x", "unsupported scheme");
        assert!(err.to_string().contains("unsupported scheme"));
    }
}
