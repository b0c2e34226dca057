//! Error types for link normalization and redirect resolution.

use thiserror::Error;

use crate::fetch::FetchError;

/// Maximum raw link length to accept.
/// Longer inputs are rejected without touching the network.
pub const MAX_LINK_LENGTH: usize = 2000;

/// Errors that can occur while turning a raw link into a video identifier.
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    /// The input does not match any known link shape.
    #[error("unrecognized format")]
    Unrecognized {
        /// Truncated input for logging.
        input_preview: String,
    },

    /// Following the short link failed at the network level.
    #[error("redirect failed ({})", .cause.label())]
    RedirectFailed {
        /// The short link that was being followed.
        url: String,
        /// Network attempts made before giving up.
        attempts: u32,
        /// The terminal network failure after retries.
        #[source]
        cause: FetchError,
    },

    /// The redirect landed on a page whose URL carries no video id.
    #[error("redirect target has no video id")]
    MissingIdInTarget {
        /// Final URL after redirects.
        target: String,
    },
}

impl LinkError {
    /// Creates an `Unrecognized` error, keeping only a short preview of the input.
    #[must_use]
    pub fn unrecognized(input: &str) -> Self {
        Self::Unrecognized {
            input_preview: input.chars().take(50).collect(),
        }
    }

    /// Creates a `RedirectFailed` error carrying the network cause.
    #[must_use]
    pub fn redirect_failed(url: impl Into<String>, attempts: u32, cause: FetchError) -> Self {
        Self::RedirectFailed {
            url: url.into(),
            attempts,
            cause,
        }
    }

    /// Creates a `MissingIdInTarget` error.
    #[must_use]
    pub fn missing_id(target: impl Into<String>) -> Self {
        Self::MissingIdInTarget {
            target: target.into(),
        }
    }

    /// Returns true when the redirect was abandoned because the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::RedirectFailed {
                cause: FetchError::Cancelled,
                ..
            }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_message_is_stable() {
        let err = LinkError::unrecognized("not-a-link");
        assert_eq!(err.to_string(), "unrecognized format");
    }

    #[test]
    fn test_unrecognized_truncates_preview() {
        let long = "x".repeat(500);
        let LinkError::Unrecognized { input_preview } = LinkError::unrecognized(&long) else {
            panic!("expected Unrecognized");
        };
        assert_eq!(input_preview.len(), 50);
    }

    #[test]
    fn test_redirect_failed_mentions_cause_kind() {
        let err = LinkError::redirect_failed(
            "https://v.kuaishou.com/abc",
            3,
            FetchError::timeout("https://v.kuaishou.com/abc"),
        );
        let msg = err.to_string();
        assert!(msg.contains("redirect failed"), "got: {msg}");
        assert!(msg.contains("timed out"), "got: {msg}");
        assert!(!msg.contains("https://"), "reason should stay short: {msg}");
    }

    #[test]
    fn test_redirect_failed_source_is_attached() {
        use std::error::Error as _;

        let err = LinkError::redirect_failed("u", 1, FetchError::connection("u", "refused"));
        let source = err.source().unwrap();
        assert!(source.to_string().contains("refused"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(LinkError::redirect_failed("u", 1, FetchError::Cancelled).is_cancelled());
        assert!(!LinkError::redirect_failed("u", 1, FetchError::timeout("u")).is_cancelled());
        assert!(!LinkError::unrecognized("x").is_cancelled());
    }
}
