//! Error types for metadata page parsing.

use thiserror::Error;

/// Reasons a metadata page could not be turned into video fields.
///
/// All variants surface to users as the same parse failure; the detail is
/// kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The response body was empty or whitespace.
    #[error("empty response body")]
    EmptyBody,

    /// The page carries no embedded state block.
    #[error("page has no INIT_STATE block")]
    MissingInitState,

    /// The embedded state block is not valid JSON.
    #[error("INIT_STATE is not valid JSON: {detail}")]
    InvalidJson {
        /// Decoder message.
        detail: String,
    },

    /// No top-level object holds both `photo` and `counts`.
    #[error("no video node in payload")]
    MissingVideo,

    /// The video node has no usable author id.
    #[error("video node has no author id")]
    MissingAuthorId,
}

impl PayloadError {
    /// Creates an `InvalidJson` error from a decoder error.
    #[must_use]
    pub fn invalid_json(error: &serde_json::Error) -> Self {
        Self::InvalidJson {
            detail: error.to_string(),
        }
    }
}
