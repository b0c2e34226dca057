//! Network half of link normalization: following short links.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::error::LinkError;
use super::normalize::{LinkShape, NormalizedLink, VideoId, id_from_redirect_target, normalize};
use crate::fetch::{MetadataSource, RetryPolicy, with_retry};

/// A raw link turned into a video id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// Extracted video id.
    pub id: VideoId,
    /// Link family the input belonged to.
    pub shape: LinkShape,
    /// Redirect attempts beyond the first.
    pub retries: u32,
}

/// Resolves a raw link into a video id, following a short link if needed.
///
/// Embedded ids return without network access. Short links are followed
/// through `source` under `policy`, one `timeout` per attempt.
///
/// # Errors
///
/// - [`LinkError::Unrecognized`] for inputs of no known shape
/// - [`LinkError::RedirectFailed`] when following the short link fails
///   after retries or is cancelled
/// - [`LinkError::MissingIdInTarget`] when the redirect lands on a page
///   without a video id
#[instrument(skip(raw, source, policy, cancel), fields(raw_len = raw.len()))]
pub async fn resolve_video_id(
    raw: &str,
    source: &dyn MetadataSource,
    policy: &RetryPolicy,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ResolvedLink, LinkError> {
    let url = match normalize(raw)? {
        NormalizedLink::Resolved { shape, id } => {
            return Ok(ResolvedLink {
                id,
                shape,
                retries: 0,
            });
        }
        NormalizedLink::NeedsRedirect { url } => url,
    };

    debug!(short_link = %url, "following short link");
    let attempted = with_retry(policy, cancel, || source.resolve_redirect(&url, timeout)).await;
    let (attempts, retries) = (attempted.attempts, attempted.retries());
    let target = attempted
        .outcome
        .map_err(|cause| LinkError::redirect_failed(url.as_str(), attempts, cause))?;

    let id = id_from_redirect_target(&target).ok_or_else(|| LinkError::missing_id(target.as_str()))?;
    debug!(target = %target, id = %id, "short link resolved");

    Ok(ResolvedLink {
        id,
        shape: LinkShape::ShortRedirect,
        retries,
    })
}
