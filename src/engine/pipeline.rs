//! One item's pipeline: normalize, fetch with retry, parse.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::error::ItemError;
use crate::fetch::{MetadataSource, RetryPolicy, with_retry};
use crate::link::{LinkError, VideoId, resolve_video_id};
use crate::payload;
use crate::record::{InputItem, VideoRecord};

/// Shared, cheaply cloned inputs of every pipeline in a run.
#[derive(Clone)]
pub(crate) struct PipelineContext {
    pub(crate) source: Arc<dyn MetadataSource>,
    pub(crate) policy: RetryPolicy,
    pub(crate) timeout: Duration,
    pub(crate) cancel: CancellationToken,
}

/// Runs one item to a record. Never fails: every error becomes a failed
/// record carrying its reason.
#[instrument(skip(item, ctx), fields(index = item.index))]
pub(crate) async fn process_item(item: InputItem, ctx: PipelineContext) -> VideoRecord {
    let resolved = match resolve_video_id(
        &item.raw_link,
        ctx.source.as_ref(),
        &ctx.policy,
        ctx.timeout,
        &ctx.cancel,
    )
    .await
    {
        Ok(resolved) => resolved,
        Err(error) => {
            let retries = match &error {
                LinkError::RedirectFailed { attempts, .. } => attempts.saturating_sub(1),
                _ => 0,
            };
            return failed(&item, None, error.into(), retries);
        }
    };

    let id = resolved.id;
    debug!(id = %id, shape = ?resolved.shape, "link resolved");

    let attempted = with_retry(&ctx.policy, &ctx.cancel, || {
        ctx.source.fetch(&id, ctx.timeout)
    })
    .await;
    let retries = resolved.retries + attempted.retries();

    let body = match attempted.outcome {
        Ok(body) => body,
        Err(error) => return failed(&item, Some(&id), error.into(), retries),
    };

    match payload::parse(&body, &id) {
        Ok(fields) => VideoRecord::success(&item, &id, fields, retries),
        Err(error) => {
            debug!(error = %error, "metadata page rejected");
            failed(&item, Some(&id), error.into(), retries)
        }
    }
}

fn failed(
    item: &InputItem,
    id: Option<&VideoId>,
    error: ItemError,
    retries: u32,
) -> VideoRecord {
    if !matches!(error, ItemError::Cancelled) {
        warn!(
            index = item.index,
            link = %item.raw_link,
            error = %error,
            "item failed"
        );
    }
    VideoRecord::failed(item, id, error.kind(), error.to_string(), retries)
}
