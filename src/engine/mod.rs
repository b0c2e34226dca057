//! Fetch scheduler: bounded-concurrency batch runs over a list of links.
//!
//! # Concurrency Model
//!
//! - Each item runs as one pipeline in its own Tokio task (a [`JoinSet`])
//! - A semaphore permit is acquired before a pipeline is admitted and is
//!   released when the task ends (RAII)
//! - Items are admitted greedily in input order as permits free up
//! - Completions are consumed by the run loop, which feeds the event sink
//!   and then the aggregator
//!
//! # Cancellation
//!
//! Once the run's token fires no further item is admitted. Admitted
//! pipelines fail fast with `cancelled` at their next request or backoff
//! wait; items never admitted are recorded as cancelled. The result still
//! holds one record per input item.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vidmeta_core::{FetchScheduler, HttpClient, RunConfig, RunContext, TracingSink};
//! use vidmeta_core::fetch::Endpoints;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(Endpoints::default(), &[])?;
//! let scheduler = FetchScheduler::new(Arc::new(client));
//! let ctx = RunContext::new(RunConfig::default())?;
//! let links = vec!["https://www.kuaishou.com/short-video/3xt9wjdp3xb9gpm".to_string()];
//! let result = scheduler.run(links, &ctx, &TracingSink).await?;
//! println!("Succeeded: {}, Failed: {}", result.summary.succeeded, result.summary.failed);
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod error;
mod events;
mod pipeline;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, info, instrument, warn};

use crate::config::RunContext;
use crate::fetch::MetadataSource;
use crate::record::{InputItem, ProgressEvent, RunResult, VideoRecord};
use pipeline::{PipelineContext, process_item};

pub use aggregator::Aggregator;
pub use error::{EngineError, ItemError};
pub use events::{ChannelSink, EngineEvent, EventSink, NullSink, TracingSink};

/// Runs batches of links through the normalize, fetch and parse pipeline.
///
/// The scheduler holds only the metadata source; every run gets its
/// configuration and cancellation signal from a [`RunContext`], so
/// independent runs can share one scheduler.
#[derive(Clone)]
pub struct FetchScheduler {
    source: Arc<dyn MetadataSource>,
}

impl std::fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler").finish_non_exhaustive()
    }
}

impl FetchScheduler {
    /// Creates a scheduler that fetches through `source`.
    #[must_use]
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Processes every link and returns one record per link, in input order.
    ///
    /// Events are delivered to `sink` as items settle: for each item
    /// `on_item`, then `on_progress`, then the record is stored. `on_finished`
    /// receives the ordered result.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the context's configuration is out
    /// of range; this happens before any network access. Individual item
    /// failures never error the run; they become failed records.
    #[instrument(skip_all, fields(items = links.len(), concurrency = ctx.config().concurrency_limit))]
    pub async fn run(
        &self,
        links: Vec<String>,
        ctx: &RunContext,
        sink: &dyn EventSink,
    ) -> Result<RunResult, EngineError> {
        ctx.config().validate()?;

        let items = InputItem::from_links(links);
        let total = items.len();
        let config = ctx.config();
        let cancel = ctx.cancel_token();
        let semaphore = Arc::new(Semaphore::new(config.concurrency_limit));
        let aggregator = Aggregator::new(total);
        let pipeline_ctx = PipelineContext {
            source: Arc::clone(&self.source),
            policy: config.retry_policy(),
            timeout: config.request_timeout,
            cancel: cancel.clone(),
        };

        info!(total, "starting run");

        let mut tasks: JoinSet<VideoRecord> = JoinSet::new();
        let mut in_flight: HashMap<Id, usize> = HashMap::new();
        let mut pending = items.iter().peekable();
        let mut completed = 0usize;

        loop {
            let admitting = pending.peek().is_some() && !cancel.is_cancelled();
            if !admitting && tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    let record = match joined {
                        Ok((id, record)) => {
                            in_flight.remove(&id);
                            record
                        }
                        Err(join_error) => {
                            let Some(index) = in_flight.remove(&join_error.id()) else {
                                warn!(error = %join_error, "unknown pipeline task failed");
                                continue;
                            };
                            warn!(index, error = %join_error, "pipeline task failed");
                            internal_failure(&items[index])
                        }
                    };
                    completed += 1;
                    settle(record, completed, total, sink, &aggregator);
                }

                () = cancel.cancelled(), if admitting => {
                    info!(
                        settled = completed,
                        in_flight = tasks.len(),
                        "cancellation requested; admitting no further items"
                    );
                }

                permit = Arc::clone(&semaphore).acquire_owned(), if admitting => {
                    let permit = permit.map_err(|_| EngineError::SemaphoreClosed)?;
                    let Some(item) = pending.next() else {
                        continue;
                    };
                    debug!(index = item.index, "admitting item");

                    let item = item.clone();
                    let index = item.index;
                    let ctx = pipeline_ctx.clone();
                    let handle = tasks.spawn(async move {
                        // Permit is dropped when this block exits (RAII)
                        let _permit = permit;
                        process_item(item, ctx).await
                    });
                    in_flight.insert(handle.id(), index);
                }
            }
        }

        for item in pending {
            completed += 1;
            settle(VideoRecord::cancelled(item), completed, total, sink, &aggregator);
        }

        let result = aggregator.finish(&items);
        let summary = &result.summary;
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            retried = summary.retried,
            cancelled = summary.cancelled,
            "run complete"
        );
        sink.on_finished(&result);
        Ok(result)
    }
}

fn settle(
    record: VideoRecord,
    completed: usize,
    total: usize,
    sink: &dyn EventSink,
    aggregator: &Aggregator,
) {
    sink.on_item(&record);
    sink.on_progress(&ProgressEvent {
        completed,
        total,
        last_index: record.index,
        last_status: record.status,
    });
    aggregator.insert(record);
}

fn internal_failure(item: &InputItem) -> VideoRecord {
    let error = ItemError::Internal;
    VideoRecord::failed(item, None, error.kind(), error.to_string(), 0)
}
