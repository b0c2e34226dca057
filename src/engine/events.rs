//! Event sinks: where the scheduler reports per-item outcomes and progress.
//!
//! Sinks are called from the run loop, one settled item at a time, so
//! implementations should return quickly and must not block on I/O.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::record::{ProgressEvent, RunResult, VideoRecord};

/// Receiver of run events.
///
/// For every settled item the scheduler calls [`EventSink::on_item`] and
/// then [`EventSink::on_progress`], exactly once each, in settlement order.
/// [`EventSink::on_finished`] is called once with the ordered result.
pub trait EventSink: Send + Sync {
    /// An item settled with this record.
    fn on_item(&self, _record: &VideoRecord) {}

    /// Progress after an item settled.
    fn on_progress(&self, event: &ProgressEvent);

    /// The run is over.
    fn on_finished(&self, _result: &RunResult) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Logs item outcomes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_item(&self, record: &VideoRecord) {
        if record.is_success() {
            info!(
                index = record.index,
                video_id = %record.video_id,
                author = %record.author_name,
                "item resolved"
            );
        } else {
            debug!(
                index = record.index,
                reason = record.error_reason.as_deref().unwrap_or_default(),
                "item settled as failed"
            );
        }
    }

    fn on_progress(&self, _event: &ProgressEvent) {}

    fn on_finished(&self, result: &RunResult) {
        let summary = &result.summary;
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            retried = summary.retried,
            cancelled = summary.cancelled,
            "run finished"
        );
    }
}

/// Event forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An item settled.
    Item(VideoRecord),
    /// Progress after an item settled.
    Progress(ProgressEvent),
    /// The run finished.
    Finished(RunResult),
}

/// Forwards events to an unbounded channel, for consumers on other tasks.
///
/// A dropped receiver is ignored; the run continues without a listener.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_item(&self, record: &VideoRecord) {
        let _ = self.tx.send(EngineEvent::Item(record.clone()));
    }

    fn on_progress(&self, event: &ProgressEvent) {
        let _ = self.tx.send(EngineEvent::Progress(*event));
    }

    fn on_finished(&self, result: &RunResult) {
        let _ = self.tx.send(EngineEvent::Finished(result.clone()));
    }
}
