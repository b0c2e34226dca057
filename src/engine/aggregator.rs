//! Order-preserving collection of per-item records.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::record::{InputItem, RunResult, RunSummary, VideoRecord};

/// Collects records by input index as items settle in any order.
///
/// Each index accepts one record; later inserts for the same index are
/// ignored. Counters are atomic so they can be read while the run is going.
#[derive(Debug)]
pub struct Aggregator {
    slots: Mutex<Vec<Option<VideoRecord>>>,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicU64,
}

impl Aggregator {
    /// Creates an aggregator for `total` items.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; total]),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retried: AtomicU64::new(0),
        }
    }

    /// Stores `record` at its index. Returns false if the index is out of
    /// range or already filled.
    pub fn insert(&self, record: VideoRecord) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let index = record.index;
        let Some(slot) = slots.get_mut(index) else {
            warn!(index, "record index out of range; ignored");
            return false;
        };
        if slot.is_some() {
            warn!(index, "record already present for index; ignored");
            return false;
        }

        if record.is_success() {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        self.retried
            .fetch_add(u64::from(record.retries), Ordering::SeqCst);
        *slot = Some(record);
        true
    }

    /// Returns the number of successful records stored.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Returns the number of failed records stored.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of records stored.
    #[must_use]
    pub fn settled(&self) -> usize {
        self.succeeded() + self.failed()
    }

    /// Returns the extra attempts recorded so far.
    #[must_use]
    pub fn retried(&self) -> u64 {
        self.retried.load(Ordering::SeqCst)
    }

    /// Produces the ordered result. Slots never filled get a cancelled record
    /// for the matching input item.
    #[must_use]
    pub fn finish(self, items: &[InputItem]) -> RunResult {
        let slots = self
            .slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        let records: Vec<VideoRecord> = slots
            .into_iter()
            .zip(items)
            .map(|(slot, item)| {
                slot.unwrap_or_else(|| {
                    debug!(index = item.index, "no record for item; marking cancelled");
                    VideoRecord::cancelled(item)
                })
            })
            .collect();

        let summary = RunSummary::from_records(&records);
        RunResult { records, summary }
    }
}
