//! Run input and output types: input items, video records, progress events
//! and the final run result.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::link::{VideoId, canonical_video_url};
use crate::payload::VideoFields;

/// One raw link and its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputItem {
    /// Position in the input; fixes the record's position in the output.
    pub index: usize,
    /// The link exactly as supplied.
    pub raw_link: String,
}

impl InputItem {
    /// Numbers raw links by their position.
    #[must_use]
    pub fn from_links(links: Vec<String>) -> Vec<Self> {
        links
            .into_iter()
            .enumerate()
            .map(|(index, raw_link)| Self { index, raw_link })
            .collect()
    }
}

/// Final status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Metadata was fetched and parsed.
    Success,
    /// The item failed; `error_reason` says why.
    Failed,
}

impl RecordStatus {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure categories counted in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureKind {
    /// Unrecognized link or failed redirect.
    InvalidLink,
    /// Request timed out after retries.
    Timeout,
    /// Connection-level failure after retries.
    ConnectionError,
    /// Non-2xx response.
    HttpStatus(u16),
    /// Page could not be parsed.
    ParseFailure,
    /// The run was cancelled before the item settled.
    Cancelled,
    /// The pipeline task itself failed.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLink => write!(f, "invalid_link"),
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionError => write!(f, "connection_error"),
            Self::HttpStatus(code) => write!(f, "http_{code}"),
            Self::ParseFailure => write!(f, "parse_failure"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Metadata for one input item; exactly one per item, success or not.
///
/// `status == Failed` if and only if `error_reason` is `Some` and non-empty.
/// Build records through [`VideoRecord::success`] and [`VideoRecord::failed`]
/// to keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoRecord {
    /// Input position.
    pub index: usize,
    /// The raw link as supplied.
    pub source_link: String,
    /// Resolved video id; empty when resolution failed.
    pub video_id: String,
    /// Canonical desktop link; empty when resolution failed.
    pub canonical_url: String,
    /// Author display name.
    pub author_name: String,
    /// Author id.
    pub author_id: String,
    /// Video caption.
    pub title: String,
    /// Likes.
    pub like_count: u64,
    /// Comments.
    pub comment_count: u64,
    /// Shares.
    pub share_count: u64,
    /// Views.
    pub view_count: u64,
    /// Publish time, `YYYY-MM-DD HH:MM:SS` UTC+08:00.
    pub publish_time: String,
    /// Collections (saves).
    pub collection_count: u64,
    /// Author followers.
    pub fan_count: u64,
    /// Author's published works.
    pub photo_count: u64,
    /// Duration in milliseconds.
    pub duration_ms: u64,
    /// Frame width in pixels.
    pub width: u64,
    /// Frame height in pixels.
    pub height: u64,
    /// All-digit photo id when known.
    pub numeric_photo_id: String,
    /// Outcome.
    pub status: RecordStatus,
    /// Short human-readable failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Failure category, for summaries.
    #[serde(skip)]
    pub failure_kind: Option<FailureKind>,
    /// Extra network attempts spent on this item.
    #[serde(skip)]
    pub retries: u32,
}

impl VideoRecord {
    fn blank(item: &InputItem, id: Option<&VideoId>) -> Self {
        Self {
            index: item.index,
            source_link: item.raw_link.clone(),
            video_id: id.map(ToString::to_string).unwrap_or_default(),
            canonical_url: id.map(canonical_video_url).unwrap_or_default(),
            author_name: String::new(),
            author_id: String::new(),
            title: String::new(),
            like_count: 0,
            comment_count: 0,
            share_count: 0,
            view_count: 0,
            publish_time: String::new(),
            collection_count: 0,
            fan_count: 0,
            photo_count: 0,
            duration_ms: 0,
            width: 0,
            height: 0,
            numeric_photo_id: String::new(),
            status: RecordStatus::Failed,
            error_reason: None,
            failure_kind: None,
            retries: 0,
        }
    }

    /// Builds a successful record from parsed fields.
    #[must_use]
    pub fn success(item: &InputItem, id: &VideoId, fields: VideoFields, retries: u32) -> Self {
        Self {
            author_name: fields.author_name,
            author_id: fields.author_id,
            title: fields.title,
            like_count: fields.like_count,
            comment_count: fields.comment_count,
            share_count: fields.share_count,
            view_count: fields.view_count,
            publish_time: fields.publish_time,
            collection_count: fields.collection_count,
            fan_count: fields.fan_count,
            photo_count: fields.photo_count,
            duration_ms: fields.duration_ms,
            width: fields.width,
            height: fields.height,
            numeric_photo_id: fields.numeric_photo_id,
            status: RecordStatus::Success,
            retries,
            ..Self::blank(item, Some(id))
        }
    }

    /// Builds a failed record. An empty `reason` is replaced by the kind name.
    #[must_use]
    pub fn failed(
        item: &InputItem,
        id: Option<&VideoId>,
        kind: FailureKind,
        reason: impl Into<String>,
        retries: u32,
    ) -> Self {
        let mut reason = reason.into();
        if reason.trim().is_empty() {
            reason = kind.to_string();
        }
        Self {
            status: RecordStatus::Failed,
            error_reason: Some(reason),
            failure_kind: Some(kind),
            retries,
            ..Self::blank(item, id)
        }
    }

    /// Builds the record of an item that never settled before cancellation.
    #[must_use]
    pub fn cancelled(item: &InputItem) -> Self {
        Self::failed(item, None, FailureKind::Cancelled, "cancelled", 0)
    }

    /// Returns true for successful records.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }
}

/// Emitted once per settled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Items settled so far, including this one.
    pub completed: usize,
    /// Items in the run.
    pub total: usize,
    /// Input position of the item that just settled.
    pub last_index: usize,
    /// Status of the item that just settled.
    pub last_status: RecordStatus,
}

/// Aggregate counts over a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items in the run.
    pub total: usize,
    /// Successful records.
    pub succeeded: usize,
    /// Failed records, cancelled ones included.
    pub failed: usize,
    /// Extra network attempts across all items.
    pub retried: u64,
    /// Failed records per failure kind.
    pub by_failure_kind: BTreeMap<FailureKind, usize>,
    /// At least one record settled as cancelled.
    pub cancelled: bool,
}

impl RunSummary {
    /// Computes the summary of `records`.
    #[must_use]
    pub fn from_records(records: &[VideoRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            summary.retried += u64::from(record.retries);
            if record.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                let kind = record.failure_kind.unwrap_or(FailureKind::Internal);
                summary.cancelled |= kind == FailureKind::Cancelled;
                *summary.by_failure_kind.entry(kind).or_insert(0) += 1;
            }
        }
        summary
    }
}

/// Ordered records plus their summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// One record per input item, in input order.
    pub records: Vec<VideoRecord>,
    /// Aggregate counts.
    pub summary: RunSummary,
}
