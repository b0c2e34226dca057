//! Metadata page parsing.
//!
//! Metadata pages embed the page state as JSON:
//!
//! ```text
//! <script>window.INIT_STATE = {"<key>": {"photo": {...}, "counts": {...}}, ...}</script>
//! ```
//!
//! The video node is the first top-level object, in document order, holding
//! both `photo` and `counts`. Optional fields fall back to zero or an empty string; a missing
//! video node or author id fails the whole page.

mod error;
mod numbers;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};

use crate::link::VideoId;

pub use error::PayloadError;
pub use numbers::{format_publish_time, parse_count, parse_count_text, parse_text};

/// Captures the JSON object assigned to `window.INIT_STATE`.
#[allow(clippy::expect_used)]
static INIT_STATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"window\.INIT_STATE\s*=\s*(\{[\s\S]*?\})\s*</script>")
        .expect("INIT_STATE regex is valid") // Static pattern, safe to panic
});

/// Shortest all-digit `photoId` accepted as the numeric photo id.
const MIN_NUMERIC_PHOTO_ID_LEN: usize = 15;

/// Typed fields extracted from one metadata page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoFields {
    /// `photo.userName`.
    pub author_name: String,
    /// `photo.userId`; never empty.
    pub author_id: String,
    /// `photo.caption`.
    pub title: String,
    /// `photo.likeCount`.
    pub like_count: u64,
    /// `photo.commentCount`.
    pub comment_count: u64,
    /// `photo.shareCount`.
    pub share_count: u64,
    /// `photo.viewCount`.
    pub view_count: u64,
    /// `photo.timestamp` as `YYYY-MM-DD HH:MM:SS` (UTC+08:00), or empty.
    pub publish_time: String,
    /// `counts.collectionCount`.
    pub collection_count: u64,
    /// `counts.fanCount`.
    pub fan_count: u64,
    /// `counts.photoCount`, the author's published works.
    pub photo_count: u64,
    /// `photo.duration` in milliseconds.
    pub duration_ms: u64,
    /// `photo.width` in pixels.
    pub width: u64,
    /// `photo.height` in pixels.
    pub height: u64,
    /// All-digit photo id, or empty when the page carries none.
    pub numeric_photo_id: String,
}

/// Parses a metadata page body into [`VideoFields`].
///
/// # Errors
///
/// Returns [`PayloadError`] when the body is empty, carries no parsable
/// state block, has no video node, or the video node has no author id.
#[instrument(level = "debug", skip(body), fields(id = %id, bytes = body.len()))]
pub fn parse(body: &str, id: &VideoId) -> Result<VideoFields, PayloadError> {
    if body.trim().is_empty() {
        return Err(PayloadError::EmptyBody);
    }

    let state = extract_init_state(body)?;
    let Some(root) = state.as_object() else {
        return Err(PayloadError::MissingVideo);
    };
    let video = find_video_node(root).ok_or(PayloadError::MissingVideo)?;

    let photo = video.get("photo").and_then(Value::as_object);
    let counts = video.get("counts").and_then(Value::as_object);
    let photo_field = |key: &str| photo.and_then(|p| p.get(key));
    let counts_field = |key: &str| counts.and_then(|c| c.get(key));

    let author_id = parse_text(photo_field("userId"));
    if author_id.is_empty() {
        debug!("video node has no author id");
        return Err(PayloadError::MissingAuthorId);
    }

    let numeric_photo_id = find_numeric_photo_id(&state)
        .or_else(|| {
            let own = parse_text(photo_field("photoId"));
            is_all_digits(&own).then_some(own)
        })
        .or_else(|| id.is_numeric().then(|| id.as_str().to_string()))
        .unwrap_or_default();

    let fields = VideoFields {
        author_name: parse_text(photo_field("userName")),
        author_id,
        title: parse_text(photo_field("caption")),
        like_count: parse_count(photo_field("likeCount")),
        comment_count: parse_count(photo_field("commentCount")),
        share_count: parse_count(photo_field("shareCount")),
        view_count: parse_count(photo_field("viewCount")),
        publish_time: format_publish_time(photo_field("timestamp")),
        collection_count: parse_count(counts_field("collectionCount")),
        fan_count: parse_count(counts_field("fanCount")),
        photo_count: parse_count(counts_field("photoCount")),
        duration_ms: parse_count(photo_field("duration")),
        width: parse_count(photo_field("width")),
        height: parse_count(photo_field("height")),
        numeric_photo_id,
    };
    trace!(?fields, "parsed metadata page");
    Ok(fields)
}

fn extract_init_state(body: &str) -> Result<Value, PayloadError> {
    let json = INIT_STATE_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .ok_or(PayloadError::MissingInitState)?;
    serde_json::from_str(json.as_str()).map_err(|e| PayloadError::invalid_json(&e))
}

/// First top-level object, in document order, that has both `photo` and
/// `counts` keys.
fn find_video_node(root: &Map<String, Value>) -> Option<&Map<String, Value>> {
    root.values()
        .filter_map(Value::as_object)
        .find(|node| node.contains_key("photo") && node.contains_key("counts"))
}

/// Depth-first search, in document order, for the first all-digit `photoId`
/// anywhere in the state.
fn find_numeric_photo_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            if key == "photoId" {
                let candidate = parse_text(Some(child));
                if candidate.len() >= MIN_NUMERIC_PHOTO_ID_LEN && is_all_digits(&candidate) {
                    return Some(candidate);
                }
                None
            } else {
                find_numeric_photo_id(child)
            }
        }),
        Value::Array(items) => items.iter().find_map(find_numeric_photo_id),
        _ => None,
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
