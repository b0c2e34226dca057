//! Link shape detection and video id extraction.
//!
//! Pure, network-free half of link normalization. Short links come back as
//! [`NormalizedLink::NeedsRedirect`]; the redirect itself is followed by
//! [`super::resolve_video_id`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::{LinkError, MAX_LINK_LENGTH};

/// Finds the first http(s) link in free text such as app share messages.
/// Stops at whitespace, quotes, brackets and full-width punctuation.
#[allow(clippy::expect_used)]
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]，。！？、）]+"#).expect("link regex is valid") // Static pattern, safe to panic
});

/// Hosts serving short share links that redirect to the real video page.
const SHORT_LINK_HOSTS: &[&str] = &["v.kuaishou.com"];

/// Hosts of the desktop site.
const DESKTOP_HOSTS: &[&str] = &["www.kuaishou.com", "kuaishou.com"];

/// Hosts of the mobile site.
const MOBILE_HOSTS: &[&str] = &["m.gifshow.com", "v.m.chenzhongtech.com", "m.kuaishou.com"];

/// Longest id we are willing to treat as a video id.
const MAX_ID_LENGTH: usize = 64;

/// Canonical desktop URL prefix for a video id.
const CANONICAL_VIDEO_PREFIX: &str = "https://www.kuaishou.com/short-video/";

/// Canonical video identifier extracted from a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validates a candidate id: non-empty, bounded, `[A-Za-z0-9_-]` only.
    #[must_use]
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        if candidate.is_empty() || candidate.len() > MAX_ID_LENGTH {
            return None;
        }
        candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            .then(|| Self(candidate.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the id is all digits (the numeric photo id form).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.0.chars().all(|c| c.is_ascii_digit())
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which family of link an input belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkShape {
    /// `v.kuaishou.com/<code>` or `www.kuaishou.com/f/<code>`.
    ShortRedirect,
    /// `www.kuaishou.com/short-video/<id>`.
    Desktop,
    /// `m.gifshow.com/fw/photo/<id>` and friends.
    Mobile,
}

/// Result of the network-free normalization step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedLink {
    /// The id was embedded in the link.
    Resolved {
        /// Shape the id was found in.
        shape: LinkShape,
        /// Extracted id.
        id: VideoId,
    },
    /// The link must be followed once to find the id.
    NeedsRedirect {
        /// Short link to follow.
        url: Url,
    },
}

/// Classifies a raw input and extracts the video id when it is embedded.
///
/// Share text is accepted: the first http(s) token is used.
///
/// # Errors
///
/// Returns [`LinkError::Unrecognized`] when the input holds no link of a
/// known shape. No network access happens here.
#[tracing::instrument(level = "trace", skip(raw), fields(raw_len = raw.len()))]
pub fn normalize(raw: &str) -> Result<NormalizedLink, LinkError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_LINK_LENGTH {
        return Err(LinkError::unrecognized(raw));
    }

    let Some(candidate) = LINK_PATTERN.find(trimmed).map(|m| clean_link_trailing(m.as_str()))
    else {
        debug!("no http(s) link in input");
        return Err(LinkError::unrecognized(raw));
    };
    trace!(link = %candidate, "found link candidate");

    let url = Url::parse(candidate).map_err(|_| LinkError::unrecognized(raw))?;
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    if SHORT_LINK_HOSTS.contains(&host.as_str()) {
        return if first_segment(&url).is_some() {
            Ok(NormalizedLink::NeedsRedirect { url })
        } else {
            Err(LinkError::unrecognized(raw))
        };
    }

    if DESKTOP_HOSTS.contains(&host.as_str()) {
        if segment_after(&url, "f").is_some() {
            return Ok(NormalizedLink::NeedsRedirect { url });
        }
        return segment_after(&url, "short-video")
            .map(|id| NormalizedLink::Resolved {
                shape: LinkShape::Desktop,
                id,
            })
            .ok_or_else(|| LinkError::unrecognized(raw));
    }

    if MOBILE_HOSTS.contains(&host.as_str()) {
        return segment_after(&url, "photo")
            .or_else(|| segment_after(&url, "long-video"))
            .or_else(|| query_value(&url, "photoId").and_then(|v| VideoId::parse(&v)))
            .map(|id| NormalizedLink::Resolved {
                shape: LinkShape::Mobile,
                id,
            })
            .ok_or_else(|| LinkError::unrecognized(raw));
    }

    debug!(host = %host, "link host is not a known video host");
    Err(LinkError::unrecognized(raw))
}

/// Extracts the video id from the final URL of a followed short link.
///
/// Priority: alphanumeric `photoId` query value, non-numeric `/photo/<id>`
/// segment, `/short-video/<id>` segment, numeric `photoId`, numeric
/// `shareObjectId`.
#[must_use]
pub fn id_from_redirect_target(target: &Url) -> Option<VideoId> {
    let photo_id = query_value(target, "photoId").and_then(|v| VideoId::parse(&v));

    if let Some(id) = &photo_id
        && !id.is_numeric()
        && id.as_str().len() > 5
    {
        return Some(id.clone());
    }

    if let Some(id) = segment_after(target, "photo")
        && !id.is_numeric()
    {
        return Some(id);
    }

    if let Some(id) = segment_after(target, "short-video") {
        return Some(id);
    }

    if let Some(id) = photo_id
        && id.is_numeric()
    {
        return Some(id);
    }

    query_value(target, "shareObjectId")
        .and_then(|v| VideoId::parse(&v))
        .filter(VideoId::is_numeric)
}

/// Returns the canonical desktop link for a video id.
#[must_use]
pub fn canonical_video_url(id: &VideoId) -> String {
    format!("{CANONICAL_VIDEO_PREFIX}{id}")
}

/// Strips sentence punctuation that regex capture drags along from share text.
fn clean_link_trailing(link: &str) -> &str {
    link.trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
}

fn first_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.find(|segment| !segment.is_empty())
}

fn segment_after(url: &Url, marker: &str) -> Option<VideoId> {
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == marker)?;
    segments.next().and_then(VideoId::parse)
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}
