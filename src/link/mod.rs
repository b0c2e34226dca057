//! Link normalization: raw user input to canonical video ids.
//!
//! Accepted inputs:
//! - Desktop links: `https://www.kuaishou.com/short-video/<id>`
//! - Mobile links: `https://m.gifshow.com/fw/photo/<id>` and related hosts
//! - Short share links: `https://v.kuaishou.com/<code>`, followed once
//! - Free share text containing any of the above
//!
//! [`normalize`] is pure; [`resolve_video_id`] adds the redirect step.

mod error;
mod normalize;
mod resolve;

pub use error::{LinkError, MAX_LINK_LENGTH};
pub use normalize::{
    LinkShape, NormalizedLink, VideoId, canonical_video_url, id_from_redirect_target, normalize,
};
pub use resolve::{ResolvedLink, resolve_video_id};
