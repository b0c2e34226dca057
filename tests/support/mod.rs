//! Helpers shared by integration tests.

#![allow(dead_code)]

pub mod socket_guard;

/// A metadata page for one video by `author_id`.
#[must_use]
pub fn metadata_page(author_id: &str, title: &str) -> String {
    format!(
        r#"<html><body><script>window.INIT_STATE = {{"tusjoh0.5": {{"photo": {{"userName": "author", "userId": "{author_id}", "caption": "{title}", "likeCount": "1.5万", "commentCount": 12, "timestamp": 1704067200000, "photoId": "x"}}, "counts": {{"fanCount": 7}}}}}}</script></body></html>"#
    )
}
