//! Mobile browser User-Agent strings for platform requests.
//!
//! The metadata pages are served to mobile browsers; desktop or tool-style
//! agents get a different page without the embedded state. One agent is
//! picked per request so that a batch does not share a single fingerprint.

use rand::seq::SliceRandom;

/// Mobile browser agents rotated across requests.
const MOBILE_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; SM-G991B) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/119.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 12; Pixel 6) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/118.0.0.0 Mobile Safari/537.36",
];

/// Returns a randomly chosen mobile browser User-Agent.
#[must_use]
pub(crate) fn random_mobile_user_agent() -> &'static str {
    MOBILE_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MOBILE_USER_AGENTS[0])
}
