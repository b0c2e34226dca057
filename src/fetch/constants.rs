//! Constants for the fetch module (endpoints, timeouts, redirects).

use std::time::Duration;

/// Metadata page endpoint; the video id is appended as the last path segment.
pub const DEFAULT_METADATA_BASE: &str = "https://m.gifshow.com/fw/photo/";

/// HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout for one attempt (15 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum redirect hops followed when resolving a short link.
pub const MAX_REDIRECTS: usize = 10;

/// Referer sent with metadata requests.
pub const REFERER: &str = "https://www.kuaishou.com/";
