//! Response helpers shared by the HTTP clients.

use core::time::Duration;
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Parses a `Retry-After` header given in delta-seconds. HTTP dates are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Joins `base` and `path` with exactly one slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
