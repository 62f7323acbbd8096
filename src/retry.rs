//! Retry policy shared by the Gemini and embedding HTTP clients.

use std::time::Duration;

use tracing::debug;

pub const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Equal jitter backoff: base/2 + rand(0, base/2).
pub fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

/// Sleeps before the next attempt. Returns false once attempts are exhausted.
pub async fn pause_before_retry(attempt: u32) -> bool {
    if attempt + 1 >= MAX_RETRIES {
        return false;
    }
    let delay_ms = jittered_backoff(attempt);
    debug!(
        attempt = attempt + 1,
        delay_ms, "retrying after transient error"
    );
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    true
}
