//! Backoff for SOAP commands that hit a speaker mid-transition.

use std::future::Future;
use std::time::Duration;

use super::soap::SoapResult;

/// Pause before each retry of a transient failure.
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Runs `operation`, retrying transient SOAP failures with backoff.
///
/// Non-transient errors are returned immediately. After the last retry the
/// final transient error is returned.
pub(crate) async fn with_retry<T, F, Fut>(action: &str, mut operation: F) -> SoapResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SoapResult<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < RETRY_DELAYS_MS.len() => {
                let delay_ms = RETRY_DELAYS_MS[attempt];
                attempt += 1;
                log::warn!(
                    "[Sonos] {} transient error: {}; retry {}/{} in {}ms",
                    action,
                    e,
                    attempt,
                    RETRY_DELAYS_MS.len(),
                    delay_ms
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
