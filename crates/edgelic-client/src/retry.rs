//! Fixed-schedule retry for licensing server calls.
//!
//! Unlike an exponential policy the delays are an explicit list: the call is
//! attempted once, then once more after each delay. Every attempt and every
//! delay races the cancellation signal; a cancelled fetch is never retried.

use std::future::Future;
use std::time::Duration;

use edgelic_core::CancelSignal;

use crate::error::FetchError;

/// Run `f` with retries after each of `delays`.
///
/// Returns the first success, [`FetchError::Cancelled`] as soon as the
/// signal fires, or the error of the final attempt.
pub(crate) async fn retry_with_delays<F, Fut, T>(
    delays: &[Duration],
    cancel: &CancelSignal,
    f: F,
) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_retries = delays.len();
    let mut attempt = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = f() => result,
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => e,
        };

        let Some(delay) = delays.get(attempt).copied() else {
            return Err(err);
        };
        attempt += 1;

        tracing::warn!(
            attempt,
            max_retries,
            error = &err as &dyn std::error::Error,
            "license request failed, retrying in {delay:?}"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
