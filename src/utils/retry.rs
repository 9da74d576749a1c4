// Retry with exponential backoff

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run `operation` until it succeeds or `max_retries` retries have failed.
/// The delay doubles after every failure, starting at `base_delay` and capped at 32x.
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= max_retries {
                    return Err(error);
                }
                attempt += 1;

                let delay = base_delay * 2u32.pow((attempt - 1).min(5));
                warn!(attempt, max_retries, error = %error, delay_ms = delay.as_millis() as u64, "Retrying after failure");
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = with_retry(
            || {
                let calls = &calls;
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(format!("transient {n}"))
                    } else {
                        Ok(n)
                    }
                }
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retry(
            || {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                }
            },
            2,
            Duration::ZERO,
        )
        .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
