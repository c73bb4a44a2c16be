//! Running work behind a limiter.
//!
//! These wrap an operation with an admission check: the operation runs only
//! if the key is admitted, and a denial becomes a
//! [`WindowgateError::RateLimited`] carrying the wait time in whole seconds.

use std::future::Future;
use tracing::warn;

use super::clock::Clock;
use super::limiter::RateLimiter;
use crate::error::{Result, WindowgateError};

/// Run `op` if `key` is admitted by `limiter`.
pub fn guard<C, T, F>(limiter: &RateLimiter<C>, key: &str, op: F) -> Result<T>
where
    C: Clock,
    F: FnOnce() -> T,
{
    admit(limiter, key)?;
    Ok(op())
}

/// Await the future produced by `op` if `key` is admitted by `limiter`.
///
/// `op` is not called on denial, so no work is started.
pub async fn guard_async<C, T, F, Fut>(limiter: &RateLimiter<C>, key: &str, op: F) -> Result<T>
where
    C: Clock,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    admit(limiter, key)?;
    Ok(op().await)
}

fn admit<C: Clock>(limiter: &RateLimiter<C>, key: &str) -> Result<()> {
    if limiter.check_limit(key) {
        return Ok(());
    }

    let retry_after_secs = limiter.retry_after_secs(key);
    warn!(
        key = %key,
        retry_after_secs = retry_after_secs,
        "Request rejected by rate limiter"
    );
    Err(WindowgateError::RateLimited {
        key: key.to_owned(),
        retry_after_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use crate::ratelimit::limiter::RateLimiterConfig;
    use std::cell::Cell;

    fn create_test_limiter() -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new(0);
        let limiter = RateLimiter::with_clock(RateLimiterConfig::new(2, 10_000), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_guard_runs_when_admitted() {
        let (limiter, _) = create_test_limiter();

        let value = guard(&limiter, "user1", || 7).unwrap();

        assert_eq!(value, 7);
        assert_eq!(limiter.get_remaining("user1"), 1);
    }

    #[test]
    fn test_guard_skips_op_when_denied() {
        let (limiter, clock) = create_test_limiter();
        let calls = Cell::new(0);

        for _ in 0..2 {
            guard(&limiter, "user1", || calls.set(calls.get() + 1)).unwrap();
        }

        clock.advance(2_500);
        let err = guard(&limiter, "user1", || calls.set(calls.get() + 1)).unwrap_err();

        assert_eq!(calls.get(), 2);
        match err {
            WindowgateError::RateLimited {
                key,
                retry_after_secs,
            } => {
                assert_eq!(key, "user1");
                assert_eq!(retry_after_secs, 8);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_guard_passes_through_op_result() {
        let (limiter, _) = create_test_limiter();

        let inner: std::result::Result<u8, &str> = guard(&limiter, "user1", || Err("boom")).unwrap();

        assert_eq!(inner, Err("boom"));
    }

    #[tokio::test]
    async fn test_guard_async_runs_when_admitted() {
        let (limiter, _) = create_test_limiter();

        let value = guard_async(&limiter, "user1", || async { "done" })
            .await
            .unwrap();

        assert_eq!(value, "done");
    }

    #[test]
    fn test_guard_async_denied_without_starting_work() {
        let (limiter, _) = create_test_limiter();
        let started = Cell::new(false);

        limiter.check_limit("user1");
        limiter.check_limit("user1");

        let result = tokio_test::block_on(guard_async(&limiter, "user1", || {
            started.set(true);
            async {}
        }));

        assert!(!started.get());
        assert_eq!(result.unwrap_err().retry_after_secs(), Some(10));
    }
}
