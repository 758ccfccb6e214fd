//! Retry with exponential backoff for transient upstream failures

use std::time::Duration;

/// Errors that can classify themselves as transient.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Exponential backoff: 2^attempt seconds (2s, 4s, 8s, ...)
pub const fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt))
}

/// Retry a fallible operation with exponential backoff.
///
/// On retryable errors, logs the failure, sleeps, and retries up to
/// `max_retries`. Returns `Ok(T)` on first success, or the final `Err` on
/// exhaustion / non-retryable error.
pub fn retry_with_backoff<T, E>(
    label: &str,
    max_retries: u32,
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_retries && e.is_retryable() => {
                attempt += 1;
                log::debug!("{label}: attempt {attempt}/{max_retries} failed: {e}, retrying...");
                std::thread::sleep(backoff_duration(attempt));
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestErr(bool);

    impl Retryable for TestErr {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    impl std::fmt::Display for TestErr {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error")
        }
    }

    #[test]
    fn backoff_exponential() {
        assert_eq!(backoff_duration(1), Duration::from_secs(2));
        assert_eq!(backoff_duration(2), Duration::from_secs(4));
        assert_eq!(backoff_duration(3), Duration::from_secs(8));
    }

    #[test]
    fn succeeds_first_try() {
        let mut calls = 0;
        let result: Result<i32, TestErr> = retry_with_backoff("test", 3, || {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut calls = 0;
        let result: Result<i32, TestErr> = retry_with_backoff("test", 3, || {
            calls += 1;
            Err(TestErr(false))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retryable_exhausts_attempts() {
        // max_retries = 0 keeps the test free of backoff sleeps
        let mut calls = 0;
        let result: Result<i32, TestErr> = retry_with_backoff("test", 0, || {
            calls += 1;
            Err(TestErr(true))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
