use std::thread;
use std::time::Duration;

use super::FetchError;

/// Bounded retries with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retriable error, or the
    /// attempts run out. `op` receives the zero-based attempt number.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut(u32) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retriable() && attempt + 1 < self.max_attempts => {
                    attempt += 1;
                    log::warn!(
                        "{} failed: {}. Retry {}/{} in {}s",
                        what,
                        err,
                        attempt,
                        self.max_attempts - 1,
                        self.delay.as_secs()
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overloaded() -> FetchError {
        FetchError::Status {
            service: "Overpass",
            status: 504,
            body: String::new(),
        }
    }

    #[test]
    fn test_succeeds_after_retries() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;

        let result = policy.run("query", |attempt| {
            calls += 1;
            if attempt < 2 {
                Err(overloaded())
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;

        let result: Result<(), _> = policy.run("query", |_| {
            calls += 1;
            Err(overloaded())
        });

        assert!(matches!(result, Err(FetchError::Status { status: 504, .. })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_fatal_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;

        let result: Result<(), _> = policy.run("query", |_| {
            calls += 1;
            Err(FetchError::Status {
                service: "Overpass",
                status: 400,
                body: "syntax error".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.run("query", |_| Ok::<_, FetchError>(7)).unwrap(), 7);
    }
}
