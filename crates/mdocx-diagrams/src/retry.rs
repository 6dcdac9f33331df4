//! Retry with exponential backoff
//!
//! [`RetryPolicy`] wraps any fallible operation. [`RetryingBackend`]
//! applies a policy to every job of another backend.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{RenderBackend, RenderJob};
use crate::error::{DiagramError, Result};

/// Maximum number of attempts and the delay before the first retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt, doubled for each further attempt
    #[serde(with = "millis")]
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }

    /// Run `op` until it succeeds, `retryable` rejects the error, or
    /// attempts run out. `op` receives the 1-based attempt number.
    pub fn run<T, E>(
        &self,
        mut op: impl FnMut(u32) -> std::result::Result<T, E>,
        retryable: impl Fn(&E) -> bool,
    ) -> std::result::Result<T, E> {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max && retryable(&e) => {
                    let delay = self.delay_after(attempt);
                    log::debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Backend decorator that retries transient failures
pub struct RetryingBackend<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: RenderBackend> RetryingBackend<B> {
    /// Wrap `inner` with `policy`
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<B: RenderBackend> RenderBackend for RetryingBackend<B> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn start(&mut self) -> Result<()> {
        let inner = &mut self.inner;
        self.policy.run(|_| inner.start(), DiagramError::is_transient)
    }

    fn render_svg(&mut self, job: &RenderJob<'_>) -> Result<String> {
        let inner = &mut self.inner;
        self.policy
            .run(|_| inner.render_svg(job), DiagramError::is_transient)
    }

    fn shutdown(&mut self) {
        self.inner.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[test]
    fn test_run_retries_until_success() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let result: std::result::Result<u32, &str> = policy.run(
            |attempt| {
                calls += 1;
                if attempt < 3 {
                    Err("flaky")
                } else {
                    Ok(attempt)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_run_stops_on_permanent_error() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let mut calls = 0;
        let result: std::result::Result<(), &str> = policy.run(
            |_| {
                calls += 1;
                Err("fatal")
            },
            |e| *e != "fatal",
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_run_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let mut calls = 0;
        let _: std::result::Result<(), &str> = policy.run(
            |_| {
                calls += 1;
                Err("again")
            },
            |_| true,
        );
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
