//! Fixed-delay retry for calls to the release repository

use crate::core::error::{ReleaseError, ReleaseResult};
use backon::{BlockingRetryable, ConstantBuilder};
use std::cell::Cell;
use std::time::Duration;
use tracing::warn;

/// Attempts and the pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      attempts: 3,
      delay: Duration::from_secs(3),
    }
  }
}

impl RetryPolicy {
  /// No pause between attempts
  #[cfg(test)]
  pub fn immediate(attempts: u32) -> Self {
    Self {
      attempts,
      delay: Duration::ZERO,
    }
  }

  /// Constant backoff; `with_max_times` counts retries after the first call
  fn backoff(&self) -> ConstantBuilder {
    let retries = self.attempts.max(1) - 1;
    ConstantBuilder::default()
      .with_delay(self.delay)
      .with_max_times(retries as usize)
  }

  /// Run `op` until it succeeds or attempts run out; the last error wins
  pub fn run<T, F>(&self, what: &str, op: F) -> ReleaseResult<T>
  where
    F: FnMut() -> ReleaseResult<T>,
  {
    let attempts = self.attempts.max(1);
    let attempt = Cell::new(1);

    op.retry(self.backoff())
      .sleep(std::thread::sleep)
      .notify(|e: &ReleaseError, _| {
        warn!("{} failed (attempt {}/{}): {}", what, attempt.get(), attempts, e);
        attempt.set(attempt.get() + 1);
      })
      .call()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_succeeds_after_transient_failures() {
    let mut calls = 0;
    let result = RetryPolicy::immediate(3).run("lookup", || {
      calls += 1;
      if calls < 3 {
        Err(ReleaseError::message("timeout"))
      } else {
        Ok(calls)
      }
    });
    assert_eq!(result.unwrap(), 3);
  }

  #[test]
  fn test_gives_up_with_last_error() {
    let mut calls = 0;
    let result: ReleaseResult<()> = RetryPolicy::immediate(3).run("lookup", || {
      calls += 1;
      Err(ReleaseError::message(format!("failure {}", calls)))
    });
    assert_eq!(calls, 3);
    assert_eq!(result.unwrap_err().to_string(), "failure 3");
  }

  #[test]
  fn test_single_attempt_does_not_retry() {
    let mut calls = 0;
    let result: ReleaseResult<()> = RetryPolicy::immediate(1).run("lookup", || {
      calls += 1;
      Err(ReleaseError::message("down"))
    });
    assert!(result.is_err());
    assert_eq!(calls, 1);
  }

  #[test]
  fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.attempts, 3);
    assert_eq!(policy.delay, Duration::from_secs(3));
  }
}
