//! Fixed-delay bounded retry for "surface not mounted yet".

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 50,
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Call `attempt` until it yields a value, at most `max_attempts` times,
/// with `sleep(delay)` between attempts. No backoff.
///
/// Final failure is logged and dropped.
pub fn retry_fixed<T>(
    policy: &RetryPolicy,
    mut attempt: impl FnMut() -> Option<T>,
    mut sleep: impl FnMut(Duration),
) -> Option<T> {
    for n in 1..=policy.max_attempts {
        if let Some(value) = attempt() {
            return Some(value);
        }
        trace!(attempt = n, "target not ready");
        if n < policy.max_attempts {
            sleep(policy.delay());
        }
    }
    warn!(
        attempts = policy.max_attempts,
        delay_ms = policy.delay_ms,
        "giving up waiting for editing surface"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeds_after_retries() {
        let policy = RetryPolicy {
            delay_ms: 5,
            max_attempts: 4,
        };
        let mut calls = 0;
        let mut slept = Vec::new();
        let out = retry_fixed(
            &policy,
            || {
                calls += 1;
                (calls == 3).then_some(calls)
            },
            |d| slept.push(d),
        );
        assert_eq!(out, Some(3));
        assert_eq!(slept, vec![Duration::from_millis(5); 2]);
    }

    #[test]
    fn test_gives_up() {
        let policy = RetryPolicy {
            delay_ms: 1,
            max_attempts: 3,
        };
        let mut calls = 0;
        let mut sleeps = 0;
        let out: Option<()> = retry_fixed(
            &policy,
            || {
                calls += 1;
                None
            },
            |_| sleeps += 1,
        );
        assert!(out.is_none());
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }
}
