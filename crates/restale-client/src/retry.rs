//! Retry policies for failed requests
//!
//! A policy is a pure decision function: given the request method, the
//! outcome (status or error) and the attempt count, it answers whether to
//! retry and after what delay. The continuation does the actual waiting
//! and resending.

use crate::error::{Error, Result};
use reqwest::Method;
use std::time::Duration;

/// Default jitter factor for the exponential policy (0.0 to 1.0)
const DEFAULT_JITTER_FACTOR: f64 = 0.1;

/// The answer a retry policy gives for one outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryDecision {
    /// Whether to retry at all
    pub retry: bool,
    /// How long to wait before the next attempt
    pub delay: Duration,
}

impl RetryDecision {
    fn no() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
enum RetryKind {
    Never,
    Fixed {
        max_retries: u32,
        delay: Duration,
    },
    Exponential {
        min_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter_factor: f64,
    },
}

/// Polymorphic retry policy
///
/// Only methods in the configured allow-set are eligible (default:
/// idempotent/safe methods), and only when the outcome is an error or a
/// response with status >= 500.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    kind: RetryKind,
    allowed_methods: Vec<Method>,
}

impl RetryPolicy {
    /// Never retry anything
    pub fn never() -> Self {
        Self {
            kind: RetryKind::Never,
            allowed_methods: Self::default_methods(),
        }
    }

    /// Retry up to `max_retries` times with a constant delay
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            kind: RetryKind::Fixed { max_retries, delay },
            allowed_methods: Self::default_methods(),
        }
    }

    /// Exponential backoff with jitter
    ///
    /// The interval for attempt `n` is `min_delay * multiplier^n`; the
    /// actual delay is drawn uniformly from
    /// `[(1 - jitter) * interval, (1 + jitter) * interval]` and the retry
    /// is taken only while the delay does not exceed `max_delay`.
    ///
    /// Fails validation unless `0 < min_delay < max_delay`. The jitter
    /// factor is clamped to `[0.0, 1.0]`.
    pub fn exponential(
        min_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter_factor: f64,
    ) -> Result<Self> {
        if min_delay.is_zero() || min_delay >= max_delay {
            return Err(Error::InvalidConfiguration(format!(
                "exponential backoff requires 0 < min_delay < max_delay, got {min_delay:?} and {max_delay:?}"
            )));
        }

        Ok(Self {
            kind: RetryKind::Exponential {
                min_delay,
                max_delay,
                multiplier,
                jitter_factor: jitter_factor.clamp(0.0, 1.0),
            },
            allowed_methods: Self::default_methods(),
        })
    }

    /// Exponential backoff with the default jitter factor
    pub fn exponential_default_jitter(
        min_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    ) -> Result<Self> {
        Self::exponential(min_delay, max_delay, multiplier, DEFAULT_JITTER_FACTOR)
    }

    /// Replace the method allow-set
    pub fn with_allowed_methods(mut self, methods: Vec<Method>) -> Self {
        self.allowed_methods = methods;
        self
    }

    /// Idempotent and safe methods retried by default
    fn default_methods() -> Vec<Method> {
        vec![
            Method::GET,
            Method::HEAD,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ]
    }

    /// Whether this outcome is even eligible for a retry
    fn is_eligible(&self, method: &Method, status: Option<u16>, is_error: bool) -> bool {
        if !self.allowed_methods.contains(method) {
            return false;
        }
        is_error || status.is_some_and(|code| code >= 500)
    }

    /// Decide whether to retry after the given outcome
    ///
    /// `status` carries the response status when one was received;
    /// `is_error` is true when the outcome was an exception instead.
    /// `attempt` counts the attempts already made, starting at 0.
    pub fn decide(
        &self,
        method: &Method,
        status: Option<u16>,
        is_error: bool,
        attempt: u32,
    ) -> RetryDecision {
        if !self.is_eligible(method, status, is_error) {
            return RetryDecision::no();
        }

        match &self.kind {
            RetryKind::Never => RetryDecision::no(),
            RetryKind::Fixed { max_retries, delay } => {
                if attempt < *max_retries {
                    RetryDecision {
                        retry: true,
                        delay: *delay,
                    }
                } else {
                    RetryDecision::no()
                }
            }
            RetryKind::Exponential {
                min_delay,
                max_delay,
                multiplier,
                jitter_factor,
            } => {
                let interval = min_delay.as_millis() as f64 * multiplier.powi(attempt as i32);
                let low = (1.0 - jitter_factor) * interval;
                let high = (1.0 + jitter_factor) * interval;
                let delay_ms = low + rand::random::<f64>() * (high - low);
                let delay = Duration::from_millis(delay_ms.max(0.0) as u64);

                if delay <= *max_delay {
                    RetryDecision { retry: true, delay }
                } else {
                    RetryDecision::no()
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn exponential_no_jitter() -> RetryPolicy {
        RetryPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(2000),
            2.0,
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn test_never_policy() {
        let policy = RetryPolicy::never();
        let decision = policy.decide(&Method::GET, Some(500), false, 0);
        assert!(!decision.retry);
    }

    #[test]
    fn test_fixed_policy_counts_attempts() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(50));

        let first = policy.decide(&Method::GET, Some(503), false, 0);
        assert!(first.retry);
        assert_eq!(first.delay, Duration::from_millis(50));

        assert!(policy.decide(&Method::GET, Some(503), false, 1).retry);
        assert!(!policy.decide(&Method::GET, Some(503), false, 2).retry);
    }

    #[test]
    fn test_exponential_deterministic_without_jitter() {
        let policy = exponential_no_jitter();

        let attempt0 = policy.decide(&Method::GET, None, true, 0);
        assert!(attempt0.retry);
        assert_eq!(attempt0.delay, Duration::from_millis(100));

        let attempt1 = policy.decide(&Method::GET, None, true, 1);
        assert_eq!(attempt1.delay, Duration::from_millis(200));

        let attempt2 = policy.decide(&Method::GET, None, true, 2);
        assert_eq!(attempt2.delay, Duration::from_millis(400));
    }

    #[test]
    fn test_exponential_rejected_beyond_max_delay() {
        let policy = exponential_no_jitter();
        // Attempt 5: interval 3200ms exceeds the 2000ms cap
        let decision = policy.decide(&Method::GET, None, true, 5);
        assert!(!decision.retry);
    }

    #[test]
    fn test_exponential_jitter_stays_in_bounds() {
        let policy = RetryPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(10_000),
            2.0,
            0.5,
        )
        .unwrap();

        for _ in 0..100 {
            let decision = policy.decide(&Method::GET, Some(500), false, 1);
            assert!(decision.retry);
            // interval 200ms, factor 0.5: delay in [100, 300]
            assert!(decision.delay >= Duration::from_millis(100));
            assert!(decision.delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn test_exponential_validation() {
        assert!(
            RetryPolicy::exponential(Duration::ZERO, Duration::from_millis(100), 2.0, 0.0)
                .is_err()
        );
        assert!(RetryPolicy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(100),
            2.0,
            0.0
        )
        .is_err());
        assert!(RetryPolicy::exponential(
            Duration::from_millis(200),
            Duration::from_millis(100),
            2.0,
            0.0
        )
        .is_err());
    }

    #[test]
    fn test_method_eligibility() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

        // POST is not idempotent: never retried by default
        assert!(!policy.decide(&Method::POST, Some(500), false, 0).retry);
        assert!(policy.decide(&Method::DELETE, Some(500), false, 0).retry);

        let post_allowed = policy.with_allowed_methods(vec![Method::POST]);
        assert!(post_allowed.decide(&Method::POST, Some(500), false, 0).retry);
        assert!(!post_allowed.decide(&Method::GET, Some(500), false, 0).retry);
    }

    #[test]
    fn test_outcome_eligibility() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

        // 4xx and 2xx responses are not retried
        assert!(!policy.decide(&Method::GET, Some(404), false, 0).retry);
        assert!(!policy.decide(&Method::GET, Some(200), false, 0).retry);
        // 5xx and exceptions are
        assert!(policy.decide(&Method::GET, Some(500), false, 0).retry);
        assert!(policy.decide(&Method::GET, None, true, 0).retry);
    }
}
