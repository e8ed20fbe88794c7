//! Circuit breaker guarding the Embedding Client (`SPEC_FULL.md` §4.8, §9).
//!
//! Grounded on the teacher's `embeddings::circuit_breaker::CircuitBreaker`:
//! a `parking_lot::Mutex`-guarded state machine with no background task —
//! every caller pays the cost of checking the clock on the way in.

use std::time::Instant;

use parking_lot::Mutex;

use crate::config::CircuitBreakerConfig;

/// Circuit breaker state (§9 resolved Open Question: 5 consecutive
/// failures opens it, 30s cool-down, 2 consecutive successes closes it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    half_open_attempts: u32,
}

/// A single breaker instance, shared behind an `Arc` by every call site
/// that goes through the same upstream (one breaker per Embedding Client).
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_attempts: 0,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.maybe_transition_to_half_open();
        self.inner.lock().state
    }

    /// Whether a caller may attempt the guarded call right now. Transitions
    /// `Open -> HalfOpen` as a side effect once the cool-down has elapsed,
    /// and caps concurrent half-open probes at `half_open_max_attempts`.
    #[must_use]
    pub fn allow_request(&self) -> bool {
        self.maybe_transition_to_half_open();
        let mut guard = self.inner.lock();
        match guard.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if guard.half_open_attempts < self.config.half_open_max_attempts {
                    guard.half_open_attempts += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut guard = self.inner.lock();
        match guard.state {
            CircuitState::Closed => {
                guard.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                guard.consecutive_successes += 1;
                if guard.consecutive_successes >= self.config.success_threshold {
                    guard.state = CircuitState::Closed;
                    guard.consecutive_failures = 0;
                    guard.consecutive_successes = 0;
                    guard.opened_at = None;
                    guard.half_open_attempts = 0;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut guard = self.inner.lock();
        match guard.state {
            CircuitState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.config.failure_threshold {
                    guard.state = CircuitState::Open;
                    guard.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
                guard.consecutive_successes = 0;
                guard.half_open_attempts = 0;
            }
            CircuitState::Open => {}
        }
    }

    fn maybe_transition_to_half_open(&self) {
        let mut guard = self.inner.lock();
        if guard.state == CircuitState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.config.cool_down() {
                    guard.state = CircuitState::HalfOpen;
                    guard.half_open_attempts = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 2,
            cool_down_s: 0,
            half_open_max_attempts: 1,
        }
    }

    #[test]
    fn opens_after_failure_threshold() {
        let cb = CircuitBreaker::new(fast_config());
        assert!(cb.allow_request());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
    }

    #[test]
    fn half_opens_after_cool_down_and_closes_after_successes() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow_request());
        cb.record_success();
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failure_in_half_open_reopens_circuit() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
