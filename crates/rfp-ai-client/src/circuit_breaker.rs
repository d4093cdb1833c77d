//! Circuit breaker over the AI client's retryable-failure rate
//! (`spec.md` §4.5): `N` retryable failures within a rolling window opens
//! the circuit for a cooldown period.

use chrono::{DateTime, Utc};
use rfp_config::ResilienceConfig;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Whether a call may proceed, or must fail fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls proceed normally.
    Closed,
    /// Calls fail fast with `ai_temporarily_unavailable` until the cooldown
    /// elapses.
    Open,
}

/// Tracks retryable-failure timestamps in a rolling window and trips open
/// once the threshold is exceeded, per [`ResilienceConfig`].
pub struct CircuitBreaker {
    threshold: u32,
    window: chrono::Duration,
    open_duration: chrono::Duration,
    failures: Mutex<VecDeque<DateTime<Utc>>>,
    opened_at: Mutex<Option<DateTime<Utc>>>,
}

impl CircuitBreaker {
    /// Construct a breaker from resilience config.
    pub fn new(config: &ResilienceConfig) -> Self {
        Self {
            threshold: config.circuit_breaker_threshold,
            window: chrono::Duration::seconds(config.circuit_breaker_window_secs as i64),
            open_duration: chrono::Duration::seconds(config.circuit_breaker_open_secs as i64),
            failures: Mutex::new(VecDeque::new()),
            opened_at: Mutex::new(None),
        }
    }

    /// Current state as of `now`, closing the circuit again once the
    /// cooldown has elapsed.
    pub fn state(&self, now: DateTime<Utc>) -> CircuitState {
        let mut opened_at = self.opened_at.lock().unwrap();
        if let Some(opened) = *opened_at {
            if now - opened < self.open_duration {
                return CircuitState::Open;
            }
            *opened_at = None;
            self.failures.lock().unwrap().clear();
        }
        CircuitState::Closed
    }

    /// Records a retryable failure at `now`, tripping the circuit open if
    /// the rolling-window threshold is exceeded.
    pub fn record_failure(&self, now: DateTime<Utc>) {
        let mut failures = self.failures.lock().unwrap();
        failures.push_back(now);
        while let Some(front) = failures.front() {
            if now - *front > self.window {
                failures.pop_front();
            } else {
                break;
            }
        }
        if failures.len() as u32 >= self.threshold {
            *self.opened_at.lock().unwrap() = Some(now);
            tracing::warn!(target: "rfp.ai_client", failures = failures.len(), "circuit_breaker_opened");
        }
    }

    /// Records a success at `now`, clearing the failure window.
    pub fn record_success(&self, now: DateTime<Utc>) {
        let _ = now;
        self.failures.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32, window_secs: u64, open_secs: u64) -> ResilienceConfig {
        ResilienceConfig { circuit_breaker_threshold: threshold, circuit_breaker_window_secs: window_secs, circuit_breaker_open_secs: open_secs, ..ResilienceConfig::default() }
    }

    #[test]
    fn opens_after_threshold_failures_within_window() {
        let breaker = CircuitBreaker::new(&config(5, 60, 15));
        let now = Utc::now();
        for i in 0..5 {
            breaker.record_failure(now + chrono::Duration::seconds(i));
        }
        assert_eq!(breaker.state(now + chrono::Duration::seconds(5)), CircuitState::Open);
    }

    #[test]
    fn stays_closed_when_failures_fall_outside_window() {
        let breaker = CircuitBreaker::new(&config(3, 10, 15));
        let now = Utc::now();
        breaker.record_failure(now);
        breaker.record_failure(now + chrono::Duration::seconds(20));
        breaker.record_failure(now + chrono::Duration::seconds(21));
        assert_eq!(breaker.state(now + chrono::Duration::seconds(21)), CircuitState::Closed);
    }

    #[test]
    fn closes_again_after_cooldown() {
        let breaker = CircuitBreaker::new(&config(2, 60, 15));
        let now = Utc::now();
        breaker.record_failure(now);
        breaker.record_failure(now + chrono::Duration::seconds(1));
        assert_eq!(breaker.state(now + chrono::Duration::seconds(1)), CircuitState::Open);
        assert_eq!(breaker.state(now + chrono::Duration::seconds(17)), CircuitState::Closed);
    }
}
