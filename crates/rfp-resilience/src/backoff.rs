//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// `min(base * multiplier^(attempt-1), max) * (1 ± jitter)`, clamped to
/// `[0, max]`. `attempt` is 1-indexed (the first retry is attempt 1).
pub fn exponential_backoff_with_jitter(
    attempt: u32,
    base: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
) -> Duration {
    let attempt = attempt.max(1);
    let exp = multiplier.powi(attempt as i32 - 1);
    let nominal_secs = (base.as_secs_f64() * exp).min(max.as_secs_f64());

    let jitter = jitter.clamp(0.0, 1.0);
    let jittered_secs = if jitter > 0.0 {
        let delta: f64 = rand::thread_rng().gen_range(-jitter..=jitter);
        nominal_secs * (1.0 + delta)
    } else {
        nominal_secs
    };

    Duration::from_secs_f64(jittered_secs.clamp(0.0, max.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_by_max_delay() {
        for attempt in 1..20 {
            let d = exponential_backoff_with_jitter(
                attempt,
                Duration::from_millis(100),
                Duration::from_secs(10),
                2.0,
                0.5,
            );
            assert!(d <= Duration::from_secs(10));
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let a = exponential_backoff_with_jitter(
            3,
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            0.0,
        );
        let b = exponential_backoff_with_jitter(
            3,
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
            0.0,
        );
        assert_eq!(a, b);
        assert_eq!(a, Duration::from_millis(400));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn always_within_bounds(
            attempt in 1u32..50,
            base_ms in 1u64..5000,
            max_ms in 1u64..60_000,
            multiplier in 1.0f64..4.0,
            jitter in 0.0f64..1.0,
        ) {
            let max = Duration::from_millis(max_ms);
            let d = exponential_backoff_with_jitter(
                attempt,
                Duration::from_millis(base_ms),
                max,
                multiplier,
                jitter,
            );
            prop_assert!(d <= max);
            prop_assert!(d >= Duration::ZERO);
        }
    }
}
