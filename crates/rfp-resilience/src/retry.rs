//! Retry-with-classification, graceful degradation, adaptive timeout, and
//! partial-success combinators (`spec.md` §4.2).

use crate::backoff::exponential_backoff_with_jitter;
use crate::classify::{classify_message, Classification};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Error produced when a retry loop gives up.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct RetryError {
    /// The final attempt's error message.
    pub message: String,
    /// The classification that decided whether to keep retrying.
    pub classification: Classification,
}

/// Retry `f` with exponential backoff, classifying each failure to decide
/// whether to continue.
///
/// `f` is invoked at most `min(max_retries, classification.max_retries)`
/// times in total. `on_retry`, when given, is called with `(attempt,
/// &error_message)` before each sleep. `should_retry`, when given, can veto
/// a retry that the classifier would otherwise allow.
pub async fn retry_with_classification<T, E, F, Fut>(
    mut f: F,
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    mut on_retry: Option<&mut dyn FnMut(u32, &str)>,
    should_retry: Option<&dyn Fn(&Classification) -> bool>,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let message = err.to_string();
                let classification = classify_message(&message);
                let cap = max_retries.min(classification.max_retries);
                let allowed = classification.retryable
                    && should_retry.map(|p| p(&classification)).unwrap_or(true);

                if !allowed || attempts >= cap {
                    warn!(
                        target: "rfp.resilience",
                        attempts,
                        category = ?classification.category,
                        "retry exhausted or non-retryable: {message}"
                    );
                    return Err(RetryError {
                        message,
                        classification,
                    });
                }

                let delay = exponential_backoff_with_jitter(
                    attempts,
                    base_delay,
                    max_delay,
                    classification.backoff_multiplier,
                    0.25,
                );
                if let Some(cb) = on_retry.as_deref_mut() {
                    cb(attempts, &message);
                }
                debug!(
                    target: "rfp.resilience",
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "retrying after classified failure: {message}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Run `primary`, and on a failure whose classification says
/// `should_degrade`, run `fallback`. If both fail, the *original* primary
/// error is returned (the fallback error is logged but not propagated).
pub async fn graceful_degradation<T, E, P, PFut, F, FFut>(
    primary: P,
    fallback: F,
    max_retries: u32,
) -> Result<T, E>
where
    P: FnMut() -> PFut,
    PFut: Future<Output = Result<T, E>>,
    F: FnOnce() -> FFut,
    FFut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut primary = primary;
    let mut attempt = 0u32;
    let primary_err = loop {
        match primary().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                let classification = classify_message(&e.to_string());
                if !classification.retryable || attempt >= max_retries.min(classification.max_retries) {
                    break e;
                }
                attempt += 1;
                let delay = exponential_backoff_with_jitter(
                    attempt,
                    Duration::from_millis(200),
                    Duration::from_secs(10),
                    classification.backoff_multiplier,
                    0.25,
                );
                tokio::time::sleep(delay).await;
            }
        }
    };

    let classification = classify_message(&primary_err.to_string());
    if !classification.should_degrade {
        return Err(primary_err);
    }

    warn!(target: "rfp.resilience", "primary failed, degrading to fallback: {primary_err}");
    match fallback().await {
        Ok(v) => Ok(v),
        Err(fallback_err) => {
            warn!(target: "rfp.resilience", "fallback also failed: {fallback_err}");
            Err(primary_err)
        }
    }
}

/// Scale a base timeout linearly with task complexity and prior failures,
/// clamped to `[min, max]`. Hard upper bound per §5 is 5 minutes; callers
/// pass that as `max`.
pub fn adaptive_timeout(
    base: Duration,
    complexity_score: f64,
    previous_failures: u32,
    min: Duration,
    max: Duration,
) -> Duration {
    let complexity_factor = 1.0 + complexity_score.max(0.0);
    let failure_factor = 1.0 + (previous_failures as f64 * 0.5);
    let scaled = base.as_secs_f64() * complexity_factor * failure_factor;
    Duration::from_secs_f64(scaled.clamp(min.as_secs_f64(), max.as_secs_f64()))
}

/// Reduced-effort parameters suggested after a failed attempt, used when an
/// error's classification implies that downgrading will help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AdjustedParams {
    /// Reasoning effort tier: 0 = low, 1 = medium, 2 = high.
    pub reasoning_effort_tier: u8,
    /// Reduced maximum agent-loop steps.
    pub max_steps: u32,
    /// Reduced maximum output tokens.
    pub max_tokens: u32,
}

/// Compute adjusted parameters for the next attempt, degrading reasoning
/// effort high→medium→low and shrinking `max_steps`/`max_tokens` linearly,
/// capped at `max_adjustments` total adjustments.
pub fn should_retry_with_adjusted_params(
    message: &str,
    attempt: u32,
    base_steps: u32,
    base_tokens: u32,
    max_adjustments: u32,
) -> Option<AdjustedParams> {
    let classification = classify_message(message);
    if !classification.should_degrade {
        return None;
    }
    let adjustments = attempt.min(max_adjustments);
    if adjustments == 0 {
        return None;
    }
    let reasoning_effort_tier = 2u8.saturating_sub(adjustments.min(2) as u8);
    let shrink = 1.0 - (adjustments as f64 / (max_adjustments as f64 + 1.0)) * 0.5;
    Some(AdjustedParams {
        reasoning_effort_tier,
        max_steps: ((base_steps as f64 * shrink).round() as u32).max(1),
        max_tokens: ((base_tokens as f64 * shrink).round() as u32).max(1),
    })
}

/// One entry in a batch whose partial success is being evaluated.
pub trait PartialResult {
    /// Whether this individual result counts as a success.
    fn is_ok(&self) -> bool;
}

/// Outcome of combining a batch of heterogeneous results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialOutcome {
    /// Whether the batch as a whole is considered successful.
    pub success: bool,
    /// Count of individually-successful results.
    pub success_count: usize,
    /// Count of individually-failed results.
    pub failure_count: usize,
}

/// Combine a list of `{ok: bool}`-shaped results: the batch succeeds if at
/// least `min_success_count` items succeeded, or if `continue_on_partial` is
/// set and at least one item succeeded.
pub fn partial_success_handler<T: PartialResult>(
    results: &[T],
    min_success_count: usize,
    continue_on_partial: bool,
) -> PartialOutcome {
    let success_count = results.iter().filter(|r| r.is_ok()).count();
    let failure_count = results.len() - success_count;
    let success = success_count >= min_success_count
        || (continue_on_partial && success_count > 0);
    PartialOutcome {
        success,
        success_count,
        failure_count,
    }
}
