//! Error classification: map a raw error message to a retry posture.
//!
//! Grounded on the keyword tables in `spec.md` §4.2/§6: substring matches
//! against an error's display text decide category, retryability, whether a
//! fallback path should be tried, the backoff multiplier, and the retry cap.

use serde::{Deserialize, Serialize};

/// Broad family a classified error falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No keyword matched; treated as a generic transient failure.
    Transient,
    /// Provider/API rate limiting (429, "rate limit", "too many requests").
    RateLimit,
    /// Request or connection timeout (408, "timed out").
    Timeout,
    /// Network/connectivity failure (DNS, connection reset, 502/503/504).
    Network,
    /// Authentication/authorization failure (401/403).
    Auth,
    /// Caller-side validation failure (400, "invalid", "bad request").
    Validation,
    /// Resource/quota exhaustion (507, "quota", "limit exceeded").
    Resource,
}

/// The full classification outcome for one error occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The matched category.
    pub category: ErrorCategory,
    /// Whether this error is worth retrying at all.
    pub retryable: bool,
    /// Whether callers should fall back to a degraded/alternate path.
    pub should_degrade: bool,
    /// Multiplier applied to the backoff base delay for this category.
    pub backoff_multiplier: f64,
    /// Maximum number of retries appropriate for this category.
    pub max_retries: u32,
}

const RATE_LIMIT_KEYWORDS: &[&str] = &["rate limit", "429", "too many requests"];
const TIMEOUT_KEYWORDS: &[&str] = &["timeout", "timed out", "408"];
const NETWORK_KEYWORDS: &[&str] = &[
    "connection", "network", "dns", "502", "503", "504",
];
const AUTH_KEYWORDS: &[&str] = &["auth", "unauthorized", "forbidden", "401", "403"];
const VALIDATION_KEYWORDS: &[&str] = &["validation", "invalid", "bad request", "400"];
const RESOURCE_KEYWORDS: &[&str] = &["resource", "quota", "limit exceeded", "507"];

fn any_keyword(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}

/// Classify an error by its lower-cased display message.
///
/// Order matters: categories are checked most-specific-first so that, e.g.,
/// a message containing both "timeout" and "network" resolves to the first
/// keyword table that matches (timeout), matching the reference keyword
/// order in `agent_resilience.py`.
pub fn classify_message(message: &str) -> Classification {
    let lower = message.to_lowercase();

    if any_keyword(&lower, RATE_LIMIT_KEYWORDS) {
        return Classification {
            category: ErrorCategory::RateLimit,
            retryable: true,
            should_degrade: false,
            backoff_multiplier: 2.0,
            max_retries: 5,
        };
    }
    if any_keyword(&lower, TIMEOUT_KEYWORDS) {
        return Classification {
            category: ErrorCategory::Timeout,
            retryable: true,
            should_degrade: true,
            backoff_multiplier: 1.5,
            max_retries: 3,
        };
    }
    if any_keyword(&lower, NETWORK_KEYWORDS) {
        return Classification {
            category: ErrorCategory::Network,
            retryable: true,
            should_degrade: false,
            backoff_multiplier: 1.5,
            max_retries: 3,
        };
    }
    if any_keyword(&lower, AUTH_KEYWORDS) {
        return Classification {
            category: ErrorCategory::Auth,
            retryable: false,
            should_degrade: false,
            backoff_multiplier: 1.0,
            max_retries: 0,
        };
    }
    if any_keyword(&lower, VALIDATION_KEYWORDS) {
        return Classification {
            category: ErrorCategory::Validation,
            retryable: false,
            should_degrade: false,
            backoff_multiplier: 1.0,
            max_retries: 0,
        };
    }
    if any_keyword(&lower, RESOURCE_KEYWORDS) {
        return Classification {
            category: ErrorCategory::Resource,
            retryable: true,
            should_degrade: true,
            backoff_multiplier: 2.0,
            max_retries: 2,
        };
    }

    Classification {
        category: ErrorCategory::Transient,
        retryable: true,
        should_degrade: false,
        backoff_multiplier: 1.0,
        max_retries: 3,
    }
}

/// Classify any `std::error::Error`, using its `Display` text.
pub fn classify_error(err: &dyn std::error::Error) -> Classification {
    classify_message(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_transient_with_three_retries() {
        let c = classify_message("something went sideways");
        assert_eq!(c.category, ErrorCategory::Transient);
        assert_eq!(c.max_retries, 3);
        assert!(c.retryable);
    }

    #[test]
    fn auth_is_never_retryable() {
        let c = classify_message("401 Unauthorized: bad token");
        assert_eq!(c.category, ErrorCategory::Auth);
        assert!(!c.retryable);
        assert_eq!(c.max_retries, 0);
    }

    #[test]
    fn validation_is_never_retryable() {
        let c = classify_message("400 Bad Request: invalid payload");
        assert_eq!(c.category, ErrorCategory::Validation);
        assert!(!c.retryable);
    }

    #[test]
    fn rate_limit_backs_off_without_degrading() {
        let c = classify_message("429 Too Many Requests");
        assert_eq!(c.category, ErrorCategory::RateLimit);
        assert!(!c.should_degrade);
        assert_eq!(c.backoff_multiplier, 2.0);
    }

    #[test]
    fn network_retries_without_degrading() {
        let c = classify_message("503 Service Unavailable: connection reset");
        assert_eq!(c.category, ErrorCategory::Network);
        assert!(!c.should_degrade);
        assert_eq!(c.max_retries, 3);
    }

    #[test]
    fn timeout_beats_network_when_both_present() {
        let c = classify_message("connection timed out while reaching network");
        assert_eq!(c.category, ErrorCategory::Timeout);
    }
}
