// SPDX-License-Identifier: MIT OR Apache-2.0
//! Resilience primitives for the RFP operator platform (`spec.md` §4.2).
//!
//! Error classification, jittered exponential backoff, retry-with-
//! classification, graceful primary→fallback degradation, adaptive
//! per-call timeouts, and a partial-success combinator for batched tool
//! results. Every other subsystem (the AI client's retry loop, the agent
//! runtime's tool-call retries, the job executor's step retries) builds on
//! this crate rather than re-implementing backoff.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod classify;
mod retry;

pub use backoff::exponential_backoff_with_jitter;
pub use classify::{classify_error, classify_message, Classification, ErrorCategory};
pub use retry::{
    adaptive_timeout, graceful_degradation, partial_success_handler,
    should_retry_with_adjusted_params, AdjustedParams, PartialOutcome, PartialResult,
    RetryError, retry_with_classification,
};
