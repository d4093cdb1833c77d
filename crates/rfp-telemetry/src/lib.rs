// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured telemetry for the RFP operator platform.
//!
//! Every subsystem logs through `tracing` under a `rfp.<component>` target
//! convention. This crate also holds [`RunMetrics`], a lightweight atomic
//! counter struct for run counts, tool-call counts, retry counts, and
//! tokens, plus [`init_tracing`] to wire up env-filtered, JSON-capable
//! output for the CLI and worker binaries.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Target prefix every subsystem should log under, e.g. `rfp.agent`,
/// `rfp.executor`, `rfp.opportunity`.
pub const TARGET_PREFIX: &str = "rfp";

/// Initializes a global `tracing` subscriber from `RUST_LOG` (defaulting to
/// `info`), with optional JSON output for production deployments.
///
/// A second call is a no-op; tests and CLI subcommands may both attempt it.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if json {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    if let Err(e) = result {
        tracing::trace!(target: "rfp.telemetry", error = %e, "tracing already initialized");
    }
}

/// Process-wide, lock-free counters for the agent runtime and job executor.
///
/// Construct once at startup (typically behind an `Arc`) and share across
/// worker threads; every field is an [`AtomicU64`] so recording never
/// blocks a tool call or AI request.
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Total agent runs started.
    pub runs_started: AtomicU64,
    /// Total agent runs that completed (success or failure).
    pub runs_completed: AtomicU64,
    /// Total tool calls dispatched.
    pub tool_calls: AtomicU64,
    /// Total tool calls that failed (before retry classification).
    pub tool_call_failures: AtomicU64,
    /// Total retry attempts across all resilience call sites.
    pub retries: AtomicU64,
    /// Total protocol violations signaled back to the model.
    pub protocol_violations: AtomicU64,
    /// Total input tokens recorded across all AI calls.
    pub tokens_in: AtomicU64,
    /// Total output tokens recorded across all AI calls.
    pub tokens_out: AtomicU64,
    /// Total checkpoints written by the job executor.
    pub checkpoints_written: AtomicU64,
}

impl RunMetrics {
    /// Creates a fresh, zeroed metrics set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of an agent run.
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the completion of an agent run.
    pub fn record_run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a dispatched tool call, and whether it ultimately failed.
    pub fn record_tool_call(&self, failed: bool) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.tool_call_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records one retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one protocol violation.
    pub fn record_protocol_violation(&self) {
        self.protocol_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records token usage from a completed AI call.
    pub fn record_tokens(&self, input: u64, output: u64) {
        self.tokens_in.fetch_add(input, Ordering::Relaxed);
        self.tokens_out.fetch_add(output, Ordering::Relaxed);
    }

    /// Records a checkpoint write.
    pub fn record_checkpoint(&self) {
        self.checkpoints_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time, serializable snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_call_failures: self.tool_call_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            protocol_violations: self.protocol_violations.load(Ordering::Relaxed),
            tokens_in: self.tokens_in.load(Ordering::Relaxed),
            tokens_out: self.tokens_out.load(Ordering::Relaxed),
            checkpoints_written: self.checkpoints_written.load(Ordering::Relaxed),
        }
    }
}

/// A serializable point-in-time view of [`RunMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// See [`RunMetrics::runs_started`].
    pub runs_started: u64,
    /// See [`RunMetrics::runs_completed`].
    pub runs_completed: u64,
    /// See [`RunMetrics::tool_calls`].
    pub tool_calls: u64,
    /// See [`RunMetrics::tool_call_failures`].
    pub tool_call_failures: u64,
    /// See [`RunMetrics::retries`].
    pub retries: u64,
    /// See [`RunMetrics::protocol_violations`].
    pub protocol_violations: u64,
    /// See [`RunMetrics::tokens_in`].
    pub tokens_in: u64,
    /// See [`RunMetrics::tokens_out`].
    pub tokens_out: u64,
    /// See [`RunMetrics::checkpoints_written`].
    pub checkpoints_written: u64,
}

/// Emits one `info`-level "performance log line" for a completed tool call,
/// per the agent runtime loop's step 6(f).
pub fn log_tool_call(tool: &str, rfp_id: Option<&str>, ok: bool, duration_ms: u64) {
    tracing::info!(
        target: "rfp.agent.tool",
        tool,
        rfp_id,
        ok,
        duration_ms,
        "tool call completed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = RunMetrics::new();
        let snap = m.snapshot();
        assert_eq!(snap, MetricsSnapshot::default());
    }

    #[test]
    fn records_accumulate() {
        let m = RunMetrics::new();
        m.record_run_started();
        m.record_tool_call(true);
        m.record_tool_call(false);
        m.record_retry();
        m.record_tokens(100, 50);
        let snap = m.snapshot();
        assert_eq!(snap.runs_started, 1);
        assert_eq!(snap.tool_calls, 2);
        assert_eq!(snap.tool_call_failures, 1);
        assert_eq!(snap.retries, 1);
        assert_eq!(snap.tokens_in, 100);
        assert_eq!(snap.tokens_out, 50);
    }

    #[test]
    fn snapshot_is_serializable() {
        let m = RunMetrics::new();
        m.record_checkpoint();
        let json = serde_json::to_string(&m.snapshot()).unwrap();
        assert!(json.contains("checkpoints_written"));
    }
}
