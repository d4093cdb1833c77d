// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tests for the `format` module covering all output formats and contract types.

use chrono::Utc;
use rfp_cli::format::{Formatter, OutputFormat};
use rfp_core::job::JobScope;
use rfp_core::{AgentJob, EventLogEntry, JournalEntry, OpportunityState};
use rfp_receipt::diff::FieldChange;

fn sample_job() -> AgentJob {
    let now = Utc::now();
    AgentJob::new(
        "job-1",
        "ai_agent_execute",
        JobScope { rfp_id: Some("r1".into()), env: None },
        serde_json::json!({"text": "hello"}),
        now,
        now,
    )
}

fn sample_state() -> OpportunityState {
    OpportunityState::default_for("r1", Utc::now())
}

fn sample_journal_entry() -> JournalEntry {
    JournalEntry::new("r1", "stage set to in-review", "user requested", "agent:run-1", Utc::now())
}

fn sample_event() -> EventLogEntry {
    EventLogEntry::new("r1", "tool_call", Utc::now())
}

// ── AgentJob ─────────────────────────────────────────────────────────

#[test]
fn format_job_json_round_trips() {
    let job = sample_job();
    let out = Formatter::new(OutputFormat::Json).format_job(&job);
    let parsed: AgentJob = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed.id, job.id);
}

#[test]
fn format_job_json_pretty_is_multiline() {
    let job = sample_job();
    let out = Formatter::new(OutputFormat::JsonPretty).format_job(&job);
    assert!(out.contains('\n'));
}

#[test]
fn format_job_text_contains_key_fields() {
    let job = sample_job();
    let out = Formatter::new(OutputFormat::Text).format_job(&job);
    assert!(out.contains("job-1"));
    assert!(out.contains("queued"));
    assert!(out.contains("r1"));
}

#[test]
fn format_job_table_lists_rows() {
    let job = sample_job();
    let out = Formatter::new(OutputFormat::Table).format_job(&job);
    assert!(out.contains("status"));
    assert!(out.contains("progress"));
}

#[test]
fn format_job_compact_is_one_line() {
    let job = sample_job();
    let out = Formatter::new(OutputFormat::Compact).format_job(&job);
    assert_eq!(out.lines().count(), 1);
    assert!(out.contains("queued"));
}

// ── OpportunityState ─────────────────────────────────────────────────

#[test]
fn format_state_text_contains_stage() {
    let state = sample_state();
    let out = Formatter::new(OutputFormat::Text).format_state(&state);
    assert!(out.contains("new"));
    assert!(out.contains("r1"));
}

#[test]
fn format_state_compact_includes_version() {
    let state = sample_state();
    let out = Formatter::new(OutputFormat::Compact).format_state(&state);
    assert!(out.contains("v0"));
}

// ── JournalEntry / EventLogEntry ──────────────────────────────────────

#[test]
fn format_journal_entry_text_contains_what_changed() {
    let entry = sample_journal_entry();
    let out = Formatter::new(OutputFormat::Text).format_journal_entry(&entry);
    assert!(out.contains("stage set to in-review"));
    assert!(out.contains("agent:run-1"));
}

#[test]
fn format_event_text_contains_event_type() {
    let event = sample_event();
    let out = Formatter::new(OutputFormat::Text).format_event(&event);
    assert!(out.contains("tool_call"));
}

// ── Diff ──────────────────────────────────────────────────────────────

#[test]
fn format_diff_compact_lists_field_names() {
    let diff = vec![
        FieldChange { field: "stage".into(), before: "\"new\"".into(), after: "\"in-review\"".into() },
        FieldChange { field: "version".into(), before: "0".into(), after: "1".into() },
    ];
    let out = Formatter::new(OutputFormat::Compact).format_diff(&diff);
    assert_eq!(out, "stage, version");
}

#[test]
fn format_diff_text_shows_before_and_after() {
    let diff = vec![FieldChange { field: "stage".into(), before: "\"new\"".into(), after: "\"in-review\"".into() }];
    let out = Formatter::new(OutputFormat::Text).format_diff(&diff);
    assert!(out.contains("new"));
    assert!(out.contains("in-review"));
}

// ── Errors ──────────────────────────────────────────────────────────

#[test]
fn format_error_json_wraps_message() {
    let out = Formatter::new(OutputFormat::Json).format_error("boom");
    let v: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(v["error"], "boom");
}

#[test]
fn format_error_text_is_prefixed() {
    let out = Formatter::new(OutputFormat::Text).format_error("boom");
    assert_eq!(out, "Error: boom");
}

// ── Round trip across all formats ─────────────────────────────────────

#[test]
fn all_formats_produce_non_empty_output_for_every_type() {
    let job = sample_job();
    let state = sample_state();
    let entry = sample_journal_entry();
    let event = sample_event();
    for fmt in [
        OutputFormat::Json,
        OutputFormat::JsonPretty,
        OutputFormat::Text,
        OutputFormat::Table,
        OutputFormat::Compact,
    ] {
        let formatter = Formatter::new(fmt);
        assert!(!formatter.format_job(&job).is_empty());
        assert!(!formatter.format_state(&state).is_empty());
        assert!(!formatter.format_journal_entry(&entry).is_empty());
        assert!(!formatter.format_event(&event).is_empty());
    }
}
