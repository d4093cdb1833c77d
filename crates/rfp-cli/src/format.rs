// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting utilities for the RFP operator CLI.

use rfp_core::{AgentJob, EventLogEntry, JournalEntry, JobStatus, OpportunityState};
use rfp_receipt::diff::FieldChange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported output formats for CLI display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Compact JSON (single line).
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
    /// Human-readable multi-line text.
    Text,
    /// Key-value aligned table.
    Table,
    /// Single-line summary.
    Compact,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Text => "text",
            Self::Table => "table",
            Self::Compact => "compact",
        };
        f.write_str(s)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json-pretty" | "json_pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "text" => Ok(Self::Text),
            "table" => Ok(Self::Table),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Formats operator-platform contract types for CLI output.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Create a new formatter with the given output format.
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Format an [`AgentJob`] according to the configured output format.
    #[must_use]
    pub fn format_job(&self, job: &AgentJob) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(job).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(job).unwrap_or_default(),
            OutputFormat::Text => format_job_text(job),
            OutputFormat::Table => format_job_table(job),
            OutputFormat::Compact => format_job_compact(job),
        }
    }

    /// Format an [`OpportunityState`] according to the configured output format.
    #[must_use]
    pub fn format_state(&self, state: &OpportunityState) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(state).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => format_state_text(state),
            OutputFormat::Table => format_state_table(state),
            OutputFormat::Compact => format_state_compact(state),
        }
    }

    /// Format a [`JournalEntry`] according to the configured output format.
    #[must_use]
    pub fn format_journal_entry(&self, entry: &JournalEntry) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(entry).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(entry).unwrap_or_default(),
            OutputFormat::Text => format!("[{}] {} ({})", entry.sort_key, entry.what_changed, entry.created_by),
            OutputFormat::Table => format!("{:<24} {:<16} {}", entry.sort_key, entry.created_by, truncate(&entry.what_changed, 60)),
            OutputFormat::Compact => format!("[journal] {}", truncate(&entry.what_changed, 60)),
        }
    }

    /// Format an [`EventLogEntry`] according to the configured output format.
    #[must_use]
    pub fn format_event(&self, event: &EventLogEntry) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(event).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(event).unwrap_or_default(),
            OutputFormat::Text => format!("[{}] {}{}", event.sort_key, event.event_type, event.tool.as_deref().map(|t| format!(" ({t})")).unwrap_or_default()),
            OutputFormat::Table => format!("{:<24} {:<20} {}", event.sort_key, event.event_type, event.tool.as_deref().unwrap_or("-")),
            OutputFormat::Compact => format!("[event] {}", event.event_type),
        }
    }

    /// Format a field-level diff produced by [`rfp_receipt::diff::diff_opportunity_state`].
    #[must_use]
    pub fn format_diff(&self, diff: &[FieldChange]) -> String {
        match &self.format {
            OutputFormat::Json => serde_json::to_string(diff).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(diff).unwrap_or_default(),
            OutputFormat::Text | OutputFormat::Table => diff
                .iter()
                .map(|c| format!("{:<20} {} -> {}", c.field, c.before, c.after))
                .collect::<Vec<_>>()
                .join("\n"),
            OutputFormat::Compact => diff.iter().map(|c| c.field.as_str()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Format an error message according to the configured output format.
    #[must_use]
    pub fn format_error(&self, err: &str) -> String {
        match &self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                serde_json::json!({"error": err}).to_string()
            }
            OutputFormat::Text => format!("Error: {err}"),
            OutputFormat::Table => format!("error  {err}"),
            OutputFormat::Compact => format!("[error] {err}"),
        }
    }
}

// ── Text helpers ──────────────────────────────────────────────────────

fn status_str(s: JobStatus) -> &'static str {
    match s {
        JobStatus::Queued => "queued",
        JobStatus::Running => "running",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…", &s[..max])
    }
}

// ── Job formatters ────────────────────────────────────────────────────

fn format_job_text(j: &AgentJob) -> String {
    format!(
        "ID: {}\nType: {}\nStatus: {}\nProgress: {}% {}\nRFP: {}",
        j.id,
        j.job_type,
        status_str(j.status),
        j.progress.pct,
        j.progress.step,
        j.scope.rfp_id.as_deref().unwrap_or("-"),
    )
}

fn format_job_table(j: &AgentJob) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{:<12} {}", "id", j.id));
    lines.push(format!("{:<12} {}", "type", j.job_type));
    lines.push(format!("{:<12} {}", "status", status_str(j.status)));
    lines.push(format!("{:<12} {}% {}", "progress", j.progress.pct, j.progress.step));
    lines.push(format!("{:<12} {}", "rfp_id", j.scope.rfp_id.as_deref().unwrap_or("-")));
    lines.push(format!("{:<12} {}", "due_at", j.due_at));
    if let Some(ref err) = j.error {
        lines.push(format!("{:<12} {}", "error", truncate(err, 120)));
    }
    lines.join("\n")
}

fn format_job_compact(j: &AgentJob) -> String {
    format!("[{}] {} status={}", j.id, j.job_type, status_str(j.status))
}

// ── OpportunityState formatters ───────────────────────────────────────

fn format_state_text(s: &OpportunityState) -> String {
    format!(
        "RFP: {}\nStage: {}\nVersion: {}\nCommitments: {}\nOwners: {}",
        s.rfp_id,
        s.stage,
        s.version,
        s.commitments.len(),
        s.owners.join(", "),
    )
}

fn format_state_table(s: &OpportunityState) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{:<14} {}", "rfp_id", s.rfp_id));
    lines.push(format!("{:<14} {}", "stage", s.stage));
    lines.push(format!("{:<14} {}", "version", s.version));
    lines.push(format!("{:<14} {}", "commitments", s.commitments.len()));
    lines.push(format!("{:<14} {}", "owners", s.owners.join(", ")));
    lines.push(format!("{:<14} {}", "summary", truncate(&s.summary, 80)));
    lines.join("\n")
}

fn format_state_compact(s: &OpportunityState) -> String {
    format!("[{}] stage={} v{} commitments={}", s.rfp_id, s.stage, s.version, s.commitments.len())
}
