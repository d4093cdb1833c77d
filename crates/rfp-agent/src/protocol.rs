//! Protocol enforcement: load-before-write and write-before-talk, the two
//! invariants the operator loop enforces around every tool call
//! (`spec.md` §4.7, step 6 "Tool loop", `ErrorCode::ProtocolLoadBeforeWrite`
//! / `ProtocolWriteBeforeTalk`).

use chrono::{DateTime, Utc};
use rfp_error::{ErrorCode, RfpError};
use std::collections::HashSet;

const WRITE_TOOLS: &[&str] = &["opportunity_patch", "journal_append", "event_append"];
const TALK_TOOLS: &[&str] = &["slack_post_summary", "slack_ask_clarifying_question"];

/// Per-run bookkeeping for the two protocols. One instance is built fresh
/// for each tool-loop invocation (it doesn't survive across turns).
#[derive(Debug, Default)]
pub struct ProtocolState {
    loaded_rfps: HashSet<String>,
    wrote_this_run: HashSet<String>,
}

impl ProtocolState {
    /// Construct an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `opportunity_load` succeeded for `rfp_id` at some point
    /// in this run. A load covers every write for `rfp_id` for the rest of
    /// the run, however long the run takes.
    pub fn record_load(&mut self, rfp_id: &str, _now: DateTime<Utc>) {
        self.loaded_rfps.insert(rfp_id.to_string());
    }

    /// Records that a write tool succeeded for `rfp_id`.
    pub fn record_write(&mut self, rfp_id: &str) {
        self.wrote_this_run.insert(rfp_id.to_string());
    }

    /// Checks whether `tool` may run against `rfp_id` right now, returning
    /// a [`RfpError`] with the matching protocol error code if not.
    pub fn enforce(&self, tool: &str, rfp_id: &str, _now: DateTime<Utc>) -> Result<(), RfpError> {
        if WRITE_TOOLS.contains(&tool) && !self.loaded_rfps.contains(rfp_id) {
            return Err(RfpError::new(ErrorCode::ProtocolLoadBeforeWrite, format!("'{tool}' requires a prior opportunity_load for {rfp_id}")).with_retryable(false));
        }
        if TALK_TOOLS.contains(&tool) && !self.wrote_this_run.contains(rfp_id) {
            return Err(RfpError::new(ErrorCode::ProtocolWriteBeforeTalk, format!("'{tool}' requires a prior write for {rfp_id} this run")).with_retryable(false));
        }
        Ok(())
    }
}
