//! Append-only, hash-chained event log entries (`spec.md` §3, "Event log").
//!
//! The hash-chain mechanics (linking each entry to its predecessor and
//! verifying the chain) live in `rfp-receipt`; this module only defines the
//! entry shape and the leaf redaction types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A redacted view of a tool call's inputs: only the argument *keys*, never
/// their values (§3 "Event log").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputsRedacted {
    /// Names of the arguments the tool call carried.
    pub args_keys: Vec<String>,
}

/// A redacted view of a tool call's outputs: a bounded preview string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputsRedacted {
    /// Bounded preview of the result (already slimmed by the caller).
    pub result_preview: String,
}

/// One append-only explainability row under `pk=RFP#{id}#EVENTS`,
/// `sk=<ts>#<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EventLogEntry {
    /// Owning RFP id.
    pub rfp_id: String,
    /// Sort key (`<ts>#<id>`), computed via [`crate::sortable_id`].
    pub sort_key: String,
    /// Event type, e.g. `"tool_call"`, `"policy_check"`, `"protocol_violation"`.
    pub event_type: String,
    /// The tool invoked, if this event represents a tool call.
    pub tool: Option<String>,
    /// Bounded event payload.
    pub payload: BTreeMap<String, String>,
    /// Redacted tool inputs.
    pub inputs_redacted: InputsRedacted,
    /// Redacted tool outputs.
    pub outputs_redacted: OutputsRedacted,
    /// Policy checks performed as part of this event.
    pub policy_checks: Vec<String>,
    /// Confidence flags raised while handling this event.
    pub confidence_flags: Vec<String>,
    /// Downstream effects this event is known to have triggered.
    pub downstream_effects: Vec<String>,
    /// Correlation id stamped by the agent runtime for this run.
    pub correlation_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// SHA-256 hex digest of this entry's predecessor in the chain, or
    /// `None` for the first entry in an RFP's event log.
    pub prev_hash: Option<String>,
}

impl EventLogEntry {
    /// Constructs a new event-log entry with no chain linkage yet (set by
    /// `rfp-receipt::EventChain::push`).
    pub fn new(rfp_id: impl Into<String>, event_type: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            rfp_id: rfp_id.into(),
            sort_key: crate::sortable_id(created_at),
            event_type: event_type.into(),
            tool: None,
            payload: BTreeMap::new(),
            inputs_redacted: InputsRedacted::default(),
            outputs_redacted: OutputsRedacted::default(),
            policy_checks: Vec::new(),
            confidence_flags: Vec::new(),
            downstream_effects: Vec::new(),
            correlation_id: None,
            created_at,
            prev_hash: None,
        }
    }
}
