//! Append-only journal entries (`spec.md` §3, "Journal entry").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation and provenance metadata carried on every journal entry and
/// event-log row so a run's writes can be traced end to end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntryMeta {
    /// Correlation id stamped by the agent runtime for this run.
    pub correlation_id: Option<String>,
    /// Arbitrary extra key-value context.
    pub extra: BTreeMap<String, String>,
}

/// One append-only narrative entry under `pk=RFP#{id}#JOURNAL`,
/// `sk=<ts>#<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JournalEntry {
    /// Owning RFP id.
    pub rfp_id: String,
    /// Sort key (`<ts>#<id>`), computed via [`crate::sortable_id`].
    pub sort_key: String,
    /// Topics this entry touches.
    pub topics: Vec<String>,
    /// What the user stated, verbatim or summarized.
    pub user_stated: Option<String>,
    /// What the agent understood the user's intent to be.
    pub agent_intent: Option<String>,
    /// What actually changed.
    pub what_changed: String,
    /// Why it changed.
    pub why: String,
    /// Assumptions made while recording this entry.
    pub assumptions: Vec<String>,
    /// Sources consulted.
    pub sources: Vec<String>,
    /// Correlation and extra metadata.
    pub meta: EntryMeta,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Who (or which agent run) created this entry.
    pub created_by: String,
}

impl JournalEntry {
    /// Constructs a new journal entry, computing its sort key from
    /// `created_at`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rfp_id: impl Into<String>,
        what_changed: impl Into<String>,
        why: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            rfp_id: rfp_id.into(),
            sort_key: crate::sortable_id(created_at),
            topics: Vec::new(),
            user_stated: None,
            agent_intent: None,
            what_changed: what_changed.into(),
            why: why.into(),
            assumptions: Vec::new(),
            sources: Vec::new(),
            meta: EntryMeta::default(),
            created_at,
            created_by: created_by.into(),
        }
    }
}
