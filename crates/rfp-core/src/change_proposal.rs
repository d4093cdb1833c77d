//! Change proposals: stored patches plus rationale, intended as the source
//! artifact for a later approval-gated PR (`spec.md` §3, "ChangeProposal").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stored code/config patch awaiting an approval-gated
/// `self_modify_open_pr` job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChangeProposal {
    /// Stable id.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Longer rationale.
    pub summary: String,
    /// Unified-diff blob, bounded by the caller before write.
    pub patch: String,
    /// Files the patch touches.
    pub files_touched: Vec<String>,
    /// Associated RFP, if this change proposal was generated in an
    /// RFP-scoped run.
    pub rfp_id: Option<String>,
    /// Who (or which agent run) created this proposal.
    pub created_by: String,
    /// Arbitrary extra metadata.
    pub meta: BTreeMap<String, String>,
    /// Lifecycle stage: `"created"`, `"pr_opened"`, `"checks_passed"`,
    /// `"rollout_verified"`, `"rejected"`.
    pub stage: String,
    /// The PR number once `self_modify_open_pr` has run, if any.
    pub pull_request_number: Option<u64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ChangeProposal {
    /// Constructs a new change proposal in the `"created"` stage.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
        patch: impl Into<String>,
        created_by: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: summary.into(),
            patch: patch.into(),
            files_touched: Vec::new(),
            rfp_id: None,
            created_by: created_by.into(),
            meta: BTreeMap::new(),
            stage: "created".to_string(),
            pull_request_number: None,
            created_at,
        }
    }
}
