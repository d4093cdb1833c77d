//! Per-RFP canonical opportunity state (`spec.md` §3, "OpportunityState").
//!
//! This module owns the *shape* of the state and the pure merge semantics
//! of a patch. Sanitizing a caller-supplied patch (dropping commitments
//! without provenance) is a policy concern and lives in `rfp-policy`; the
//! repository crate (`rfp-opportunity`) is the only caller that should
//! construct an [`OpportunityPatch`] from untrusted input.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a durable fact came from. Required on every commitment; a
/// commitment without one is never persisted (§3 invariant (a)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Provenance {
    /// Source kind, e.g. `"slack_thread"`, `"email"`, `"manual"`.
    pub source: String,
    /// Opaque reference into that source, e.g. `"C1/T1"`.
    pub reference: Option<String>,
}

/// A single durable commitment. Commitments are add-only: once persisted,
/// a commitment is never edited or removed through `patch_state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Commitment {
    /// The commitment text.
    pub text: String,
    /// Where this commitment came from.
    pub provenance: Provenance,
    /// When it was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// A record of a policy decision made while sanitizing a patch, persisted
/// alongside the state mutation it describes (§3, §7 `PolicyCheck`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyCheckRecord {
    /// What was checked, e.g. `"commitments_append"`.
    pub check: String,
    /// `"pass"` or `"fail"`.
    pub status: String,
    /// Human-readable detail, e.g. `"1 accepted"` or `"1 dropped"`.
    pub detail: String,
}

/// Communication bookkeeping for an opportunity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Comms {
    /// When the last chat summary was posted, if ever.
    pub last_chat_summary_at: Option<DateTime<Utc>>,
}

/// The canonical per-RFP state document. This, not chat history, is what
/// the agent trusts as truth across runs (§1, §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OpportunityState {
    /// Owning RFP id.
    pub rfp_id: String,
    /// Current stage, e.g. `"discovery"`, `"in-review"`, `"submitted"`.
    pub stage: String,
    /// Free-text running summary.
    pub summary: String,
    /// Named due dates (label → timestamp).
    pub due_dates: BTreeMap<String, DateTime<Utc>>,
    /// Proposal ids associated with this opportunity.
    pub proposal_ids: Vec<String>,
    /// Associated contracting case id, once one exists.
    pub contracting_case_id: Option<String>,
    /// Add-only list of durable commitments.
    pub commitments: Vec<Commitment>,
    /// Communication bookkeeping.
    pub comms: Comms,
    /// Freeform list of named risks.
    pub risks: Vec<String>,
    /// Freeform list of named owners.
    pub owners: Vec<String>,
    /// Monotonically increasing version, bumped on every mutation.
    pub version: u64,
    /// Last update timestamp. Monotonically non-decreasing (§3 invariant (b)).
    pub updated_at: DateTime<Utc>,
}

impl OpportunityState {
    /// Constructs the default state for an RFP with no prior history.
    pub fn default_for(rfp_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            rfp_id: rfp_id.into(),
            stage: "new".to_string(),
            summary: String::new(),
            due_dates: BTreeMap::new(),
            proposal_ids: Vec::new(),
            contracting_case_id: None,
            commitments: Vec::new(),
            comms: Comms::default(),
            risks: Vec::new(),
            owners: Vec::new(),
            version: 0,
            updated_at: now,
        }
    }

    /// Applies an already-sanitized patch, bumping `version` and advancing
    /// `updated_at` to `max(self.updated_at, now)` so the timestamp never
    /// moves backward even if `now` is supplied out of order.
    ///
    /// List `_append` fields on the patch are concatenated onto the
    /// existing arrays; everything else is a shallow overwrite-if-present
    /// merge. This satisfies the round-trip law in `spec.md` §8: applying
    /// `P1` then `P2` equals applying the merge of `P1` and `P2` for
    /// non-list keys and for list keys with disjoint inputs.
    pub fn apply_patch(&self, patch: &OpportunityPatch, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if let Some(stage) = &patch.stage {
            next.stage = stage.clone();
        }
        if let Some(summary) = &patch.summary {
            next.summary = summary.clone();
        }
        for (k, v) in &patch.due_dates_merge {
            next.due_dates.insert(k.clone(), *v);
        }
        next.proposal_ids.extend(patch.proposal_ids_append.iter().cloned());
        if let Some(case_id) = &patch.contracting_case_id {
            next.contracting_case_id = Some(case_id.clone());
        }
        next.commitments.extend(patch.sanitized_commitments_append.iter().cloned());
        if let Some(ts) = patch.last_chat_summary_at {
            next.comms.last_chat_summary_at = Some(ts);
        }
        next.risks.extend(patch.risks_append.iter().cloned());
        next.owners.extend(patch.owners_append.iter().cloned());
        next.version += 1;
        next.updated_at = next.updated_at.max(now);
        next
    }
}

/// A sanitized patch ready to apply via [`OpportunityState::apply_patch`].
/// Construct this only through `rfp-policy`'s `sanitize_opportunity_patch`,
/// which is the only place raw caller input should be converted into one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OpportunityPatch {
    /// Overwrite the stage.
    pub stage: Option<String>,
    /// Overwrite the summary.
    pub summary: Option<String>,
    /// Merge these named due dates into the existing map.
    pub due_dates_merge: BTreeMap<String, DateTime<Utc>>,
    /// Append these proposal ids.
    pub proposal_ids_append: Vec<String>,
    /// Overwrite the contracting case id.
    pub contracting_case_id: Option<String>,
    /// Commitments that survived sanitization and may be appended.
    pub sanitized_commitments_append: Vec<Commitment>,
    /// Overwrite the last-chat-summary timestamp.
    pub last_chat_summary_at: Option<DateTime<Utc>>,
    /// Append these risk notes.
    pub risks_append: Vec<String>,
    /// Append these owner names.
    pub owners_append: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prov() -> Provenance {
        Provenance {
            source: "slack_thread".into(),
            reference: Some("C1/T1".into()),
        }
    }

    #[test]
    fn default_state_has_zero_version_and_new_stage() {
        let now = Utc::now();
        let s = OpportunityState::default_for("r1", now);
        assert_eq!(s.version, 0);
        assert_eq!(s.stage, "new");
    }

    #[test]
    fn apply_patch_bumps_version_and_never_rewinds_updated_at() {
        let now = Utc::now();
        let s = OpportunityState::default_for("r1", now);
        let earlier = now - chrono::Duration::seconds(10);
        let patch = OpportunityPatch {
            stage: Some("in-review".into()),
            ..Default::default()
        };
        let next = s.apply_patch(&patch, earlier);
        assert_eq!(next.version, 1);
        assert_eq!(next.updated_at, now, "updated_at must not move backward");
        assert_eq!(next.stage, "in-review");
    }

    #[test]
    fn commitments_are_add_only_and_never_shrink() {
        let now = Utc::now();
        let s = OpportunityState::default_for("r1", now);
        let c = Commitment {
            text: "Deliver Jan 15".into(),
            provenance: prov(),
            recorded_at: now,
        };
        let patch = OpportunityPatch {
            sanitized_commitments_append: vec![c.clone()],
            ..Default::default()
        };
        let next = s.apply_patch(&patch, now);
        assert_eq!(next.commitments.len(), 1);
        let next2 = next.apply_patch(&OpportunityPatch::default(), now);
        assert_eq!(next2.commitments.len(), 1, "no-op patch must not shrink commitments");
    }

    #[test]
    fn sequential_patches_equal_merged_patch_for_disjoint_appends() {
        let now = Utc::now();
        let s = OpportunityState::default_for("r1", now);
        let p1 = OpportunityPatch {
            risks_append: vec!["scope creep".into()],
            ..Default::default()
        };
        let p2 = OpportunityPatch {
            risks_append: vec!["budget overrun".into()],
            ..Default::default()
        };
        let sequential = s.apply_patch(&p1, now).apply_patch(&p2, now);

        let merged = OpportunityPatch {
            risks_append: vec!["scope creep".into(), "budget overrun".into()],
            ..Default::default()
        };
        let via_merge = s.apply_patch(&merged, now);

        assert_eq!(sequential.risks, via_merge.risks);
    }
}
