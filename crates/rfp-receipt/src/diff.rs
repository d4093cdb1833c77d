//! Field-level diff of [`OpportunityState`] snapshots (`spec.md` §3
//! invariant: a durable mutation "may snapshot the pre-state").
//!
//! Used when recording an event-log or journal entry that wants a compact
//! description of what a patch actually changed, rather than the full
//! before/after documents.

use rfp_core::OpportunityState;
use serde::{Deserialize, Serialize};

/// One changed field between two [`OpportunityState`] snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Name of the changed field.
    pub field: String,
    /// Value before, rendered with `Debug` (state fields are not all
    /// `Display`, and this is for audit logs, not end-user text).
    pub before: String,
    /// Value after.
    pub after: String,
}

/// Diffs two opportunity states field by field, returning only the fields
/// that changed. `commitments` and `due_dates` are append/merge-only in
/// practice, so they are reported by count rather than full content to
/// keep entries bounded.
pub fn diff_opportunity_state(before: &OpportunityState, after: &OpportunityState) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    macro_rules! field {
        ($name:literal, $a:expr, $b:expr) => {
            if $a != $b {
                changes.push(FieldChange {
                    field: $name.to_string(),
                    before: format!("{:?}", $a),
                    after: format!("{:?}", $b),
                });
            }
        };
    }

    field!("stage", before.stage, after.stage);
    field!("summary", before.summary, after.summary);
    field!("contracting_case_id", before.contracting_case_id, after.contracting_case_id);
    field!(
        "comms.last_chat_summary_at",
        before.comms.last_chat_summary_at,
        after.comms.last_chat_summary_at
    );

    if before.due_dates.len() != after.due_dates.len() {
        changes.push(FieldChange {
            field: "due_dates".to_string(),
            before: format!("{} entries", before.due_dates.len()),
            after: format!("{} entries", after.due_dates.len()),
        });
    }
    if before.proposal_ids.len() != after.proposal_ids.len() {
        changes.push(FieldChange {
            field: "proposal_ids".to_string(),
            before: format!("{} entries", before.proposal_ids.len()),
            after: format!("{} entries", after.proposal_ids.len()),
        });
    }
    if before.commitments.len() != after.commitments.len() {
        changes.push(FieldChange {
            field: "commitments".to_string(),
            before: format!("{} entries", before.commitments.len()),
            after: format!("{} entries", after.commitments.len()),
        });
    }
    if before.risks.len() != after.risks.len() {
        changes.push(FieldChange {
            field: "risks".to_string(),
            before: format!("{} entries", before.risks.len()),
            after: format!("{} entries", after.risks.len()),
        });
    }
    if before.owners.len() != after.owners.len() {
        changes.push(FieldChange {
            field: "owners".to_string(),
            before: format!("{} entries", before.owners.len()),
            after: format!("{} entries", after.owners.len()),
        });
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn identical_states_diff_to_nothing() {
        let s = OpportunityState::default_for("r1", Utc::now());
        assert!(diff_opportunity_state(&s, &s).is_empty());
    }

    #[test]
    fn stage_change_is_reported() {
        let before = OpportunityState::default_for("r1", Utc::now());
        let mut after = before.clone();
        after.stage = "in-review".to_string();
        let changes = diff_opportunity_state(&before, &after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "stage");
    }

    #[test]
    fn appended_commitment_is_reported_by_count_not_content() {
        let before = OpportunityState::default_for("r1", Utc::now());
        let mut after = before.clone();
        after.commitments.push(rfp_core::Commitment {
            text: "ship by Friday".to_string(),
            provenance: rfp_core::Provenance {
                source: "slack_thread".to_string(),
                reference: None,
            },
            recorded_at: Utc::now(),
        });
        let changes = diff_opportunity_state(&before, &after);
        let commitments_change = changes.iter().find(|c| c.field == "commitments").unwrap();
        assert_eq!(commitments_change.before, "0 entries");
        assert_eq!(commitments_change.after, "1 entries");
    }
}
