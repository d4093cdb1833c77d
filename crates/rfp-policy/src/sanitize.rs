//! `sanitize_opportunity_patch`: the only place untrusted caller input is
//! converted into an [`OpportunityPatch`] (`spec.md` §4.3, `SPEC_FULL.md`
//! §3).
//!
//! A commitment survives iff it has a non-empty `text` (accepting the
//! `text`/`fact`/`commitment` aliases, canonicalized to `text` on write)
//! and a `provenance` object whose `source` (or `kind`) is a non-empty
//! string. Exactly one [`PolicyCheckRecord`] is appended per call that
//! touched `commitments_append`, naming the accepted and/or dropped counts.

use chrono::{DateTime, Utc};
use rfp_core::{Commitment, OpportunityPatch, PolicyCheckRecord, Provenance};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller-supplied provenance, accepting either `source` or the `kind` alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProvenance {
    /// Preferred field name.
    pub source: Option<String>,
    /// Legacy alias accepted in place of `source`.
    pub kind: Option<String>,
    /// Opaque reference, e.g. `"C1/T1"`.
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// One raw, not-yet-validated commitment from a caller's patch request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCommitment {
    /// Preferred field name for the commitment's text.
    pub text: Option<String>,
    /// Alias accepted in place of `text`.
    pub fact: Option<String>,
    /// Alias accepted in place of `text`.
    pub commitment: Option<String>,
    /// Provenance for this commitment.
    #[serde(default)]
    pub provenance: Option<RawProvenance>,
}

impl RawCommitment {
    fn resolved_text(&self) -> Option<&str> {
        [&self.text, &self.fact, &self.commitment]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }

    fn resolved_source(&self) -> Option<&str> {
        let p = self.provenance.as_ref()?;
        [&p.source, &p.kind]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.trim().is_empty())
    }
}

/// The raw, caller-supplied patch body before sanitization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawOpportunityPatch {
    /// Overwrite the stage.
    pub stage: Option<String>,
    /// Overwrite the summary.
    pub summary: Option<String>,
    /// Merge these named due dates into the existing map.
    #[serde(default)]
    pub due_dates_merge: BTreeMap<String, DateTime<Utc>>,
    /// Append these proposal ids.
    #[serde(default)]
    pub proposal_ids_append: Vec<String>,
    /// Overwrite the contracting case id.
    pub contracting_case_id: Option<String>,
    /// Raw commitments to validate and (maybe) append.
    #[serde(default)]
    pub commitments_append: Vec<RawCommitment>,
    /// Overwrite the last-chat-summary timestamp.
    pub last_chat_summary_at: Option<DateTime<Utc>>,
    /// Append these risk notes.
    #[serde(default)]
    pub risks_append: Vec<String>,
    /// Append these owner names.
    #[serde(default)]
    pub owners_append: Vec<String>,
    /// Arbitrary extra fields, preserved for forward compatibility but
    /// never applied; present so a caller's over-wide patch doesn't fail
    /// to parse.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// The result of sanitizing one raw patch: the safe patch to apply, plus
/// zero or one policy-check records to persist alongside it.
#[derive(Debug, Clone)]
pub struct SanitizedPatch {
    /// The patch with only validated commitments, ready to apply.
    pub patch: OpportunityPatch,
    /// Policy-check record(s) produced by this sanitization pass. At most
    /// one "pass" and one "fail" record per `commitments_append` batch.
    pub policy_checks: Vec<PolicyCheckRecord>,
}

/// Sanitize a raw caller patch: validate and canonicalize commitments,
/// drop the ones lacking text or provenance, and record the outcome.
pub fn sanitize_opportunity_patch(raw: RawOpportunityPatch, now: DateTime<Utc>) -> SanitizedPatch {
    let mut accepted = Vec::new();
    let mut dropped = 0usize;

    for raw_commitment in &raw.commitments_append {
        match (raw_commitment.resolved_text(), raw_commitment.resolved_source()) {
            (Some(text), Some(source)) => {
                accepted.push(Commitment {
                    text: text.to_string(),
                    provenance: Provenance {
                        source: source.to_string(),
                        reference: raw_commitment
                            .provenance
                            .as_ref()
                            .and_then(|p| p.reference.clone()),
                    },
                    recorded_at: now,
                });
            }
            _ => dropped += 1,
        }
    }

    let mut policy_checks = Vec::new();
    if !raw.commitments_append.is_empty() {
        if !accepted.is_empty() {
            policy_checks.push(PolicyCheckRecord {
                check: "commitments_append".to_string(),
                status: "pass".to_string(),
                detail: format!("{} accepted", accepted.len()),
            });
        }
        if dropped > 0 {
            policy_checks.push(PolicyCheckRecord {
                check: "commitments_append".to_string(),
                status: "fail".to_string(),
                detail: format!("{dropped} dropped"),
            });
        }
    }

    let patch = OpportunityPatch {
        stage: raw.stage,
        summary: raw.summary,
        due_dates_merge: raw.due_dates_merge,
        proposal_ids_append: raw.proposal_ids_append,
        contracting_case_id: raw.contracting_case_id,
        sanitized_commitments_append: accepted,
        last_chat_summary_at: raw.last_chat_summary_at,
        risks_append: raw.risks_append,
        owners_append: raw.owners_append,
    };

    SanitizedPatch {
        patch,
        policy_checks,
    }
}
