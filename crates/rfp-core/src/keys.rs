//! `(pk, sk)` and `(gsi1pk, gsi1sk)` key conventions for the single wide
//! table described in `spec.md` §3. Centralizing key construction here
//! means every repository crate builds keys the same way instead of
//! re-deriving the string format ad hoc.

use chrono::{DateTime, Utc};

/// Primary key for an RFP profile row: `RFP#{id}`.
pub fn rfp_pk(rfp_id: &str) -> String {
    format!("RFP#{rfp_id}")
}

/// Sort key for an RFP profile row.
pub const RFP_PROFILE_SK: &str = "PROFILE";

/// GSI1 partition for time-ordered RFP listings.
pub const RFP_LISTING_GSI1PK: &str = "TYPE#RFP";

/// GSI1 sort key for a time-ordered RFP listing row.
pub fn rfp_listing_gsi1sk(created_at: DateTime<Utc>, rfp_id: &str) -> String {
    format!("{}#{rfp_id}", created_at.to_rfc3339())
}

/// Primary key for a proposal row: `PROPOSAL#{id}`.
pub fn proposal_pk(proposal_id: &str) -> String {
    format!("PROPOSAL#{proposal_id}")
}

/// Sort key for a proposal profile row.
pub const PROPOSAL_PROFILE_SK: &str = "PROFILE";

/// Sort key for a paged proposal section.
pub fn proposal_section_sk(key: &str) -> String {
    format!("SECTION#{key}")
}

/// GSI1 partition for time-ordered proposal listings.
pub const PROPOSAL_LISTING_GSI1PK: &str = "TYPE#PROPOSAL";

/// GSI1 sort key for a time-ordered proposal listing row.
pub fn proposal_listing_gsi1sk(created_at: DateTime<Utc>, proposal_id: &str) -> String {
    format!("{}#{proposal_id}", created_at.to_rfc3339())
}

/// Primary key for a contracting case: `CONTRACTING#{id}`.
pub fn contracting_pk(case_id: &str) -> String {
    format!("CONTRACTING#{case_id}")
}

/// Sort key for a contracting case profile row.
pub const CONTRACTING_PROFILE_SK: &str = "PROFILE";

/// Sort key for a contract document version under a contracting case.
pub fn contract_doc_sk(version: u32) -> String {
    format!("CONTRACT_DOC#{version}")
}

/// Sort key for a budget version under a contracting case.
pub fn budget_sk(version: u32) -> String {
    format!("BUDGET#{version}")
}

/// Sort key for a support document under a contracting case.
pub fn support_doc_sk(doc_id: &str) -> String {
    format!("SUPPORT_DOC#{doc_id}")
}

/// Sort key for a package under a contracting case.
pub fn package_sk(package_id: &str) -> String {
    format!("PACKAGE#{package_id}")
}

/// Sort key for an e-sign envelope under a contracting case.
pub fn esign_sk(esign_id: &str) -> String {
    format!("ESIGN#{esign_id}")
}

/// GSI1 partition grouping contracting cases by the proposal they came from.
pub fn proposal_contracting_gsi1pk(proposal_id: &str) -> String {
    format!("PROPOSAL_CONTRACTING#{proposal_id}")
}

/// GSI1 partition grouping a contracting case by its hashed portal token.
pub fn portal_token_gsi1pk(token_hash: &str) -> String {
    format!("PORTAL_TOKEN#{token_hash}")
}

/// Primary key for a contract template: `CONTRACT_TEMPLATE#{id}`.
pub fn contract_template_pk(template_id: &str) -> String {
    format!("CONTRACT_TEMPLATE#{template_id}")
}

/// Sort key for a contract template profile row (points at the current version).
pub const CONTRACT_TEMPLATE_PROFILE_SK: &str = "PROFILE";

/// Sort key for a specific contract template version.
pub fn contract_template_version_sk(version: u32) -> String {
    format!("VERSION#{version}")
}

/// Primary key for an opportunity state row: `RFP#{id}` (shares the RFP's
/// partition; distinguished by sort key).
pub fn opportunity_pk(rfp_id: &str) -> String {
    rfp_pk(rfp_id)
}

/// Sort key for the opportunity state row.
pub const OPPORTUNITY_STATE_SK: &str = "OPPORTUNITY_STATE";

/// Primary key for an RFP's journal partition: `RFP#{id}#JOURNAL`.
pub fn journal_pk(rfp_id: &str) -> String {
    format!("RFP#{rfp_id}#JOURNAL")
}

/// Primary key for an RFP's event log partition: `RFP#{id}#EVENTS`.
pub fn event_pk(rfp_id: &str) -> String {
    format!("RFP#{rfp_id}#EVENTS")
}

/// Primary key for a thread binding: `THREAD#{channel_id}#{thread_ts}`.
pub fn thread_binding_pk(channel_id: &str, thread_ts: &str) -> String {
    format!("THREAD#{channel_id}#{thread_ts}")
}

/// Sort key for a thread binding row.
pub const THREAD_BINDING_SK: &str = "BINDING";

/// Primary key for a change proposal: `CHANGE_PROPOSAL#{id}`.
pub fn change_proposal_pk(change_proposal_id: &str) -> String {
    format!("CHANGE_PROPOSAL#{change_proposal_id}")
}

/// Primary key for an agent job: `JOB#{id}`.
pub fn job_pk(job_id: &str) -> String {
    format!("JOB#{job_id}")
}

/// Sort key for an agent job profile row.
pub const JOB_PROFILE_SK: &str = "PROFILE";

/// GSI1 partition grouping jobs scoped to a contracting case.
pub fn case_jobs_gsi1pk(case_id: &str) -> String {
    format!("CASE_JOBS#{case_id}")
}

/// GSI1 partition for time-ordered due-job polling, so a worker can find
/// queued work with a single fixed-partition query.
pub const DUE_JOBS_GSI1PK: &str = "DUE_JOBS";

/// GSI1 sort key for a due-job row, ordered by `due_at` so ascending scans
/// surface the soonest-due job first.
pub fn due_jobs_gsi1sk(due_at: DateTime<Utc>, job_id: &str) -> String {
    format!("{}#{job_id}", due_at.to_rfc3339())
}

/// Primary key for an idempotency record: `IDEMPOTENCY#{sha256_hex}`.
pub fn idempotency_pk(sha256_hex: &str) -> String {
    format!("IDEMPOTENCY#{sha256_hex}")
}

/// Sort key for an idempotency record row.
pub const IDEMPOTENCY_SK: &str = "PROFILE";

/// Primary key for an agent checkpoint: `CHECKPOINT#{rfp_id}#{job_id}`.
pub fn checkpoint_pk(rfp_id: &str, job_id: &str) -> String {
    format!("CHECKPOINT#{rfp_id}#{job_id}")
}

/// Sort key for a checkpoint at a given sequence number, highest-first when
/// sorted descending so "latest" is a single-item query.
pub fn checkpoint_sk(sequence: u64) -> String {
    format!("SEQ#{sequence:020}")
}

/// Primary key for a scope+type memory partition: `MEM#{scope_id}#{type}`.
/// Individual memories are addressed within this partition by
/// [`memory_sk`], so a scoped listing is a single partition query.
pub fn memory_pk(scope_id: &str, memory_type: &str) -> String {
    format!("MEM#{scope_id}#{memory_type}")
}

/// Sort key for one memory row. `memory_id` is expected to be a
/// timestamp-prefixed id (see `rfp_core::sortable_id`) so that the default
/// scan order is creation order.
pub fn memory_sk(memory_id: &str) -> String {
    format!("MEM#{memory_id}")
}

/// Primary key for the partition of relationship edges originating at
/// `from_id`. Individual edges are addressed within it by [`relationship_sk`]
/// so listing a memory's outgoing edges is a single partition query.
pub fn relationship_pk(from_id: &str) -> String {
    format!("REL#{from_id}")
}

/// Sort key for one outgoing relationship edge: `TO#{to_id}`.
pub fn relationship_sk(to_id: &str) -> String {
    format!("TO#{to_id}")
}

/// Scope id for a user-owned memory: `USER#{sub}`.
pub fn user_scope(sub: &str) -> String {
    format!("USER#{sub}")
}

/// Scope id for an RFP-owned memory: `RFP#{id}`.
pub fn rfp_scope(rfp_id: &str) -> String {
    format!("RFP#{rfp_id}")
}

/// The global memory scope.
pub const GLOBAL_SCOPE: &str = "GLOBAL";

/// Primary key for a skill index row: `SKILL#{id}`.
pub fn skill_pk(skill_id: &str) -> String {
    format!("SKILL#{skill_id}")
}

/// Primary key for a keyword index partition: `KEYWORD#{scope_id}#{keyword}`.
pub fn keyword_index_pk(scope_id: &str, keyword: &str) -> String {
    format!("KEYWORD#{scope_id}#{keyword}")
}

/// Sort key for a keyword index row pointing at one memory.
pub fn keyword_index_sk(memory_id: &str) -> String {
    format!("MEM#{memory_id}")
}

/// Primary key for a cached external-context fetch:
/// `EXTCTX#{source}#{sha256(query ++ params)}`.
pub fn external_context_pk(source: &str, cache_digest: &str) -> String {
    format!("EXTCTX#{source}#{cache_digest}")
}

/// Sort key for a cached external-context row.
pub const EXTERNAL_CONTEXT_SK: &str = "CACHE";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfp_keys_round_trip_id() {
        assert_eq!(rfp_pk("abc123"), "RFP#abc123");
        assert_eq!(opportunity_pk("abc123"), rfp_pk("abc123"));
    }

    #[test]
    fn journal_and_event_partitions_are_distinct() {
        assert_ne!(journal_pk("r1"), event_pk("r1"));
        assert_ne!(journal_pk("r1"), rfp_pk("r1"));
    }

    #[test]
    fn checkpoint_sk_sorts_numerically_as_strings() {
        assert!(checkpoint_sk(2) < checkpoint_sk(10));
        assert!(checkpoint_sk(9) < checkpoint_sk(10));
    }
}
