//! Durable data model for the RFP operator platform.
//!
//! Every row that crosses the single wide `(pk, sk)` key-value table
//! described in `spec.md` §3 is defined here: [`Rfp`], [`Proposal`],
//! [`ContractingCase`], [`ContractTemplate`], [`OpportunityState`],
//! [`JournalEntry`], [`EventLogEntry`], [`ThreadBinding`], [`ChangeProposal`],
//! [`AgentJob`], [`AgentCheckpoint`], [`Memory`], and [`MemoryRelationship`].
//!
//! If you only take one dependency from this workspace, take this one.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Thread binding (channel, thread) → rfp_id.
pub mod binding;
/// Change proposals: stored patches awaiting approval-gated PRs.
pub mod change_proposal;
/// Contracting cases and versioned contract templates.
pub mod contracting;
/// Append-only, hash-chained event log entries.
pub mod event;
/// Append-only journal entries.
pub mod journal;
/// Background jobs, idempotency records, and checkpoints.
pub mod job;
/// `(pk, sk)` / `(gsi1pk, gsi1sk)` key conventions.
pub mod keys;
/// Typed memories and relationship edges.
pub mod memory;
/// Per-RFP canonical opportunity state.
pub mod opportunity;
/// Proposals and their sections.
pub mod proposal;
/// RFP profile rows.
pub mod rfp;
/// Skill index metadata rows.
pub mod skill;

pub use binding::ThreadBinding;
pub use change_proposal::ChangeProposal;
pub use contracting::{ContractTemplate, ContractTemplateVersion, ContractingCase};
pub use event::EventLogEntry;
pub use job::{AgentCheckpoint, AgentJob, IdempotencyRecord, JobStatus};
pub use journal::JournalEntry;
pub use memory::{Memory, MemoryProvenance, MemoryRelationship, MemoryType, RelationshipType};
pub use opportunity::{Commitment, OpportunityPatch, OpportunityState, PolicyCheckRecord, Provenance};
pub use proposal::{Proposal, ProposalSection};
pub use rfp::Rfp;
pub use skill::SkillIndex;

use chrono::{DateTime, Utc};

/// Returns the current instant. Centralized so call sites read as
/// intentional about wall-clock use rather than scattering `Utc::now()`.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// A lexicographically sortable, timestamp-prefixed unique id, used for
/// journal and event-log sort keys (`sk = <ts>#<id>`). Ordering comes from
/// the timestamp prefix; the UUID suffix only needs to be unique.
pub fn sortable_id(ts: DateTime<Utc>) -> String {
    format!(
        "{}#{}",
        ts.format("%Y%m%dT%H%M%S%.6fZ"),
        uuid::Uuid::new_v4()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sortable_id_orders_by_timestamp() {
        let t1 = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2026-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(sortable_id(t1) < sortable_id(t2));
    }
}
