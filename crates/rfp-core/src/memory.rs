//! Typed memories and relationship edges (`spec.md` §3, "Memory", §4.10).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The kind of a memory row, per `spec.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryType {
    /// A conversation turn.
    Episodic,
    /// A fact or preference.
    Semantic,
    /// A tool sequence and its outcome.
    Procedural,
    /// An event with a specific date/time.
    TemporalEvent,
    /// Context about a multi-participant collaboration.
    CollaborationContext,
    /// External (news/weather/research/geo) context.
    ExternalContext,
}

impl MemoryType {
    /// The wire tag used in `pk=MEM#{scopeId}#{type}#{id}`.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Episodic => "EPISODIC",
            Self::Semantic => "SEMANTIC",
            Self::Procedural => "PROCEDURAL",
            Self::TemporalEvent => "TEMPORAL_EVENT",
            Self::CollaborationContext => "COLLABORATION_CONTEXT",
            Self::ExternalContext => "EXTERNAL_CONTEXT",
        }
    }
}

/// Where a memory's content came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MemoryProvenance {
    /// Provenance kind, e.g. `"cognito"`, `"slack"`, `"api"`.
    pub kind: String,
    /// Opaque reference into that source.
    pub reference: Option<String>,
}

/// A typed memory row: `pk=MEM#{scopeId}#{type}#{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Memory {
    /// Stable memory id.
    pub id: String,
    /// The kind of memory this is.
    pub memory_type: MemoryType,
    /// Scope this memory belongs to: `USER#{sub}`, `RFP#{id}`, or `GLOBAL`.
    pub scope_id: String,
    /// Full content.
    pub content: String,
    /// Short summary, used in context assembly and compression.
    pub summary: Option<String>,
    /// Free-text tags.
    pub tags: Vec<String>,
    /// Extracted keywords, used by the keyword index.
    pub keywords: Vec<String>,
    /// Arbitrary typed metadata (e.g. `toolSequence` for procedural
    /// memories, `eventAt`/`eventType` for temporal memories).
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Where this memory's content came from.
    pub provenance: MemoryProvenance,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Number of times this memory has been retrieved.
    pub access_count: u64,
    /// Last retrieval timestamp.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// TTL expiry, set on compressed-away originals (7 days out) so the
    /// store can reap them.
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether this memory is the output of a compression pass.
    pub compressed: bool,
    /// If `compressed`, the ids of the memories it replaced.
    pub original_memory_ids: Vec<String>,
    /// An importance score in `[0.0, 1.0]`, used by compression to pick
    /// candidates (§4.10, §9 open question (c)).
    pub importance: Option<f64>,
}

impl Memory {
    /// Constructs a new, uncompressed memory with zero access count.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        memory_type: MemoryType,
        scope_id: impl Into<String>,
        content: impl Into<String>,
        provenance: MemoryProvenance,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            memory_type,
            scope_id: scope_id.into(),
            content: content.into(),
            summary: None,
            tags: Vec::new(),
            keywords: Vec::new(),
            metadata: BTreeMap::new(),
            provenance,
            created_at,
            access_count: 0,
            last_accessed_at: None,
            expires_at: None,
            compressed: false,
            original_memory_ids: Vec::new(),
            importance: None,
        }
    }

    /// Records a retrieval, bumping `access_count` and `last_accessed_at`.
    pub fn record_access(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.access_count += 1;
        next.last_accessed_at = Some(now);
        next
    }

    /// Whether this memory is past its TTL, if it has one.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// A relationship type between two memories (`spec.md` §3, §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    /// `from` is part of `to`.
    PartOf,
    /// `from` happened before `to` in a sequence.
    TemporalSequence,
    /// `from` was caused by `to`.
    CausedBy,
    /// `from` supersedes `to`.
    Supersedes,
    /// `from` references `to`.
    References,
    /// `from` contradicts `to`.
    Contradicts,
}

/// A directed edge between two memories: `pk=REL#{fromId}#{toId}`. Memory
/// relationships are the only cyclic structure in this data model and are
/// represented as edges, never as in-memory pointers (§3 "Ownership").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MemoryRelationship {
    /// Source memory id.
    pub from_id: String,
    /// Target memory id.
    pub to_id: String,
    /// The relationship type.
    pub relationship_type: RelationshipType,
    /// Whether the inverse edge should also be considered present.
    pub bidirectional: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_tag_round_trips_expected_strings() {
        assert_eq!(MemoryType::Episodic.tag(), "EPISODIC");
        assert_eq!(MemoryType::TemporalEvent.tag(), "TEMPORAL_EVENT");
    }

    #[test]
    fn record_access_increments_count() {
        let now = Utc::now();
        let m = Memory::new("m1", MemoryType::Semantic, "USER#u1", "likes short replies", MemoryProvenance::default(), now);
        let m2 = m.record_access(now);
        assert_eq!(m2.access_count, 1);
        assert_eq!(m.access_count, 0);
    }

    #[test]
    fn is_expired_respects_ttl() {
        let now = Utc::now();
        let mut m = Memory::new("m1", MemoryType::Episodic, "GLOBAL", "c", MemoryProvenance::default(), now);
        assert!(!m.is_expired(now));
        m.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(m.is_expired(now));
    }
}
