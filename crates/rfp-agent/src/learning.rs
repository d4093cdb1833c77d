//! Post-turn learning hooks: episodic memory, collaboration detection,
//! temporal event extraction, and relationship linking (`spec.md` §4.7,
//! step 8 "Learning"). Collaboration detection is grounded on the
//! `_detect_and_store_collaboration` keyword-bucket classifier: at least
//! two distinct non-bot thread participants must be present before a
//! `CollaborationContext` memory is worth recording.

use chrono::{DateTime, Utc};
use rfp_core::memory::{MemoryProvenance, MemoryType, RelationshipType};
use rfp_core::Memory;
use rfp_error::RfpError;
use rfp_memory::{add_temporal_event_memory, MemoryRepo, RelationshipStore};
use std::collections::BTreeMap;

/// Records a conversation turn as an episodic memory.
pub async fn record_episodic(memory: &MemoryRepo, scope_id: &str, user_message: &str, agent_response: &str, now: DateTime<Utc>) -> Result<Memory, RfpError> {
    let content = format!("User: {user_message}\nAgent: {agent_response}");
    memory
        .create_memory(MemoryType::Episodic, scope_id, &content, Vec::new(), BTreeMap::new(), MemoryProvenance { kind: "agent_turn".to_string(), reference: None }, None, now)
        .await
}

/// One bucket in the collaboration-type keyword ladder, checked in order;
/// the first bucket with a hit wins.
const COLLABORATION_BUCKETS: &[(&str, &[&str])] = &[
    ("review", &["review", "feedback", "approve", "comment"]),
    ("decision_making", &["decision", "decide", "choose", "select"]),
    ("design_session", &["design", "plan", "architecture"]),
    ("code_collaboration", &["code", "implement", "develop"]),
];

fn classify_collaboration_type(user_message: &str, agent_response: &str) -> &'static str {
    let combined = format!("{user_message} {agent_response}").to_lowercase();
    for (label, keywords) in COLLABORATION_BUCKETS {
        if keywords.iter().any(|kw| combined.contains(kw)) {
            return label;
        }
    }
    "discussion"
}

/// Records a `CollaborationContext` memory if at least two distinct
/// participant ids took part in this thread, else does nothing.
pub async fn detect_and_record_collaboration(
    memory: &MemoryRepo,
    scope_id: &str,
    participant_ids: &[String],
    user_message: &str,
    agent_response: &str,
    now: DateTime<Utc>,
) -> Result<Option<Memory>, RfpError> {
    let mut unique: Vec<&String> = Vec::new();
    for id in participant_ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    if unique.len() < 2 {
        return Ok(None);
    }

    let collaboration_type = classify_collaboration_type(user_message, agent_response);
    let mut metadata = BTreeMap::new();
    metadata.insert("collaborationType".to_string(), serde_json::json!(collaboration_type));
    metadata.insert("participants".to_string(), serde_json::json!(unique));

    let content = format!("{collaboration_type} among {}: {user_message}", unique.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "));
    let created = memory
        .create_memory(
            MemoryType::CollaborationContext,
            scope_id,
            &content,
            vec![collaboration_type.to_string()],
            metadata,
            MemoryProvenance { kind: "thread".to_string(), reference: None },
            None,
            now,
        )
        .await?;
    Ok(Some(created))
}

const DEADLINE_KEYWORDS: &[&str] = &["deadline", "due", "submit by", "due by"];
const MEETING_KEYWORDS: &[&str] = &["meeting", "call", "sync", "kickoff", "standup"];

/// Extracts a `TemporalEvent` memory if `text` both mentions an ISO-8601
/// date (`YYYY-MM-DD`) and a deadline/meeting keyword; a bare date with no
/// such keyword is too likely a false positive to record.
pub async fn extract_temporal_event(memory: &MemoryRepo, scope_id: &str, text: &str, now: DateTime<Utc>) -> Result<Option<Memory>, RfpError> {
    let Some(date) = find_iso_date(text) else { return Ok(None) };
    let lower = text.to_lowercase();
    let event_type = if DEADLINE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Some("deadline")
    } else if MEETING_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Some("meeting")
    } else {
        None
    };
    let Some(event_type) = event_type else { return Ok(None) };

    let event_at = date.and_hms_opt(9, 0, 0).expect("9:00:00 is always a valid time").and_utc();
    let created = add_temporal_event_memory(memory, scope_id, text, event_at, Some(event_type), now).await?;
    Ok(Some(created))
}

fn find_iso_date(text: &str) -> Option<chrono::NaiveDate> {
    for word in text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')')) {
        if word.len() == 10 && word.as_bytes().get(4) == Some(&b'-') && word.as_bytes().get(7) == Some(&b'-') {
            if let Ok(date) = chrono::NaiveDate::parse_from_str(word, "%Y-%m-%d") {
                return Some(date);
            }
        }
    }
    None
}

/// Links an episodic memory to the RFP/collaboration/temporal memories
/// surfaced in the same turn.
pub async fn link_related(relationships: &RelationshipStore, memory: &MemoryRepo, scope_id: &str, episodic: &Memory, related: &[(&Memory, RelationshipType)], now: DateTime<Utc>) -> Result<(), RfpError> {
    for (target, relationship_type) in related {
        relationships
            .add_relationship(memory, scope_id, &episodic.id, MemoryType::Episodic, &target.id, target.memory_type, *relationship_type, false, now)
            .await?;
    }
    Ok(())
}

/// Records a procedural memory summarizing whether a tool sequence
/// succeeded, once the turn used at least 3 tool calls (a turn that used
/// fewer didn't exercise enough of a "procedure" to be worth recalling).
pub async fn record_procedural_outcome(memory: &MemoryRepo, scope_id: &str, tool_sequence: &[String], success: bool, outcome: &str, now: DateTime<Utc>) -> Result<Option<Memory>, RfpError> {
    if tool_sequence.len() < 3 {
        return Ok(None);
    }
    let mut metadata = BTreeMap::new();
    metadata.insert("toolSequence".to_string(), serde_json::json!(tool_sequence));
    metadata.insert("success".to_string(), serde_json::json!(success));
    let created = memory
        .create_memory(MemoryType::Procedural, scope_id, outcome, Vec::new(), metadata, MemoryProvenance { kind: "agent_loop".to_string(), reference: None }, Some(outcome.to_string()), now)
        .await?;
    Ok(Some(created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;

    #[tokio::test]
    async fn collaboration_is_not_recorded_for_a_single_participant() {
        let memory = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let result = detect_and_record_collaboration(&memory, "RFP#r1", &["U1".to_string()], "let's review this", "sure", now).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn collaboration_is_recorded_and_classified_for_two_participants() {
        let memory = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let result = detect_and_record_collaboration(&memory, "RFP#r1", &["U1".to_string(), "U2".to_string()], "can we review this draft?", "sure, looks good", now)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.metadata.get("collaborationType").unwrap(), &serde_json::json!("review"));
    }

    #[tokio::test]
    async fn extracts_a_deadline_when_a_date_and_keyword_are_both_present() {
        let memory = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let result = extract_temporal_event(&memory, "RFP#r1", "the submission deadline is 2026-09-01, don't miss it", now).await.unwrap();
        assert!(result.is_some());
    }

    #[tokio::test]
    async fn a_bare_date_with_no_keyword_is_not_extracted() {
        let memory = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let result = extract_temporal_event(&memory, "RFP#r1", "we last spoke on 2026-01-01", now).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn procedural_outcome_is_skipped_for_short_tool_sequences() {
        let memory = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let result = record_procedural_outcome(&memory, "RFP#r1", &["opportunity_load".to_string()], true, "done", now).await.unwrap();
        assert!(result.is_none());
    }
}
