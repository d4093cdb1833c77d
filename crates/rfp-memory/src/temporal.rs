//! Temporal event memories: dated events surfaced ahead of time (`spec.md`
//! §4.10, "temporal_event").

use crate::repo::MemoryRepo;
use chrono::{DateTime, Utc};
use rfp_core::{Memory, MemoryProvenance, MemoryType};
use rfp_error::RfpError;
use std::collections::BTreeMap;

/// Records a dated event as a `TemporalEvent` memory, tagging it
/// `"upcoming"` or `"past"` relative to `now` and stashing `event_at` (and
/// `event_type`, if given) in metadata so [`get_upcoming_events`] can filter
/// without re-parsing content.
pub async fn add_temporal_event_memory(
    memories: &MemoryRepo,
    scope_id: &str,
    content: &str,
    event_at: DateTime<Utc>,
    event_type: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Memory, RfpError> {
    let mut metadata = BTreeMap::new();
    metadata.insert("eventAt".to_string(), serde_json::json!(event_at.to_rfc3339()));
    if let Some(event_type) = event_type {
        metadata.insert("eventType".to_string(), serde_json::json!(event_type));
    }

    let tag = if event_at >= now { "upcoming" } else { "past" };
    let tags = vec![tag.to_string()];

    memories
        .create_memory(MemoryType::TemporalEvent, scope_id, content, tags, metadata, MemoryProvenance::default(), None, now)
        .await
}

fn event_at(memory: &Memory) -> Option<DateTime<Utc>> {
    memory
        .metadata
        .get("eventAt")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Returns temporal-event memories in `scope_id` whose `eventAt` falls
/// within `[now, now + days_ahead]`, soonest first.
pub async fn get_upcoming_events(memories: &MemoryRepo, scope_id: &str, days_ahead: i64, limit: usize, now: DateTime<Utc>) -> Result<Vec<Memory>, RfpError> {
    let horizon = now + chrono::Duration::days(days_ahead);
    let mut candidates: Vec<Memory> = memories
        .list_by_scope(scope_id, MemoryType::TemporalEvent, 500, now)
        .await?
        .into_iter()
        .filter(|m| matches!(event_at(m), Some(at) if at >= now && at <= horizon))
        .collect();
    candidates.sort_by_key(|m| event_at(m).unwrap_or(now));
    candidates.truncate(limit);
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;

    #[tokio::test]
    async fn upcoming_events_excludes_past_and_far_future() {
        let memories = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = Utc::now();

        add_temporal_event_memory(&memories, "RFP#r1", "kickoff call", now + chrono::Duration::days(2), Some("call"), now)
            .await
            .unwrap();
        add_temporal_event_memory(&memories, "RFP#r1", "submission deadline", now + chrono::Duration::days(30), Some("deadline"), now)
            .await
            .unwrap();
        add_temporal_event_memory(&memories, "RFP#r1", "old standup", now - chrono::Duration::days(1), Some("standup"), now)
            .await
            .unwrap();

        let upcoming = get_upcoming_events(&memories, "RFP#r1", 7, 10, now).await.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].content, "kickoff call");
    }

    #[tokio::test]
    async fn tags_past_events_correctly() {
        let memories = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = Utc::now();
        let memory = add_temporal_event_memory(&memories, "RFP#r1", "already happened", now - chrono::Duration::days(3), None, now)
            .await
            .unwrap();
        assert!(memory.tags.contains(&"past".to_string()));
    }
}
