//! Memory creation, retrieval, and the keyword index (`spec.md` §4.10).

use crate::keywords::extract_keywords;
use chrono::{DateTime, Utc};
use rfp_core::{Memory, MemoryProvenance, MemoryType};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_EXTRACTED_KEYWORDS: usize = 30;

fn to_item(key: ItemKey, value: &impl serde::Serialize) -> Result<Item, RfpError> {
    Ok(Item {
        key,
        gsi1pk: None,
        gsi1sk: None,
        attributes: serde_json::to_value(value)
            .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize item: {e}")))?,
    })
}

fn from_item<T: serde::de::DeserializeOwned>(item: Item) -> Result<T, RfpError> {
    serde_json::from_value(item.attributes)
        .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize item: {e}")))
}

fn memory_key(scope_id: &str, memory_type: MemoryType, memory_id: &str) -> ItemKey {
    ItemKey::new(rfp_core::keys::memory_pk(scope_id, memory_type.tag()), rfp_core::keys::memory_sk(memory_id))
}

/// Whether `memory` should still surface from retrieval. Originals marked
/// for compression-driven expiry disappear immediately (matching their
/// removal from the keyword index), not only once their TTL elapses; any
/// memory past its own `expires_at` (the compressed summary included, once
/// its longer TTL passes) disappears too.
fn is_retrievable(memory: &Memory, now: DateTime<Utc>) -> bool {
    if memory.expires_at.is_some() && !memory.compressed {
        return false;
    }
    !memory.is_expired(now)
}

/// Repository over typed memory rows and the keyword index that backs
/// query-aware retrieval.
pub struct MemoryRepo {
    store: Arc<dyn KeyValueStore>,
}

impl MemoryRepo {
    /// Construct a repo backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Writes a new memory and indexes its extracted keywords. The memory's
    /// `id` is generated here (a timestamp-prefixed id, so scoped listings
    /// come back in creation order without extra bookkeeping).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_memory(
        &self,
        memory_type: MemoryType,
        scope_id: &str,
        content: &str,
        tags: Vec<String>,
        metadata: BTreeMap<String, serde_json::Value>,
        provenance: MemoryProvenance,
        summary: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Memory, RfpError> {
        let id = rfp_core::sortable_id(now);
        let keywords = extract_keywords(content, MAX_EXTRACTED_KEYWORDS);
        let mut memory = Memory::new(id, memory_type, scope_id, content, provenance, now);
        memory.tags = tags;
        memory.keywords = keywords.clone();
        memory.metadata = metadata;
        memory.summary = summary;

        let item = to_item(memory_key(scope_id, memory_type, &memory.id), &memory)?;
        self.store.put(item, Some(Condition::NotExists)).await?;

        for keyword in &keywords {
            self.index_keyword(scope_id, keyword, &memory.id).await?;
        }

        tracing::debug!(target: "rfp.memory", scope_id, memory_id = %memory.id, keyword_count = keywords.len(), "memory_created");
        Ok(memory)
    }

    async fn index_keyword(&self, scope_id: &str, keyword: &str, memory_id: &str) -> Result<(), RfpError> {
        let key = ItemKey::new(rfp_core::keys::keyword_index_pk(scope_id, keyword), rfp_core::keys::keyword_index_sk(memory_id));
        let item = to_item(key, &serde_json::json!({ "memoryId": memory_id }))?;
        self.store.put(item, None).await
    }

    async fn deindex_keywords(&self, scope_id: &str, keywords: &[String], memory_id: &str) -> Result<(), RfpError> {
        for keyword in keywords {
            let key = ItemKey::new(rfp_core::keys::keyword_index_pk(scope_id, keyword), rfp_core::keys::keyword_index_sk(memory_id));
            // Best-effort tombstone: overwrite with a removed marker rather
            // than requiring a delete operation on the store trait.
            let item = to_item(key, &serde_json::json!({ "memoryId": memory_id, "removed": true }))?;
            self.store.put(item, None).await?;
        }
        Ok(())
    }

    /// Reads one memory by its scope, type, and id.
    pub async fn get_memory(&self, scope_id: &str, memory_type: MemoryType, memory_id: &str) -> Result<Option<Memory>, RfpError> {
        match self.store.get(&memory_key(scope_id, memory_type, memory_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Overwrites a memory row in place (used to bump access count/TTL or
    /// to mark originals for compression-driven expiry).
    pub async fn put_memory(&self, memory: &Memory) -> Result<(), RfpError> {
        let item = to_item(memory_key(&memory.scope_id, memory.memory_type, &memory.id), memory)?;
        self.store.put(item, None).await
    }

    /// Lists memories in a scope+type partition, most recent first, minus
    /// any that are no longer retrievable (see [`is_retrievable`]).
    pub async fn list_by_scope(&self, scope_id: &str, memory_type: MemoryType, limit: usize, now: DateTime<Utc>) -> Result<Vec<Memory>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::memory_pk(scope_id, memory_type.tag()),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token: None,
            })
            .await?;
        let memories: Vec<Memory> = page.items.into_iter().map(from_item).collect::<Result<_, _>>()?;
        Ok(memories.into_iter().filter(|m| is_retrievable(m, now)).collect())
    }

    /// Records a retrieval: bumps `access_count`/`last_accessed_at` and
    /// writes the memory back.
    pub async fn record_access(&self, memory: &Memory, now: DateTime<Utc>) -> Result<Memory, RfpError> {
        let updated = memory.record_access(now);
        self.put_memory(&updated).await?;
        Ok(updated)
    }

    /// Query-aware retrieval across one or more memory types in a scope:
    /// scores each candidate by keyword overlap with `query` (if given)
    /// plus a recency bonus, and returns the top `limit`. Without a query,
    /// returns most-recent-first (the per-partition scan order).
    pub async fn get_memories_for_context(
        &self,
        scope_id: &str,
        memory_types: &[MemoryType],
        query: Option<&str>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Memory>, RfpError> {
        let mut candidates = Vec::new();
        for memory_type in memory_types {
            candidates.extend(self.list_by_scope(scope_id, *memory_type, 100, now).await?);
        }

        let Some(query) = query else {
            candidates.truncate(limit);
            return Ok(candidates);
        };

        let query_keywords = extract_keywords(query, MAX_EXTRACTED_KEYWORDS);
        let mut scored: Vec<(f64, Memory)> = candidates
            .into_iter()
            .map(|m| {
                let overlap = query_keywords.iter().filter(|k| m.keywords.contains(k)).count() as f64;
                let age_hours = (now - m.created_at).num_minutes().max(0) as f64 / 60.0;
                let recency_bonus = 1.0 / (1.0 + age_hours / 24.0);
                (overlap * 10.0 + recency_bonus, m)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(limit).map(|(_, m)| m).collect())
    }

    /// Marks `memory` for TTL deletion `ttl_days` from `now` and removes it
    /// from the keyword index immediately.
    pub async fn expire_memory(&self, memory: &Memory, ttl_days: i64, now: DateTime<Utc>) -> Result<Memory, RfpError> {
        let mut updated = memory.clone();
        updated.expires_at = Some(now + chrono::Duration::days(ttl_days));
        self.put_memory(&updated).await?;
        self.deindex_keywords(&memory.scope_id, &memory.keywords, &memory.id).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;

    fn repo() -> MemoryRepo {
        MemoryRepo::new(InMemoryKeyValueStore::shared())
    }

    #[tokio::test]
    async fn create_then_list_returns_most_recent_first() {
        let repo = repo();
        let now = Utc::now();
        repo.create_memory(MemoryType::Episodic, "USER#u1", "first turn", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now)
            .await
            .unwrap();
        let later = now + chrono::Duration::seconds(1);
        repo.create_memory(MemoryType::Episodic, "USER#u1", "second turn", vec![], BTreeMap::new(), MemoryProvenance::default(), None, later)
            .await
            .unwrap();

        let listed = repo.list_by_scope("USER#u1", MemoryType::Episodic, 10, later).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].content, "second turn");
    }

    #[tokio::test]
    async fn expired_memories_are_absent_from_listing() {
        let repo = repo();
        let now = Utc::now();
        let memory = repo
            .create_memory(MemoryType::Episodic, "USER#u1", "old note", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now)
            .await
            .unwrap();
        repo.expire_memory(&memory, 7, now).await.unwrap();

        let listed = repo.list_by_scope("USER#u1", MemoryType::Episodic, 10, now).await.unwrap();
        assert!(listed.is_empty(), "an original marked for compression-driven expiry must disappear immediately");
    }

    #[tokio::test]
    async fn context_retrieval_scores_by_keyword_overlap() {
        let repo = repo();
        let now = Utc::now();
        repo.create_memory(MemoryType::Semantic, "USER#u1", "client prefers weekly budget updates", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now)
            .await
            .unwrap();
        repo.create_memory(MemoryType::Semantic, "USER#u1", "unrelated note about parking", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now)
            .await
            .unwrap();

        let results = repo
            .get_memories_for_context("USER#u1", &[MemoryType::Semantic], Some("budget updates"), 1, now)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("budget"));
    }

    #[tokio::test]
    async fn record_access_persists_the_bump() {
        let repo = repo();
        let now = Utc::now();
        let memory = repo
            .create_memory(MemoryType::Procedural, "RFP#r1", "ran search then summarize", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now)
            .await
            .unwrap();
        let updated = repo.record_access(&memory, now).await.unwrap();
        assert_eq!(updated.access_count, 1);
        let reloaded = repo.get_memory("RFP#r1", MemoryType::Procedural, &memory.id).await.unwrap().unwrap();
        assert_eq!(reloaded.access_count, 1);
    }
}
