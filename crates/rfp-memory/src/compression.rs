//! Compresses old, low-value memories into a single AI-summarized memory
//! (`spec.md` §4.10, "memory compression").

use crate::keywords::{extract_keywords, extract_tags};
use crate::repo::MemoryRepo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rfp_core::{Memory, MemoryType};
use rfp_error::RfpError;
use std::collections::BTreeSet;

/// Minimum age, in days, for a memory to be eligible for compression.
pub const DEFAULT_DAYS_OLD: i64 = 30;
/// Memories accessed more than this many times are never compressed.
pub const DEFAULT_MAX_ACCESS_COUNT: u64 = 0;
/// At most this many memories are folded into one compression pass.
pub const MAX_MEMORIES_PER_COMPRESSION: usize = 10;
/// TTL applied to originals once compressed, giving callers a short grace
/// window before the store reaps them.
const ORIGINAL_TTL_DAYS: i64 = 7;
/// TTL applied to the resulting compressed memory.
const COMPRESSED_TTL_DAYS: i64 = 180;
/// Combined-content budget handed to the summarizer.
const MAX_COMBINED_CHARS: usize = 8000;
/// Per-memory clip length when a memory has no existing summary.
const MAX_MEMORY_CLIP_CHARS: usize = 200;
/// Fallback truncation length if summarization fails.
const FALLBACK_SUMMARY_CHARS: usize = 2000;
const MAX_MERGED_KEYWORDS: usize = 50;
const MAX_MERGED_TAGS: usize = 25;

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// The AI seam compression calls to turn combined memory content into a
/// short summary. Implementations should call the model's structured text
/// surface; callers fall back to deterministic truncation on any error.
#[async_trait]
pub trait MemorySummarizer: Send + Sync {
    /// Summarizes `combined_content` (already clipped to a bounded prompt
    /// size) for memories of `memory_type`.
    async fn summarize(&self, combined_content: &str, memory_type: MemoryType) -> Result<String, RfpError>;
}

/// The outcome of one [`compress_old_memories`] call.
#[derive(Debug, Clone)]
pub struct CompressionResult {
    /// How many originals were folded into the new memory.
    pub compressed_count: usize,
    /// The compressed memory's id, if any compression happened.
    pub new_memory_id: Option<String>,
    /// Ids of the originals that were folded in.
    pub original_memory_ids: Vec<String>,
}

fn is_candidate(memory: &Memory, cutoff: DateTime<Utc>, max_access_count: u64) -> bool {
    !memory.compressed
        && memory.created_at < cutoff
        && memory.access_count <= max_access_count
        && memory.importance.unwrap_or(0.0) <= 0.5
}

/// Compresses the oldest, least-accessed, lowest-importance memories of
/// `memory_type` in `scope_id` into one AI-summarized memory, and marks the
/// originals for near-term TTL expiry.
pub async fn compress_old_memories(
    memories: &MemoryRepo,
    summarizer: &dyn MemorySummarizer,
    scope_id: &str,
    memory_type: MemoryType,
    days_old: i64,
    max_access_count: u64,
    now: DateTime<Utc>,
) -> Result<CompressionResult, RfpError> {
    let cutoff = now - chrono::Duration::days(days_old);
    let all = memories.list_by_scope(scope_id, memory_type, 100, now).await?;

    let mut candidates: Vec<Memory> = all.into_iter().filter(|m| is_candidate(m, cutoff, max_access_count)).collect();
    candidates.sort_by_key(|m| m.created_at);
    candidates.truncate(MAX_MEMORIES_PER_COMPRESSION);

    if candidates.len() < 2 {
        return Ok(CompressionResult { compressed_count: 0, new_memory_id: None, original_memory_ids: Vec::new() });
    }

    let mut combined = String::new();
    for memory in &candidates {
        let piece = match &memory.summary {
            Some(summary) => summary.clone(),
            None => clip(&memory.content, MAX_MEMORY_CLIP_CHARS),
        };
        if !combined.is_empty() {
            combined.push_str("\n\n");
        }
        combined.push_str(&format!("[{}] {piece}", memory.created_at.to_rfc3339()));
    }
    let combined = clip(&combined, MAX_COMBINED_CHARS);

    let summary = match summarizer.summarize(&combined, memory_type).await {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(target: "rfp.memory", scope_id, error = %err, "compression_summary_generation_failed");
            clip(&combined, FALLBACK_SUMMARY_CHARS)
        }
    };

    let mut keywords: BTreeSet<String> = extract_keywords(&summary, 30).into_iter().collect();
    let mut tags: BTreeSet<String> = extract_tags(&summary).into_iter().collect();
    for memory in &candidates {
        keywords.extend(memory.keywords.iter().cloned());
        tags.extend(memory.tags.iter().cloned());
    }
    let keywords: Vec<String> = keywords.into_iter().take(MAX_MERGED_KEYWORDS).collect();
    let tags: Vec<String> = tags.into_iter().take(MAX_MERGED_TAGS).collect();

    let provenance = candidates[0].provenance.clone();
    let original_ids: Vec<String> = candidates.iter().map(|m| m.id.clone()).collect();

    let mut compressed = memories
        .create_memory(memory_type, scope_id, &summary, tags, Default::default(), provenance, Some(clip(&summary, 500)), now)
        .await?;
    compressed.keywords = keywords;
    compressed.compressed = true;
    compressed.original_memory_ids = original_ids.clone();
    compressed.expires_at = Some(now + chrono::Duration::days(COMPRESSED_TTL_DAYS));
    memories.put_memory(&compressed).await?;

    for original in &candidates {
        memories.expire_memory(original, ORIGINAL_TTL_DAYS, now).await?;
    }

    tracing::info!(target: "rfp.memory", scope_id, memory_type = memory_type.tag(), compressed_count = candidates.len(), new_memory_id = %compressed.id, "memory_compression_completed");

    Ok(CompressionResult { compressed_count: candidates.len(), new_memory_id: Some(compressed.id), original_memory_ids: original_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_core::MemoryProvenance;
    use rfp_store::InMemoryKeyValueStore;
    use std::collections::BTreeMap;

    struct StubSummarizer;

    #[async_trait]
    impl MemorySummarizer for StubSummarizer {
        async fn summarize(&self, _combined_content: &str, _memory_type: MemoryType) -> Result<String, RfpError> {
            Ok("client wants weekly updates and a fixed-price contract".to_string())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl MemorySummarizer for FailingSummarizer {
        async fn summarize(&self, _combined_content: &str, _memory_type: MemoryType) -> Result<String, RfpError> {
            Err(RfpError::new(rfp_error::ErrorCode::UpstreamFailed, "model unavailable"))
        }
    }

    async fn seed_old_memories(memories: &MemoryRepo, now: DateTime<Utc>) {
        let old = now - chrono::Duration::days(45);
        memories
            .create_memory(MemoryType::Episodic, "USER#u1", "client asked about budget", vec![], BTreeMap::new(), MemoryProvenance::default(), None, old)
            .await
            .unwrap();
        memories
            .create_memory(MemoryType::Episodic, "USER#u1", "client confirmed fixed-price", vec![], BTreeMap::new(), MemoryProvenance::default(), None, old + chrono::Duration::minutes(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn compresses_enough_old_low_access_memories() {
        let memories = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = Utc::now();
        seed_old_memories(&memories, now).await;

        let result = compress_old_memories(&memories, &StubSummarizer, "USER#u1", MemoryType::Episodic, DEFAULT_DAYS_OLD, DEFAULT_MAX_ACCESS_COUNT, now)
            .await
            .unwrap();
        assert_eq!(result.compressed_count, 2);
        assert!(result.new_memory_id.is_some());

        // The two originals were marked for compression-driven expiry, so
        // they vanish from listing immediately; only the summary remains.
        let remaining = memories.list_by_scope("USER#u1", MemoryType::Episodic, 10, now).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].compressed);
    }

    #[tokio::test]
    async fn falls_back_to_truncation_when_summarizer_fails() {
        let memories = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = Utc::now();
        seed_old_memories(&memories, now).await;

        let result = compress_old_memories(&memories, &FailingSummarizer, "USER#u1", MemoryType::Episodic, DEFAULT_DAYS_OLD, DEFAULT_MAX_ACCESS_COUNT, now)
            .await
            .unwrap();
        assert_eq!(result.compressed_count, 2);
    }

    #[tokio::test]
    async fn skips_compression_with_fewer_than_two_candidates() {
        let memories = MemoryRepo::new(InMemoryKeyValueStore::shared());
        let now = Utc::now();
        memories
            .create_memory(MemoryType::Episodic, "USER#u1", "only one old memory", vec![], BTreeMap::new(), MemoryProvenance::default(), None, now - chrono::Duration::days(45))
            .await
            .unwrap();

        let result = compress_old_memories(&memories, &StubSummarizer, "USER#u1", MemoryType::Episodic, DEFAULT_DAYS_OLD, DEFAULT_MAX_ACCESS_COUNT, now)
            .await
            .unwrap();
        assert_eq!(result.compressed_count, 0);
        assert!(result.new_memory_id.is_none());
    }
}
