//! Cached external-context fetches: news, weather, research, and geo
//! lookups the agent can fold into a memory (`spec.md` §4.10, "external
//! context").

use crate::repo::MemoryRepo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rfp_core::{MemoryProvenance, MemoryType};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Item, ItemKey, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An external-context source, each with its own cache TTL per
/// `spec.md` §4.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSource {
    /// Business news.
    News,
    /// Weather conditions/forecast.
    Weather,
    /// arXiv/academic research.
    Research,
    /// Geopolitical events.
    Geo,
}

impl ExternalSource {
    fn tag(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Weather => "weather",
            Self::Research => "research",
            Self::Geo => "geo",
        }
    }

    /// Cache TTL for this source.
    pub fn ttl(self) -> chrono::Duration {
        match self {
            Self::Weather => chrono::Duration::minutes(15),
            Self::News => chrono::Duration::hours(1),
            Self::Research => chrono::Duration::hours(6),
            Self::Geo => chrono::Duration::hours(1),
        }
    }
}

/// One external-context fetcher. Implementations call the underlying
/// provider (a news API, weather API, arXiv, etc); the cache layer owns
/// TTLs and memoization.
#[async_trait]
pub trait ExternalContextFetcher: Send + Sync {
    /// Fetches fresh data for `query` with `params` from `self`'s source.
    async fn fetch(&self, query: &str, params: &serde_json::Value) -> Result<serde_json::Value, RfpError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedFetch {
    source: ExternalSource,
    query: String,
    data: serde_json::Value,
    fetched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

fn cache_digest(query: &str, params: &serde_json::Value) -> String {
    rfp_receipt::sha256_hex(format!("{query}\u{0}{params}").as_bytes())
}

/// Caches external-context fetches by `(source, query, params)` with a
/// per-source TTL, and can promote a cached fetch into a slimmed,
/// human-readable memory row.
pub struct ExternalContextCache {
    store: Arc<dyn KeyValueStore>,
}

impl ExternalContextCache {
    /// Construct a cache backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(source: ExternalSource, digest: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::external_context_pk(source.tag(), digest), rfp_core::keys::EXTERNAL_CONTEXT_SK.to_string())
    }

    /// Returns cached data for `(source, query, params)` if present and
    /// unexpired, otherwise calls `fetcher` and caches the result.
    pub async fn get_or_fetch(
        &self,
        fetcher: &dyn ExternalContextFetcher,
        source: ExternalSource,
        query: &str,
        params: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value, RfpError> {
        let digest = cache_digest(query, params);
        let key = Self::key(source, &digest);

        if let Some(item) = self.store.get(&key).await? {
            let cached: CachedFetch = serde_json::from_value(item.attributes)
                .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize cached fetch: {e}")))?;
            if cached.expires_at > now {
                tracing::debug!(target: "rfp.memory", source = source.tag(), query, "external_context_cache_hit");
                return Ok(cached.data);
            }
        }

        let data = fetcher.fetch(query, params).await?;
        let cached = CachedFetch { source, query: query.to_string(), data: data.clone(), fetched_at: now, expires_at: now + source.ttl() };
        let item = Item {
            key,
            gsi1pk: None,
            gsi1sk: None,
            attributes: serde_json::to_value(&cached)
                .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize cached fetch: {e}")))?,
        };
        self.store.put(item, None).await?;
        Ok(data)
    }

    /// Stores a slimmed, human-readable memory row for a fetch result, so
    /// later retrieval can surface it alongside other context without a
    /// fresh network call.
    pub async fn remember_fetch(
        &self,
        memories: &MemoryRepo,
        scope_id: &str,
        source: ExternalSource,
        summary: &str,
        now: DateTime<Utc>,
    ) -> Result<rfp_core::Memory, RfpError> {
        let provenance = MemoryProvenance { kind: source.tag().to_string(), reference: None };
        memories
            .create_memory(MemoryType::ExternalContext, scope_id, summary, vec![source.tag().to_string()], Default::default(), provenance, None, now)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExternalContextFetcher for CountingFetcher {
        async fn fetch(&self, query: &str, _params: &serde_json::Value) -> Result<serde_json::Value, RfpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({ "summary": format!("weather for {query}") }))
        }
    }

    #[tokio::test]
    async fn second_fetch_within_ttl_is_a_cache_hit() {
        let cache = ExternalContextCache::new(InMemoryKeyValueStore::shared());
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0) };
        let now = Utc::now();
        let params = serde_json::json!({});

        cache.get_or_fetch(&fetcher, ExternalSource::Weather, "Austin, TX", &params, now).await.unwrap();
        cache.get_or_fetch(&fetcher, ExternalSource::Weather, "Austin, TX", &params, now + chrono::Duration::minutes(5)).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_is_repeated_after_ttl_expiry() {
        let cache = ExternalContextCache::new(InMemoryKeyValueStore::shared());
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0) };
        let now = Utc::now();
        let params = serde_json::json!({});

        cache.get_or_fetch(&fetcher, ExternalSource::Weather, "Austin, TX", &params, now).await.unwrap();
        cache
            .get_or_fetch(&fetcher, ExternalSource::Weather, "Austin, TX", &params, now + chrono::Duration::minutes(16))
            .await
            .unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remembers_a_slimmed_fetch_as_a_memory() {
        let kv = InMemoryKeyValueStore::shared();
        let cache = ExternalContextCache::new(kv.clone());
        let memories = MemoryRepo::new(kv);
        let now = Utc::now();

        let memory = cache.remember_fetch(&memories, "RFP#r1", ExternalSource::News, "Acme Corp announced Q3 earnings", now).await.unwrap();
        assert_eq!(memory.memory_type, MemoryType::ExternalContext);
        assert!(memory.tags.contains(&"news".to_string()));
    }
}
