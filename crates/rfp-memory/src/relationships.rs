//! Memory relationship edges (`spec.md` §3 "Memory", §4.10).

use crate::repo::MemoryRepo;
use chrono::{DateTime, Utc};
use rfp_core::{MemoryRelationship, MemoryType, RelationshipType};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection};
use std::sync::Arc;

fn to_item(key: ItemKey, value: &MemoryRelationship) -> Result<Item, RfpError> {
    Ok(Item {
        key,
        gsi1pk: None,
        gsi1sk: None,
        attributes: serde_json::to_value(value)
            .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize relationship: {e}")))?,
    })
}

fn from_item(item: Item) -> Result<MemoryRelationship, RfpError> {
    serde_json::from_value(item.attributes)
        .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize relationship: {e}")))
}

/// Manages directed edges between memories. Relationships are the only
/// cyclic structure in the memory model and are stored as standalone rows,
/// never as pointers embedded in a memory.
pub struct RelationshipStore {
    store: Arc<dyn KeyValueStore>,
}

impl RelationshipStore {
    /// Construct a store backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Links `from_id` to `to_id`, verifying both memories exist in the
    /// repo first. If `bidirectional`, also writes the inverse edge.
    pub async fn add_relationship(
        &self,
        memories: &MemoryRepo,
        scope_id: &str,
        from_id: &str,
        from_type: MemoryType,
        to_id: &str,
        to_type: MemoryType,
        relationship_type: RelationshipType,
        bidirectional: bool,
        now: DateTime<Utc>,
    ) -> Result<MemoryRelationship, RfpError> {
        if memories.get_memory(scope_id, from_type, from_id).await?.is_none() {
            return Err(RfpError::new(ErrorCode::NotFound, format!("memory {from_id} not found")));
        }
        if memories.get_memory(scope_id, to_type, to_id).await?.is_none() {
            return Err(RfpError::new(ErrorCode::NotFound, format!("memory {to_id} not found")));
        }

        let edge = MemoryRelationship {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            relationship_type,
            bidirectional,
            created_at: now,
        };
        let key = ItemKey::new(rfp_core::keys::relationship_pk(from_id), rfp_core::keys::relationship_sk(to_id));
        self.store.put(to_item(key, &edge)?, None).await?;

        if bidirectional {
            let inverse = MemoryRelationship {
                from_id: to_id.to_string(),
                to_id: from_id.to_string(),
                relationship_type,
                bidirectional: true,
                created_at: now,
            };
            let inverse_key = ItemKey::new(rfp_core::keys::relationship_pk(to_id), rfp_core::keys::relationship_sk(from_id));
            self.store.put(to_item(inverse_key, &inverse)?, None).await?;
        }

        Ok(edge)
    }

    /// Lists outgoing edges from `from_id`.
    pub async fn list_from(&self, from_id: &str, limit: usize) -> Result<Vec<MemoryRelationship>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::relationship_pk(from_id),
                sort_key_prefix: None,
                direction: ScanDirection::Forward,
                limit,
                continuation_token: None,
            })
            .await?;
        page.items.into_iter().map(from_item).collect()
    }
}
