//! Orchestrator checkpointing: write-ahead progress so a crashed or
//! restarted worker can resume a long-running job mid-plan (`spec.md`
//! §4.8 "Checkpointing").

use chrono::{DateTime, Utc};
use rfp_core::keys::{checkpoint_pk, checkpoint_sk};
use rfp_core::AgentCheckpoint;
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection};
use std::sync::Arc;

/// Durable store of [`AgentCheckpoint`] rows, one partition per `(rfp_id,
/// job_id)`, ordered so the latest sequence is found with a single
/// single-item backward query.
#[derive(Clone)]
pub struct CheckpointRepo {
    store: Arc<dyn KeyValueStore>,
}

impl CheckpointRepo {
    /// Construct a repo over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Writes a new checkpoint, unconditionally (each sequence number is
    /// its own row, so there is nothing to overwrite).
    pub async fn save(&self, checkpoint: &AgentCheckpoint) -> Result<(), RfpError> {
        let item = Item {
            key: ItemKey::new(checkpoint_pk(&checkpoint.rfp_id, &checkpoint.job_id), checkpoint_sk(checkpoint.sequence)),
            gsi1pk: None,
            gsi1sk: None,
            attributes: serde_json::to_value(checkpoint).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?,
        };
        self.store.put(item, Some(Condition::NotExists)).await
    }

    /// Reads the most recently written checkpoint for a job, if any.
    pub async fn get_latest(&self, rfp_id: &str, job_id: &str) -> Result<Option<AgentCheckpoint>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: checkpoint_pk(rfp_id, job_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit: 1,
                continuation_token: None,
            })
            .await?;
        page.items
            .into_iter()
            .next()
            .map(|item| serde_json::from_value(item.attributes).map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize checkpoint: {e}"))))
            .transpose()
    }

    /// Loads the latest checkpoint, or an empty one at sequence 0 if the job
    /// has never checkpointed before.
    pub async fn resume_or_start(&self, rfp_id: &str, job_id: &str, budget_tracker: serde_json::Value, now: DateTime<Utc>) -> Result<AgentCheckpoint, RfpError> {
        match self.get_latest(rfp_id, job_id).await? {
            Some(checkpoint) => Ok(checkpoint),
            None => Ok(AgentCheckpoint::empty(rfp_id, job_id, budget_tracker, now)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;
    use serde_json::json;

    #[tokio::test]
    async fn resume_or_start_returns_empty_when_nothing_saved() {
        let repo = CheckpointRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let checkpoint = repo.resume_or_start("rfp_1", "job_1", json!({}), now).await.unwrap();
        assert_eq!(checkpoint.sequence, 0);
    }

    #[tokio::test]
    async fn get_latest_returns_highest_sequence() {
        let repo = CheckpointRepo::new(InMemoryKeyValueStore::shared());
        let now = rfp_core::now();
        let first = AgentCheckpoint::empty("rfp_1", "job_1", json!({}), now);
        repo.save(&first).await.unwrap();
        let second = first.next(now);
        repo.save(&second).await.unwrap();

        let latest = repo.get_latest("rfp_1", "job_1").await.unwrap().unwrap();
        assert_eq!(latest.sequence, 1);
    }
}
