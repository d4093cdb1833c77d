//! Opportunity state, journal, event log, and thread binding repository
//! (`spec.md` §4.3).

use chrono::{DateTime, Utc};
use rfp_core::{EventLogEntry, JournalEntry, OpportunityState, ThreadBinding};
use rfp_error::{ErrorCode, RfpError};
use rfp_policy::{sanitize_opportunity_patch, RawOpportunityPatch, SanitizedPatch};
use rfp_receipt::diff::{diff_opportunity_state, FieldChange};
use rfp_store::{Condition, Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection};
use std::sync::Arc;

fn to_item(key: ItemKey, gsi1pk: Option<String>, gsi1sk: Option<String>, value: &impl serde::Serialize) -> Result<Item, RfpError> {
    Ok(Item {
        key,
        gsi1pk,
        gsi1sk,
        attributes: serde_json::to_value(value)
            .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to serialize item: {e}")))?,
    })
}

fn from_item<T: serde::de::DeserializeOwned>(item: Item) -> Result<T, RfpError> {
    serde_json::from_value(item.attributes)
        .map_err(|e| RfpError::new(ErrorCode::Internal, format!("failed to deserialize item: {e}")))
}

/// The result of a successful [`OpportunityRepo::patch_state`] call.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The state after applying the sanitized patch.
    pub state: OpportunityState,
    /// Policy-check records emitted while sanitizing the patch.
    pub policy_checks: Vec<rfp_core::PolicyCheckRecord>,
    /// Field-level diff against the pre-patch state, present only when
    /// the caller asked for a snapshot.
    pub diff: Option<Vec<FieldChange>>,
}

/// Repository over the opportunity state, journal, event log, and thread
/// binding rows for one RFP.
pub struct OpportunityRepo {
    store: Arc<dyn KeyValueStore>,
}

impl OpportunityRepo {
    /// Construct a repo backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn state_key(rfp_id: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::opportunity_pk(rfp_id), rfp_core::keys::OPPORTUNITY_STATE_SK)
    }

    /// Creates the default state for `rfp_id` if none exists yet. Safe to
    /// call repeatedly.
    pub async fn ensure_state_exists(&self, rfp_id: &str, now: DateTime<Utc>) -> Result<(), RfpError> {
        let state = OpportunityState::default_for(rfp_id, now);
        let item = to_item(Self::state_key(rfp_id), None, None, &state)?;
        match self.store.put(item, Some(Condition::NotExists)).await {
            Ok(()) => Ok(()),
            Err(e) if e.code == ErrorCode::Conflict => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Reads the canonical opportunity state, if it exists.
    pub async fn get_state(&self, rfp_id: &str) -> Result<Option<OpportunityState>, RfpError> {
        match self.store.get(&Self::state_key(rfp_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Sanitizes and applies a raw patch, bumping `version`/`updated_at`.
    /// When `create_snapshot` is true, the result carries a field-level
    /// diff against the pre-patch state.
    pub async fn patch_state(
        &self,
        rfp_id: &str,
        raw_patch: RawOpportunityPatch,
        create_snapshot: bool,
        now: DateTime<Utc>,
    ) -> Result<PatchOutcome, RfpError> {
        self.ensure_state_exists(rfp_id, now).await?;
        let before = self
            .get_state(rfp_id)
            .await?
            .ok_or_else(|| RfpError::new(ErrorCode::Internal, "state missing after ensure_state_exists"))?;

        let SanitizedPatch { patch, policy_checks } = sanitize_opportunity_patch(raw_patch, now);
        let after = before.apply_patch(&patch, now);

        let item = to_item(Self::state_key(rfp_id), None, None, &after)?;
        self.store.put(item, None).await?;

        tracing::info!(
            target: "rfp.opportunity",
            rfp_id,
            version = after.version,
            policy_checks = policy_checks.len(),
            "opportunity_state_patched"
        );

        Ok(PatchOutcome {
            diff: create_snapshot.then(|| diff_opportunity_state(&before, &after)),
            state: after,
            policy_checks,
        })
    }

    /// Appends a journal row with a monotonic time-ordered sort key.
    pub async fn append_entry(&self, entry: JournalEntry) -> Result<(), RfpError> {
        let key = ItemKey::new(rfp_core::keys::journal_pk(&entry.rfp_id), entry.sort_key.clone());
        let item = to_item(key, None, None, &entry)?;
        self.store.put(item, None).await
    }

    /// Appends a durable explainability row, chaining its `prev_hash` from
    /// the most recent event for this RFP.
    pub async fn append_event(&self, mut entry: EventLogEntry) -> Result<EventLogEntry, RfpError> {
        let latest = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::event_pk(&entry.rfp_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit: 1,
                continuation_token: None,
            })
            .await?;

        entry.prev_hash = match latest.items.into_iter().next() {
            Some(item) => {
                let last: EventLogEntry = from_item(item)?;
                Some(
                    rfp_receipt::hash_link(last.prev_hash.as_deref(), &last)
                        .map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?,
                )
            }
            None => None,
        };

        let key = ItemKey::new(rfp_core::keys::event_pk(&entry.rfp_id), entry.sort_key.clone());
        let item = to_item(key, None, None, &entry)?;
        self.store.put(item, None).await?;
        Ok(entry)
    }

    /// Lists the most recent journal rows for `rfp_id`, newest first.
    pub async fn list_journal(&self, rfp_id: &str, limit: usize) -> Result<Vec<JournalEntry>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::journal_pk(rfp_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token: None,
            })
            .await?;
        page.items.into_iter().map(from_item).collect()
    }

    /// Lists the most recent event-log rows for `rfp_id`, newest first.
    pub async fn list_events(&self, rfp_id: &str, limit: usize) -> Result<Vec<EventLogEntry>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::event_pk(rfp_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token: None,
            })
            .await?;
        page.items.into_iter().map(from_item).collect()
    }

    /// Reads the RFP a chat thread is bound to, if any.
    pub async fn get_binding(&self, channel_id: &str, thread_ts: &str) -> Result<Option<ThreadBinding>, RfpError> {
        let key = ItemKey::new(rfp_core::keys::thread_binding_pk(channel_id, thread_ts), rfp_core::keys::THREAD_BINDING_SK);
        match self.store.get(&key).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Binds a chat thread to an RFP, overwriting any previous binding.
    pub async fn set_binding(&self, binding: ThreadBinding) -> Result<(), RfpError> {
        let key = ItemKey::new(
            rfp_core::keys::thread_binding_pk(&binding.channel_id, &binding.thread_ts),
            rfp_core::keys::THREAD_BINDING_SK,
        );
        let item = to_item(key, None, None, &binding)?;
        self.store.put(item, None).await
    }
}
