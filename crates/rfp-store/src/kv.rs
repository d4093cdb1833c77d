//! Key-value store adapter: single wide table keyed by `(pk, sk)`, with one
//! global secondary index `(gsi1pk, gsi1sk)` (`spec.md` §3, §9
//! "Persistent state").

use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Primary and, optionally, secondary-index keys for one item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ItemKey {
    /// Partition key.
    pub pk: String,
    /// Sort key.
    pub sk: String,
}

impl ItemKey {
    /// Construct a key pair.
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

/// One stored row: its keys, GSI projection (if any), and attribute map.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Primary key.
    pub key: ItemKey,
    /// Secondary-index partition key, if this item is projected onto the GSI.
    pub gsi1pk: Option<String>,
    /// Secondary-index sort key.
    pub gsi1sk: Option<String>,
    /// Arbitrary JSON attributes.
    pub attributes: Value,
}

/// A condition guarding a conditional `put`/`update`/`transact` item.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Succeeds only if no item exists at this key.
    NotExists,
    /// Succeeds only if an item already exists at this key.
    Exists,
    /// Succeeds only if the attribute at `path` equals `value`.
    AttributeEquals {
        /// Dotted attribute path, e.g. `"status"`.
        path: String,
        /// Expected value.
        value: Value,
    },
}

/// One item in a [`KeyValueStore::transact`] call.
#[derive(Debug, Clone)]
pub enum TransactItem {
    /// Write (insert or overwrite) an item, subject to an optional condition.
    Put {
        /// Item to write.
        item: Item,
        /// Guard condition.
        condition: Option<Condition>,
    },
    /// Merge attributes into an existing item, subject to an optional condition.
    Update {
        /// Key to update.
        key: ItemKey,
        /// Attributes to shallow-merge into the existing JSON object.
        patch: Value,
        /// Guard condition.
        condition: Option<Condition>,
    },
}

/// Scan direction for [`KeyValueStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Ascending by sort key.
    Forward,
    /// Descending by sort key.
    Backward,
}

/// Which key (primary or secondary index) a query runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIndex {
    /// Query the primary `(pk, sk)` key.
    Primary,
    /// Query the `(gsi1pk, gsi1sk)` secondary index.
    Gsi1,
}

/// A paged query request.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Which key to query.
    pub index: QueryIndex,
    /// Partition key value to match exactly.
    pub partition_key: String,
    /// Optional sort-key prefix filter.
    pub sort_key_prefix: Option<String>,
    /// Scan direction.
    pub direction: ScanDirection,
    /// Maximum items to return in this page.
    pub limit: usize,
    /// Opaque continuation token from a previous page, if any.
    pub continuation_token: Option<String>,
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Items in this page, in scan order.
    pub items: Vec<Item>,
    /// Token to pass as `continuation_token` on the next call, if more
    /// results remain.
    pub continuation_token: Option<String>,
}

/// Async key-value store adapter.
///
/// Implementations are expected to enforce conditional semantics
/// atomically; callers never need to re-check a condition themselves.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Point get by primary key. Returns `None` if no item exists.
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, RfpError>;

    /// Write an item, subject to an optional condition. Returns
    /// [`ErrorCode::Conflict`] if the condition is not satisfied.
    async fn put(&self, item: Item, condition: Option<Condition>) -> Result<(), RfpError>;

    /// Shallow-merge `patch` into the existing item's attributes, subject
    /// to an optional condition. Returns [`ErrorCode::NotFound`] if no item
    /// exists at `key` and the condition does not permit creation, or
    /// [`ErrorCode::Conflict`] if the condition fails.
    async fn update(&self, key: &ItemKey, patch: Value, condition: Option<Condition>) -> Result<Item, RfpError>;

    /// Query by partition key (primary or secondary index), with an
    /// optional sort-key prefix filter, scan direction, page size, and
    /// continuation token.
    async fn query(&self, request: QueryRequest) -> Result<QueryPage, RfpError>;

    /// Apply all `items` atomically: either every condition is satisfied
    /// and every write lands, or none do. Returns
    /// [`ErrorCode::Conflict`] naming the first item whose condition failed.
    async fn transact(&self, items: Vec<TransactItem>) -> Result<(), RfpError>;
}

fn check_condition(existing: &Option<Item>, condition: &Option<Condition>) -> Result<(), RfpError> {
    match condition {
        None => Ok(()),
        Some(Condition::NotExists) => {
            if existing.is_some() {
                Err(RfpError::new(ErrorCode::Conflict, "item already exists"))
            } else {
                Ok(())
            }
        }
        Some(Condition::Exists) => {
            if existing.is_none() {
                Err(RfpError::new(ErrorCode::Conflict, "item does not exist"))
            } else {
                Ok(())
            }
        }
        Some(Condition::AttributeEquals { path, value }) => match existing {
            Some(item) if item.attributes.get(path) == Some(value) => Ok(()),
            _ => Err(RfpError::new(
                ErrorCode::Conflict,
                format!("attribute '{path}' did not match expected value"),
            )),
        },
    }
}

fn merge_attributes(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = base_map.clone();
            for (k, v) in patch_map {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        (_, patch) => patch.clone(),
    }
}

/// In-memory [`KeyValueStore`] reference implementation, for tests and
/// local development. Continuation tokens are the stringified offset into
/// the sorted result set.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    rows: Mutex<BTreeMap<ItemKey, Item>>,
}

impl InMemoryKeyValueStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in an `Arc` for sharing across tool handlers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, RfpError> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn put(&self, item: Item, condition: Option<Condition>) -> Result<(), RfpError> {
        let mut rows = self.rows.lock().await;
        let existing = rows.get(&item.key).cloned();
        check_condition(&existing, &condition)?;
        rows.insert(item.key.clone(), item);
        Ok(())
    }

    async fn update(&self, key: &ItemKey, patch: Value, condition: Option<Condition>) -> Result<Item, RfpError> {
        let mut rows = self.rows.lock().await;
        let existing = rows.get(key).cloned();
        check_condition(&existing, &condition)?;
        let base = existing.ok_or_else(|| RfpError::new(ErrorCode::NotFound, "item does not exist"))?;
        let merged = Item {
            key: base.key.clone(),
            gsi1pk: base.gsi1pk.clone(),
            gsi1sk: base.gsi1sk.clone(),
            attributes: merge_attributes(&base.attributes, &patch),
        };
        rows.insert(key.clone(), merged.clone());
        Ok(merged)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage, RfpError> {
        let rows = self.rows.lock().await;
        let mut matches: Vec<Item> = rows
            .values()
            .filter(|item| match request.index {
                QueryIndex::Primary => item.key.pk == request.partition_key,
                QueryIndex::Gsi1 => item.gsi1pk.as_deref() == Some(request.partition_key.as_str()),
            })
            .filter(|item| {
                request.sort_key_prefix.as_ref().is_none_or(|prefix| {
                    let sk = match request.index {
                        QueryIndex::Primary => &item.key.sk,
                        QueryIndex::Gsi1 => item.gsi1sk.as_ref().unwrap_or(&item.key.sk),
                    };
                    sk.starts_with(prefix.as_str())
                })
            })
            .cloned()
            .collect();

        let sort_key_of = |item: &Item| -> String {
            match request.index {
                QueryIndex::Primary => item.key.sk.clone(),
                QueryIndex::Gsi1 => item.gsi1sk.clone().unwrap_or_default(),
            }
        };
        matches.sort_by(|a, b| sort_key_of(a).cmp(&sort_key_of(b)));
        if request.direction == ScanDirection::Backward {
            matches.reverse();
        }

        let offset: usize = match &request.continuation_token {
            Some(token) => token
                .parse()
                .map_err(|_| RfpError::new(ErrorCode::Internal, "invalid continuation token"))?,
            None => 0,
        };
        let page: Vec<Item> = matches.iter().skip(offset).take(request.limit).cloned().collect();
        let next_offset = offset + page.len();
        let continuation_token = if next_offset < matches.len() {
            Some(next_offset.to_string())
        } else {
            None
        };

        Ok(QueryPage {
            items: page,
            continuation_token,
        })
    }

    async fn transact(&self, items: Vec<TransactItem>) -> Result<(), RfpError> {
        let mut rows = self.rows.lock().await;

        for transact_item in &items {
            let (key, condition) = match transact_item {
                TransactItem::Put { item, condition } => (&item.key, condition),
                TransactItem::Update { key, condition, .. } => (key, condition),
            };
            let existing = rows.get(key).cloned();
            check_condition(&existing, condition)?;
        }

        for transact_item in items {
            match transact_item {
                TransactItem::Put { item, .. } => {
                    rows.insert(item.key.clone(), item);
                }
                TransactItem::Update { key, patch, .. } => {
                    if let Some(existing) = rows.get(&key).cloned() {
                        let merged = Item {
                            key: existing.key.clone(),
                            gsi1pk: existing.gsi1pk.clone(),
                            gsi1sk: existing.gsi1sk.clone(),
                            attributes: merge_attributes(&existing.attributes, &patch),
                        };
                        rows.insert(key, merged);
                    }
                }
            }
        }
        Ok(())
    }
}
