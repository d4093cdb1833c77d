//! RFP and proposal catalogue repository: the profile rows and
//! time-ordered listings the RFP/Proposal tool category reads from
//! (`spec.md` §4.4 "RFP/Proposal").

use chrono::{DateTime, Utc};
use rfp_core::{Proposal, Rfp};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection};
use std::sync::Arc;

/// Upper bound on how many listing rows [`CatalogueRepo::search_rfps`] and
/// [`CatalogueRepo::search_proposals`] will scan before giving up, since a
/// keyword substring search has no index to narrow the partition scan.
const SEARCH_SCAN_CAP: usize = 500;

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

/// A page of listing results plus a continuation token for the next page.
#[derive(Debug, Clone)]
pub struct ListPage<T> {
    /// Items in this page, most recently created first.
    pub items: Vec<T>,
    /// Token to pass as `continuation_token` on the next call, if more
    /// results remain.
    pub continuation_token: Option<String>,
}

/// Repository over RFP and proposal profile rows and their time-ordered
/// catalogue listings.
pub struct CatalogueRepo {
    store: Arc<dyn KeyValueStore>,
}

impl CatalogueRepo {
    /// Construct a repo backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn rfp_key(rfp_id: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::rfp_pk(rfp_id), rfp_core::keys::RFP_PROFILE_SK)
    }

    /// Writes (creates or overwrites) an RFP profile row, keeping the GSI1
    /// listing projection in sync with `rfp.created_at`.
    pub async fn put_rfp(&self, rfp: &Rfp) -> Result<(), RfpError> {
        let item = to_item(
            Self::rfp_key(&rfp.id),
            Some(rfp_core::keys::RFP_LISTING_GSI1PK.to_string()),
            Some(rfp_core::keys::rfp_listing_gsi1sk(rfp.created_at, &rfp.id)),
            rfp,
        )?;
        self.store.put(item, None).await
    }

    /// Reads an RFP profile by id.
    pub async fn get_rfp(&self, rfp_id: &str) -> Result<Option<Rfp>, RfpError> {
        match self.store.get(&Self::rfp_key(rfp_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Lists RFPs, most recently created first.
    pub async fn list_rfps(&self, limit: usize, continuation_token: Option<String>) -> Result<ListPage<Rfp>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Gsi1,
                partition_key: rfp_core::keys::RFP_LISTING_GSI1PK.to_string(),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token,
            })
            .await?;
        Ok(ListPage {
            items: page.items.into_iter().map(from_item).collect::<Result<_, _>>()?,
            continuation_token: page.continuation_token,
        })
    }

    /// Keyword substring search over `title`, `client_name`, and
    /// `project_type`, case-insensitive, scanning at most
    /// [`SEARCH_SCAN_CAP`] listing rows.
    pub async fn search_rfps(&self, query: &str, limit: usize) -> Result<Vec<Rfp>, RfpError> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        let mut continuation_token = None;
        let mut scanned = 0;
        loop {
            let page = self.list_rfps(SEARCH_SCAN_CAP.min(100), continuation_token).await?;
            let exhausted_page = page.continuation_token.is_none();
            scanned += page.items.len();
            for rfp in page.items {
                let haystack = format!(
                    "{} {} {}",
                    rfp.title.to_lowercase(),
                    rfp.client_name.to_lowercase(),
                    rfp.project_type.as_deref().unwrap_or("").to_lowercase()
                );
                if haystack.contains(&needle) {
                    matches.push(rfp);
                    if matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }
            if exhausted_page || scanned >= SEARCH_SCAN_CAP {
                return Ok(matches);
            }
            continuation_token = page.continuation_token;
        }
    }

    fn proposal_key(proposal_id: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::proposal_pk(proposal_id), rfp_core::keys::PROPOSAL_PROFILE_SK)
    }

    /// Writes (creates or overwrites) a proposal profile row, keeping the
    /// GSI1 listing projection in sync with `proposal.created_at`.
    pub async fn put_proposal(&self, proposal: &Proposal) -> Result<(), RfpError> {
        let item = to_item(
            Self::proposal_key(&proposal.id),
            Some(rfp_core::keys::PROPOSAL_LISTING_GSI1PK.to_string()),
            Some(rfp_core::keys::proposal_listing_gsi1sk(proposal.created_at, &proposal.id)),
            proposal,
        )?;
        self.store.put(item, None).await
    }

    /// Reads a proposal profile by id.
    pub async fn get_proposal(&self, proposal_id: &str) -> Result<Option<Proposal>, RfpError> {
        match self.store.get(&Self::proposal_key(proposal_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Lists proposals, most recently created first.
    pub async fn list_proposals(&self, limit: usize, continuation_token: Option<String>) -> Result<ListPage<Proposal>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Gsi1,
                partition_key: rfp_core::keys::PROPOSAL_LISTING_GSI1PK.to_string(),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit,
                continuation_token,
            })
            .await?;
        Ok(ListPage {
            items: page.items.into_iter().map(from_item).collect::<Result<_, _>>()?,
            continuation_token: page.continuation_token,
        })
    }

    /// Keyword substring search over `title` and `stage`, case-insensitive,
    /// scanning at most [`SEARCH_SCAN_CAP`] listing rows.
    pub async fn search_proposals(&self, query: &str, limit: usize) -> Result<Vec<Proposal>, RfpError> {
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        let mut continuation_token = None;
        let mut scanned = 0;
        loop {
            let page = self.list_proposals(SEARCH_SCAN_CAP.min(100), continuation_token).await?;
            let exhausted_page = page.continuation_token.is_none();
            scanned += page.items.len();
            for proposal in page.items {
                let haystack = format!("{} {}", proposal.title.to_lowercase(), proposal.stage.to_lowercase());
                if haystack.contains(&needle) {
                    matches.push(proposal);
                    if matches.len() >= limit {
                        return Ok(matches);
                    }
                }
            }
            if exhausted_page || scanned >= SEARCH_SCAN_CAP {
                return Ok(matches);
            }
            continuation_token = page.continuation_token;
        }
    }

    /// Returns `created_at`-ascending timestamp used only by tests to build
    /// deterministic fixtures; not part of the catalogue's public contract.
    #[cfg(test)]
    fn ts(offset_secs: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc) + chrono::Duration::seconds(offset_secs)
    }
}
