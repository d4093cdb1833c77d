//! Contracting case and contract template repository (`spec.md` §3).

use chrono::{DateTime, Utc};
use rfp_core::{ContractTemplate, ContractTemplateVersion, ContractingCase};
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey, KeyValueStore, QueryIndex, QueryRequest, ScanDirection, TransactItem};
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

/// Repository over contracting cases and contract template version series.
pub struct ContractingRepo {
    store: Arc<dyn KeyValueStore>,
}

impl ContractingRepo {
    /// Construct a repo backed by `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn case_key(case_id: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::contracting_pk(case_id), rfp_core::keys::CONTRACTING_PROFILE_SK)
    }

    /// Opens a new contracting case for `proposal_id`, failing if `case_id`
    /// is already taken.
    pub async fn create_case(&self, case_id: &str, proposal_id: &str, now: DateTime<Utc>) -> Result<ContractingCase, RfpError> {
        let case = ContractingCase::new(case_id, proposal_id, now);
        let item = to_item(
            Self::case_key(case_id),
            Some(rfp_core::keys::proposal_contracting_gsi1pk(proposal_id)),
            Some(format!("{}#{case_id}", now.to_rfc3339())),
            &case,
        )?;
        self.store.put(item, Some(Condition::NotExists)).await?;
        Ok(case)
    }

    /// Reads a contracting case by its own id.
    pub async fn get_case(&self, case_id: &str) -> Result<Option<ContractingCase>, RfpError> {
        match self.store.get(&Self::case_key(case_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Finds the most recently opened contracting case for `proposal_id`,
    /// if one exists.
    pub async fn get_case_by_proposal(&self, proposal_id: &str) -> Result<Option<ContractingCase>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Gsi1,
                partition_key: rfp_core::keys::proposal_contracting_gsi1pk(proposal_id),
                sort_key_prefix: None,
                direction: ScanDirection::Backward,
                limit: 1,
                continuation_token: None,
            })
            .await?;
        match page.items.into_iter().next() {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Overwrites a case's profile row (the caller supplies the full,
    /// already-mutated case).
    pub async fn put_case(&self, case: &ContractingCase) -> Result<(), RfpError> {
        let item = to_item(
            Self::case_key(&case.id),
            Some(rfp_core::keys::proposal_contracting_gsi1pk(&case.proposal_id)),
            Some(format!("{}#{}", case.updated_at.to_rfc3339(), case.id)),
            case,
        )?;
        self.store.put(item, None).await
    }

    fn template_key(template_id: &str) -> ItemKey {
        ItemKey::new(rfp_core::keys::contract_template_pk(template_id), rfp_core::keys::CONTRACT_TEMPLATE_PROFILE_SK)
    }

    /// Creates a template profile with no versions yet committed.
    pub async fn create_template(&self, template_id: &str, name: &str, now: DateTime<Utc>) -> Result<ContractTemplate, RfpError> {
        let template = ContractTemplate::new(template_id, name, now);
        let item = to_item(Self::template_key(template_id), None, None, &template)?;
        self.store.put(item, Some(Condition::NotExists)).await?;
        Ok(template)
    }

    /// Reads a template profile.
    pub async fn get_template(&self, template_id: &str) -> Result<Option<ContractTemplate>, RfpError> {
        match self.store.get(&Self::template_key(template_id)).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Reads one immutable template version.
    pub async fn get_template_version(&self, template_id: &str, version: u32) -> Result<Option<ContractTemplateVersion>, RfpError> {
        let key = ItemKey::new(rfp_core::keys::contract_template_pk(template_id), rfp_core::keys::contract_template_version_sk(version));
        match self.store.get(&key).await? {
            Some(item) => Ok(Some(from_item(item)?)),
            None => Ok(None),
        }
    }

    /// Commits a new immutable template version and atomically advances the
    /// template's current-version pointer in the same transaction, so the
    /// pointer and the version series can never disagree.
    pub async fn add_template_version(
        &self,
        template_id: &str,
        object_key: &str,
        committed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<ContractTemplateVersion, RfpError> {
        let template = self
            .get_template(template_id)
            .await?
            .ok_or_else(|| RfpError::new(ErrorCode::NotFound, "contract template does not exist"))?;
        let advanced = template.advance_version(now);
        let version = ContractTemplateVersion {
            template_id: template_id.to_string(),
            version: advanced.current_version,
            object_key: object_key.to_string(),
            committed_by: committed_by.to_string(),
            created_at: now,
        };

        let version_key = ItemKey::new(rfp_core::keys::contract_template_pk(template_id), rfp_core::keys::contract_template_version_sk(version.version));
        let version_item = to_item(version_key, None, None, &version)?;
        let pointer_item = to_item(Self::template_key(template_id), None, None, &advanced)?;

        self.store
            .transact(vec![
                TransactItem::Put { item: version_item, condition: Some(Condition::NotExists) },
                TransactItem::Put { item: pointer_item, condition: Some(Condition::Exists) },
            ])
            .await?;

        Ok(version)
    }

    /// Lists a template's committed versions, most recent first.
    pub async fn list_template_versions(&self, template_id: &str, limit: usize) -> Result<Vec<ContractTemplateVersion>, RfpError> {
        let page = self
            .store
            .query(QueryRequest {
                index: QueryIndex::Primary,
                partition_key: rfp_core::keys::contract_template_pk(template_id),
                sort_key_prefix: Some("VERSION#".to_string()),
                direction: ScanDirection::Backward,
                limit,
                continuation_token: None,
            })
            .await?;
        page.items.into_iter().map(from_item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_store::InMemoryKeyValueStore;

    fn repo() -> ContractingRepo {
        ContractingRepo::new(InMemoryKeyValueStore::shared())
    }

    #[tokio::test]
    async fn create_and_find_case_by_proposal() {
        let repo = repo();
        let now = Utc::now();
        repo.create_case("case1", "prop1", now).await.unwrap();
        let found = repo.get_case_by_proposal("prop1").await.unwrap().unwrap();
        assert_eq!(found.id, "case1");
        assert_eq!(found.stage, "drafting");
    }

    #[tokio::test]
    async fn duplicate_case_id_conflicts() {
        let repo = repo();
        let now = Utc::now();
        repo.create_case("case1", "prop1", now).await.unwrap();
        let err = repo.create_case("case1", "prop2", now).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn template_version_pointer_advances_atomically() {
        let repo = repo();
        let now = Utc::now();
        repo.create_template("tmpl1", "MSA", now).await.unwrap();

        let v1 = repo.add_template_version("tmpl1", "templates/msa-v1.docx", "alice", now).await.unwrap();
        assert_eq!(v1.version, 1);
        let template = repo.get_template("tmpl1").await.unwrap().unwrap();
        assert_eq!(template.current_version, 1);

        let later = now + chrono::Duration::seconds(5);
        let v2 = repo.add_template_version("tmpl1", "templates/msa-v2.docx", "bob", later).await.unwrap();
        assert_eq!(v2.version, 2);
        let template = repo.get_template("tmpl1").await.unwrap().unwrap();
        assert_eq!(template.current_version, 2);

        let versions = repo.list_template_versions("tmpl1", 10).await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2, "most recent first");
    }

    #[tokio::test]
    async fn add_version_fails_for_missing_template() {
        let repo = repo();
        let err = repo.add_template_version("missing", "key", "alice", Utc::now()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
