//! Contracting cases and versioned contract templates (`spec.md` §3,
//! "ContractingCase" / "ContractTemplate").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The canonical per-case profile row: `pk=CONTRACTING#{id}`, `sk=PROFILE`.
/// Children (`CONTRACT_DOC#{v}`, `BUDGET#{v}`, `SUPPORT_DOC#{id}`,
/// `PACKAGE#{id}`, `ESIGN#{id}`) are addressed by the key-builders in
/// [`crate::keys`] and are not modeled as separate row types here beyond
/// the ids this profile tracks — their bodies are opaque blobs/objects the
/// document-rendering layer owns (out of scope, §1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractingCase {
    /// Stable case identifier.
    pub id: String,
    /// The proposal this contracting case was opened from.
    pub proposal_id: String,
    /// Current contract document version number, if a document exists.
    pub current_contract_doc_version: Option<u32>,
    /// Current budget version number, if a budget exists.
    pub current_budget_version: Option<u32>,
    /// Ids of attached support documents.
    pub support_doc_ids: Vec<String>,
    /// Ids of assembled packages.
    pub package_ids: Vec<String>,
    /// Ids of e-sign envelopes.
    pub esign_ids: Vec<String>,
    /// SHA-256 hex digest of the portal access token, used to build the
    /// `PORTAL_TOKEN#{hash}` GSI1 partition. Never store the raw token.
    pub portal_token_hash: Option<String>,
    /// Case lifecycle stage, e.g. `"drafting"`, `"sent"`, `"signed"`.
    pub stage: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ContractingCase {
    /// Constructs a new contracting case in the `"drafting"` stage.
    pub fn new(id: impl Into<String>, proposal_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            proposal_id: proposal_id.into(),
            current_contract_doc_version: None,
            current_budget_version: None,
            support_doc_ids: Vec::new(),
            package_ids: Vec::new(),
            esign_ids: Vec::new(),
            portal_token_hash: None,
            stage: "drafting".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// The profile row for a contract template version series:
/// `pk=CONTRACT_TEMPLATE#{id}`, `sk=PROFILE`. Points at the current version;
/// advancing it happens transactionally alongside writing the new version
/// (see `rfp-store::Transact`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractTemplate {
    /// Stable template identifier.
    pub id: String,
    /// Human-readable template name.
    pub name: String,
    /// The version number this template currently points to.
    pub current_version: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ContractTemplate {
    /// Constructs a template profile whose current version is `1` (callers
    /// write the matching [`ContractTemplateVersion`] in the same
    /// transaction).
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            current_version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the profile with `current_version` advanced by one and
    /// `updated_at` refreshed, leaving `self` untouched. Callers pair this
    /// with writing a new [`ContractTemplateVersion`] in one transaction
    /// so the pointer and the version series never disagree.
    pub fn advance_version(&self, now: DateTime<Utc>) -> Self {
        Self {
            current_version: self.current_version + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// One immutable version of a contract template:
/// `pk=CONTRACT_TEMPLATE#{id}`, `sk=VERSION#{v}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractTemplateVersion {
    /// Owning template id.
    pub template_id: String,
    /// Version number.
    pub version: u32,
    /// Object-store key holding the template blob (DOCX etc.).
    pub object_key: String,
    /// Who committed this version.
    pub committed_by: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_version_bumps_pointer_and_preserves_id() {
        let now = Utc::now();
        let t = ContractTemplate::new("tmpl1", "MSA", now);
        let later = now + chrono::Duration::seconds(5);
        let advanced = t.advance_version(later);
        assert_eq!(advanced.current_version, 2);
        assert_eq!(advanced.id, t.id);
        assert_eq!(t.current_version, 1, "original is untouched");
    }
}
