//! Proposal rows and their optionally-paged sections (`spec.md` §3,
//! "Proposal").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A proposal document, mirroring the RFP's shape closely enough that the
/// two share analysis/listing conventions but standing alone as its own
/// entity — a proposal can exist, and be edited, independent of the RFP's
/// own lifecycle once drafting starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Proposal {
    /// Stable proposal identifier.
    pub id: String,
    /// The RFP this proposal responds to, if any (a proposal may be
    /// speculative or unsolicited).
    pub rfp_id: Option<String>,
    /// Proposal title.
    pub title: String,
    /// Current drafting stage, e.g. `"draft"`, `"internal_review"`, `"submitted"`.
    pub stage: String,
    /// Section keys present for this proposal, in display order. Section
    /// bodies live in paged `ProposalSection` rows when large.
    pub section_keys: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Constructs a new, empty proposal in the `"draft"` stage.
    pub fn new(id: impl Into<String>, title: impl Into<String>, rfp_id: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            rfp_id,
            title: title.into(),
            stage: "draft".to_string(),
            section_keys: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single paged section of a proposal: `pk=PROPOSAL#{id}`,
/// `sk=SECTION#{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProposalSection {
    /// Owning proposal id.
    pub proposal_id: String,
    /// Section key, e.g. `"executive_summary"`, `"pricing"`.
    pub key: String,
    /// Human-readable section title.
    pub title: String,
    /// Section body. Rendering (DOCX/XLSX) is out of scope here (§1).
    pub body: String,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
