//! RFP profile rows (`spec.md` §3, "RFP").

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata about an automated RFP analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisMeta {
    /// Model used for the most recent analysis pass.
    pub model: Option<String>,
    /// Number of attempts (including retries) taken to extract structure.
    pub attempts: u32,
    /// Number of characters of raw text that were fed to the extractor.
    pub extracted_chars: u64,
}

/// The canonical per-RFP profile row: `pk=RFP#{id}`, `sk=PROFILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rfp {
    /// Stable RFP identifier (used to build the partition key).
    pub id: String,
    /// RFP title.
    pub title: String,
    /// Issuing client's name.
    pub client_name: String,
    /// Final submission deadline, if known.
    pub submission_deadline: Option<DateTime<Utc>>,
    /// Deadline for submitting clarification questions, if known.
    pub questions_deadline: Option<DateTime<Utc>>,
    /// Other named dates extracted from the RFP (label → timestamp).
    pub dates: std::collections::BTreeMap<String, DateTime<Utc>>,
    /// Free-text or structured budget range as extracted.
    pub budget_range: Option<String>,
    /// Project type / category.
    pub project_type: Option<String>,
    /// Delivery location.
    pub location: Option<String>,
    /// Raw extracted text, bounded to a sane size by the caller before write.
    pub raw_text: String,
    /// Key requirements extracted from the RFP body.
    pub key_requirements: Vec<String>,
    /// Deliverables extracted from the RFP body.
    pub deliverables: Vec<String>,
    /// Miscellaneous critical information flagged during analysis.
    pub critical_information: Vec<String>,
    /// Clarification questions generated for the issuer.
    pub clarification_questions: Vec<String>,
    /// Metadata about the extraction pass that produced this row.
    pub analysis: AnalysisMeta,
    /// A 0.0–1.0 fit score for this opportunity, if computed.
    pub fit_score: Option<f64>,
    /// Creation timestamp, used as the GSI1 sort key prefix for listings.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Rfp {
    /// Constructs a new RFP profile with empty extracted fields, stamping
    /// both `created_at` and `updated_at` to `now`.
    pub fn new(id: impl Into<String>, title: impl Into<String>, client_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            client_name: client_name.into(),
            submission_deadline: None,
            questions_deadline: None,
            dates: Default::default(),
            budget_range: None,
            project_type: None,
            location: None,
            raw_text: String::new(),
            key_requirements: Vec::new(),
            deliverables: Vec::new(),
            critical_information: Vec::new(),
            clarification_questions: Vec::new(),
            analysis: AnalysisMeta::default(),
            fit_score: None,
            created_at: now,
            updated_at: now,
        }
    }
}
