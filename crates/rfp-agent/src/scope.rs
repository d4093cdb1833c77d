//! RFP-scope detection: pulling an `rfp_id` out of a message or thread
//! binding, and classifying whether a message needs one at all
//! (`spec.md` §4.7, step 2 "Scope detection").

use async_trait::async_trait;

/// Finds the first `rfp_` token in `text` (an id is `rfp_` followed by
/// lowercase alphanumerics, at least 8 characters after the prefix).
/// Thread bindings are the primary source of scope once established; this
/// covers the case of a fresh message naming an RFP explicitly.
pub fn extract_rfp_id(text: &str) -> Option<String> {
    for word in text.split(|c: char| c.is_whitespace() || matches!(c, '<' | '>' | ',' | '.' | ';' | '"' | '\'')) {
        let word = word.trim();
        if let Some(rest) = word.strip_prefix("rfp_") {
            let valid_len = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).count();
            if valid_len >= 8 {
                return Some(format!("rfp_{}", &rest[..valid_len]));
            }
        }
    }
    None
}

/// The outcome of classifying whether a message is about a specific RFP.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiresRfp {
    /// `Some(true)` if the message clearly needs an RFP binding,
    /// `Some(false)` if it clearly doesn't, `None` if ambiguous.
    pub value: Option<bool>,
    /// Confidence in `0.0..=1.0`.
    pub confidence: f64,
    /// Keyword(s) that drove the classification, for explainability.
    pub indicators: Vec<String>,
}

/// A pluggable scope classifier. The default implementation
/// ([`KeywordIntentClassifier`]) is a keyword-pattern function; a future ML
/// classifier is a drop-in replacement behind this trait (`spec.md` §9
/// Open Question (b)).
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classifies whether `text` requires an RFP binding to act on.
    async fn classify_requires_rfp(&self, text: &str) -> RequiresRfp;
}

const RFP_SCOPED_KEYWORDS: &[&str] = &[
    "this rfp", "this proposal", "this opportunity", "the deadline", "due date", "submit", "stage", "commitment", "risk", "journal", "summarize this", "status of this",
];

const GENERAL_KEYWORDS: &[&str] = &["how do i", "what is", "help me understand", "can you explain", "list all", "show me all rfps", "general question"];

/// Keyword-bucket classifier grounded on the original metaprompt's
/// `requires_rfp` heuristic: scoped indicators win over general ones when
/// both are present, and no match is ambiguous rather than a guess.
pub struct KeywordIntentClassifier;

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify_requires_rfp(&self, text: &str) -> RequiresRfp {
        let lower = text.to_lowercase();

        let scoped_hits: Vec<String> = RFP_SCOPED_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).map(|kw| kw.to_string()).collect();
        if !scoped_hits.is_empty() {
            return RequiresRfp { value: Some(true), confidence: 0.8, indicators: scoped_hits };
        }

        let general_hits: Vec<String> = GENERAL_KEYWORDS.iter().filter(|kw| lower.contains(*kw)).map(|kw| kw.to_string()).collect();
        if !general_hits.is_empty() {
            return RequiresRfp { value: Some(false), confidence: 0.7, indicators: general_hits };
        }

        RequiresRfp { value: None, confidence: 0.3, indicators: Vec::new() }
    }
}
