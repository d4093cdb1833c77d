//! Skill index metadata rows (`spec.md` §3, "SkillIndex").
//!
//! The row here is metadata only; the skill's body text lives at an
//! object-store key, kept out of the key-value table to respect its size
//! limits.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata row for one stored skill/procedure document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SkillIndex {
    /// Stable skill identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Short description used in retrieval/listing.
    pub description: String,
    /// Freeform tags for keyword matching.
    pub tags: Vec<String>,
    /// Object-store key holding the full skill body text.
    pub body_key: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SkillIndex {
    /// Construct a new skill index row, stamping both timestamps to `now`.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        body_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
            body_key: body_key.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_skill_stamps_timestamps() {
        let now = Utc::now();
        let skill = SkillIndex::new("s1", "Draft intro", "Drafts an intro section", "agent/skills/s1.md", now);
        assert_eq!(skill.created_at, skill.updated_at);
        assert!(skill.tags.is_empty());
    }
}
