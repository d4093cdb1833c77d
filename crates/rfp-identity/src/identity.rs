//! The resolved identity type itself.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user's identity as resolved across Slack, email, and the platform's
/// own account sub. Any subset of fields may be populated depending on
/// which identifiers were available and what the directories returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UserIdentity {
    /// Platform account identifier (the primary key once known).
    pub user_sub: Option<String>,
    /// Slack user id, e.g. `"U0123456"`.
    pub slack_user_id: Option<String>,
    /// Slack workspace/team id.
    pub slack_team_id: Option<String>,
    /// Slack Enterprise Grid org id, if applicable.
    pub slack_enterprise_id: Option<String>,
    /// Lowercased email address.
    pub email: Option<String>,
    /// Best-effort display name.
    pub display_name: Option<String>,
    /// The platform's own user profile document, if one was found.
    pub user_profile: Option<Value>,
    /// The raw Slack user payload, if a Slack lookup ran.
    pub slack_user: Option<Value>,
}
