//! Directory lookups an [`crate::resolver::IdentityResolver`] composes to
//! resolve an identity (`spec.md` §4.6).

use async_trait::async_trait;
use rfp_error::RfpError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A Slack workspace's profile for one user, as returned by `users.info`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlackUser {
    /// Display name, preferring the profile's `display_name` over `real_name`.
    pub display_name: Option<String>,
    /// Email address from the user's Slack profile, if shared.
    pub email: Option<String>,
    /// Raw Slack API payload, kept opaque for callers that need more than
    /// display name and email.
    pub raw: Value,
}

/// Backend over the directories an identity resolution may consult: Slack's
/// user directory, and the platform's own user-profile/email-index store.
/// Implementations live outside this crate (e.g. a Slack Web API client, a
/// [`crate::keys`]-addressed `rfp-store` repository); this crate only
/// depends on the trait.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Looks up a Slack user's profile by their Slack user id.
    async fn slack_user_info(&self, user_id: &str) -> Result<Option<SlackUser>, RfpError>;

    /// Looks up a platform user profile previously linked to a Slack user id.
    async fn profile_by_slack_user_id(&self, slack_user_id: &str) -> Result<Option<(String, Value)>, RfpError>;

    /// Looks up the user sub indexed under a lowercased email address.
    async fn user_sub_by_email(&self, email: &str) -> Result<Option<String>, RfpError>;

    /// Looks up a platform user profile by user sub.
    async fn profile_by_user_sub(&self, user_sub: &str) -> Result<Option<Value>, RfpError>;

    /// Records that `email` resolves to `user_sub`, for future lookups.
    async fn upsert_email_index(&self, email: &str, user_sub: &str) -> Result<(), RfpError>;
}

/// In-memory [`DirectoryLookup`] reference implementation, for tests and
/// local development.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    slack_users: Mutex<BTreeMap<String, SlackUser>>,
    slack_to_sub: Mutex<BTreeMap<String, String>>,
    email_to_sub: Mutex<BTreeMap<String, String>>,
    profiles: Mutex<BTreeMap<String, Value>>,
}

impl InMemoryDirectory {
    /// Construct an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a Slack user's profile.
    pub fn seed_slack_user(&self, user_id: impl Into<String>, user: SlackUser) {
        self.slack_users.lock().unwrap().insert(user_id.into(), user);
    }

    /// Links a Slack user id to a platform user sub.
    pub fn seed_slack_link(&self, slack_user_id: impl Into<String>, user_sub: impl Into<String>) {
        self.slack_to_sub.lock().unwrap().insert(slack_user_id.into(), user_sub.into());
    }

    /// Seeds a platform user profile.
    pub fn seed_profile(&self, user_sub: impl Into<String>, profile: Value) {
        self.profiles.lock().unwrap().insert(user_sub.into(), profile);
    }
}

#[async_trait]
impl DirectoryLookup for InMemoryDirectory {
    async fn slack_user_info(&self, user_id: &str) -> Result<Option<SlackUser>, RfpError> {
        Ok(self.slack_users.lock().unwrap().get(user_id).cloned())
    }

    async fn profile_by_slack_user_id(&self, slack_user_id: &str) -> Result<Option<(String, Value)>, RfpError> {
        let sub = self.slack_to_sub.lock().unwrap().get(slack_user_id).cloned();
        Ok(match sub {
            Some(sub) => self.profiles.lock().unwrap().get(&sub).cloned().map(|p| (sub, p)),
            None => None,
        })
    }

    async fn user_sub_by_email(&self, email: &str) -> Result<Option<String>, RfpError> {
        Ok(self.email_to_sub.lock().unwrap().get(&email.to_lowercase()).cloned())
    }

    async fn profile_by_user_sub(&self, user_sub: &str) -> Result<Option<Value>, RfpError> {
        Ok(self.profiles.lock().unwrap().get(user_sub).cloned())
    }

    async fn upsert_email_index(&self, email: &str, user_sub: &str) -> Result<(), RfpError> {
        self.email_to_sub.lock().unwrap().insert(email.to_lowercase(), user_sub.to_string());
        Ok(())
    }
}
