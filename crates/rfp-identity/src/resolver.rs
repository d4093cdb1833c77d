//! Identity resolution with a short-lived cache (`spec.md` §4.6).

use crate::directory::DirectoryLookup;
use crate::identity::UserIdentity;
use rfp_error::RfpError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Cache entry lifetime: long enough to cover one agent turn's repeated
/// identity lookups without going stale across a whole conversation.
pub const CACHE_TTL: Duration = Duration::from_secs(120);

fn cache_key(slack_user_id: Option<&str>, team_id: Option<&str>, email: Option<&str>, user_sub: Option<&str>) -> Option<String> {
    if let Some(slack_user_id) = slack_user_id {
        return Some(format!("slack::{}::{}", team_id.unwrap_or(""), slack_user_id));
    }
    if let Some(email) = email {
        return Some(format!("email::{}", email.to_lowercase()));
    }
    if let Some(user_sub) = user_sub {
        return Some(format!("sub::{user_sub}"));
    }
    None
}

/// Resolves a [`UserIdentity`] from whichever identifiers are available,
/// consulting a [`DirectoryLookup`] and caching the result under one of
/// three key shapes (`slack::{team}::{id}`, `email::{lowercased}`,
/// `sub::{sub}`) for [`CACHE_TTL`].
pub struct IdentityResolver {
    directory: Arc<dyn DirectoryLookup>,
    cache: Mutex<HashMap<String, (Instant, UserIdentity)>>,
}

impl IdentityResolver {
    /// Construct a resolver backed by `directory`.
    pub fn new(directory: Arc<dyn DirectoryLookup>) -> Self {
        Self { directory, cache: Mutex::new(HashMap::new()) }
    }

    fn cached(&self, key: &str) -> Option<UserIdentity> {
        let cache = self.cache.lock().unwrap();
        let (stamped_at, identity) = cache.get(key)?;
        if stamped_at.elapsed() < CACHE_TTL {
            Some(identity.clone())
        } else {
            None
        }
    }

    /// Resolves identity from any combination of a Slack user id, email, or
    /// account sub. Slack resolution runs first (and may discover an
    /// email/profile), then email resolution, then a direct profile lookup
    /// by sub. Each strategy only runs if the previous ones left a gap.
    pub async fn resolve(
        &self,
        slack_user_id: Option<&str>,
        slack_team_id: Option<&str>,
        slack_enterprise_id: Option<&str>,
        email: Option<&str>,
        user_sub: Option<&str>,
        force_refresh: bool,
    ) -> Result<UserIdentity, RfpError> {
        let key = cache_key(slack_user_id, slack_team_id, email, user_sub);
        if !force_refresh {
            if let Some(key) = &key {
                if let Some(identity) = self.cached(key) {
                    return Ok(identity);
                }
            }
        }

        let mut resolved_sub = user_sub.map(str::to_string);
        let mut resolved_email = email.map(|e| e.to_lowercase());
        let mut display_name = None;
        let mut user_profile = None;
        let mut slack_user_raw = None;

        if let Some(slack_user_id) = slack_user_id {
            if let Some(slack_user) = self.directory.slack_user_info(slack_user_id).await? {
                display_name = slack_user.display_name.clone();
                if resolved_email.is_none() {
                    resolved_email = slack_user.email.clone().map(|e| e.to_lowercase());
                }
                slack_user_raw = Some(slack_user.raw);
            }
            if resolved_sub.is_none() {
                if let Some((sub, profile)) = self.directory.profile_by_slack_user_id(slack_user_id).await? {
                    resolved_sub = Some(sub);
                    user_profile = Some(profile);
                }
            }
        }

        if resolved_sub.is_none() {
            if let Some(email) = &resolved_email {
                resolved_sub = self.directory.user_sub_by_email(email).await?;
                if let Some(sub) = &resolved_sub {
                    user_profile = self.directory.profile_by_user_sub(sub).await?;
                    self.directory.upsert_email_index(email, sub).await?;
                }
            }
        }

        if user_profile.is_none() {
            if let Some(sub) = &resolved_sub {
                user_profile = self.directory.profile_by_user_sub(sub).await?;
            }
        }

        let identity = UserIdentity {
            user_sub: resolved_sub,
            slack_user_id: slack_user_id.map(str::to_string),
            slack_team_id: slack_team_id.map(str::to_string),
            slack_enterprise_id: slack_enterprise_id.map(str::to_string),
            email: resolved_email.clone(),
            display_name,
            user_profile,
            slack_user: slack_user_raw,
        };

        let cache_key = cache_key(slack_user_id, slack_team_id, resolved_email.as_deref(), identity.user_sub.as_deref());
        if let Some(cache_key) = cache_key {
            self.cache.lock().unwrap().insert(cache_key, (Instant::now(), identity.clone()));
        }

        tracing::debug!(
            target: "rfp.identity",
            slack_user_id,
            resolved_sub = identity.user_sub.as_deref(),
            "identity_resolved"
        );

        Ok(identity)
    }

    /// Convenience wrapper for resolving from a Slack user id alone.
    /// Returns an empty identity if `slack_user_id` is `None`.
    pub async fn resolve_from_slack(
        &self,
        slack_user_id: Option<&str>,
        slack_team_id: Option<&str>,
        slack_enterprise_id: Option<&str>,
        force_refresh: bool,
    ) -> Result<UserIdentity, RfpError> {
        let Some(slack_user_id) = slack_user_id else {
            return Ok(UserIdentity::default());
        };
        self.resolve(Some(slack_user_id), slack_team_id, slack_enterprise_id, None, None, force_refresh).await
    }

    /// Convenience wrapper for resolving from an email address alone.
    pub async fn resolve_from_email(&self, email: &str, force_refresh: bool) -> Result<UserIdentity, RfpError> {
        self.resolve(None, None, None, Some(email), None, force_refresh).await
    }

    /// Convenience wrapper for resolving from an account sub alone.
    pub async fn resolve_from_user_sub(&self, user_sub: &str, force_refresh: bool) -> Result<UserIdentity, RfpError> {
        self.resolve(None, None, None, None, Some(user_sub), force_refresh).await
    }

    /// Clears every cached identity.
    pub fn clear_cache(&self) {
        self.cache.lock().unwrap().clear();
        tracing::info!(target: "rfp.identity", "identity_cache_cleared");
    }
}
