//! Allowlist policy: tools, channels, repos, browser domains, and
//! object-store key prefixes (`spec.md` §6, §9 `DomainNotAllowed` /
//! `KeyNotAllowed` / `ChannelNotAllowed` / `RepoNotAllowed`).

use rfp_glob::{IncludeExcludeGlobs, MatchDecision};
use serde::{Deserialize, Serialize};

/// Outcome of an allowlist check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Human-readable reason, set when `allowed` is false.
    pub reason: Option<String>,
}

impl Decision {
    /// Construct an allowing decision.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Construct a denying decision with a reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

fn decide(globs: &IncludeExcludeGlobs, subject: &str, what: &str) -> Decision {
    match globs.decide_str(subject) {
        MatchDecision::Allowed => Decision::allow(),
        MatchDecision::DeniedByExclude => {
            Decision::deny(format!("{what} '{subject}' is explicitly denied"))
        }
        MatchDecision::DeniedByMissingInclude => {
            Decision::deny(format!("{what} '{subject}' is not in the allowlist"))
        }
    }
}

/// Object store key prefixes the agent may write into (§6).
pub const DEFAULT_KEY_PREFIXES: &[&str] = &["rfp/**", "team/**", "contracting/**", "agent/**"];

/// Compiled allowlists for tool names, chat channels, git repos, browser
/// domains, and object-store key prefixes.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    tools: IncludeExcludeGlobs,
    channels: IncludeExcludeGlobs,
    repos: IncludeExcludeGlobs,
    domains: IncludeExcludeGlobs,
    key_prefixes: IncludeExcludeGlobs,
}

/// Source configuration for a [`PolicyEngine`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowlistConfig {
    /// Tool name allowlist (empty = allow all).
    pub allowed_tools: Vec<String>,
    /// Tool name denylist (checked after the allowlist).
    pub denied_tools: Vec<String>,
    /// Chat channel id allowlist (empty = allow all).
    pub allowed_channels: Vec<String>,
    /// Git repository (`owner/name`) allowlist (empty = allow all).
    pub allowed_repos: Vec<String>,
    /// Browser-automation domain allowlist (empty = allow all).
    pub allowed_domains: Vec<String>,
    /// Object-store key-prefix allowlist; defaults to
    /// [`DEFAULT_KEY_PREFIXES`] when empty.
    pub allowed_key_prefixes: Vec<String>,
}

impl PolicyEngine {
    /// Compile the allowlist config into ready-to-evaluate glob sets.
    pub fn new(config: &AllowlistConfig) -> anyhow::Result<Self> {
        let no_deny: &[String] = &[];
        let key_prefixes: Vec<String> = if config.allowed_key_prefixes.is_empty() {
            DEFAULT_KEY_PREFIXES.iter().map(|s| s.to_string()).collect()
        } else {
            config.allowed_key_prefixes.clone()
        };
        Ok(Self {
            tools: IncludeExcludeGlobs::new(&config.allowed_tools, &config.denied_tools)?,
            channels: IncludeExcludeGlobs::new(&config.allowed_channels, no_deny)?,
            repos: IncludeExcludeGlobs::new(&config.allowed_repos, no_deny)?,
            domains: IncludeExcludeGlobs::new(&config.allowed_domains, no_deny)?,
            key_prefixes: IncludeExcludeGlobs::new(&key_prefixes, no_deny)?,
        })
    }

    /// Check whether a tool may be invoked.
    pub fn can_use_tool(&self, tool_name: &str) -> Decision {
        decide(&self.tools, tool_name, "tool")
    }

    /// Check whether the agent may post into / read from a chat channel.
    pub fn can_access_channel(&self, channel_id: &str) -> Decision {
        decide(&self.channels, channel_id, "channel")
    }

    /// Check whether the agent may act against a git repository.
    pub fn can_access_repo(&self, repo: &str) -> Decision {
        decide(&self.repos, repo, "repo")
    }

    /// Check whether the browser worker may navigate to a domain.
    pub fn can_access_domain(&self, domain: &str) -> Decision {
        decide(&self.domains, domain, "domain")
    }

    /// Check whether an object-store key may be written (matched against
    /// its prefix, e.g. `rfp/123/analysis.json` → prefix `rfp/`).
    pub fn can_use_key(&self, key: &str) -> Decision {
        decide(&self.key_prefixes, key, "key")
    }
}
