// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the RFP operator
//! platform.
//!
//! [`PlatformConfig`] is the top-level settings document: model chains and
//! per-purpose AI tuning, budget defaults, channel/repo/domain allowlists,
//! and resilience knobs. It loads from TOML, emits advisory
//! [`ConfigWarning`]s for things worth a human's attention, and merges a
//! base config with an overlay (env-var-derived or file-derived) via
//! [`PlatformConfig::merge`].
#![deny(unsafe_code)]
#![warn(missing_docs)]

use rfp_error::{ErrorCode, RfpError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file could not be parsed as TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Parser diagnostic.
        reason: String,
    },
    /// Semantic validation failed.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual failure messages.
        reasons: Vec<String>,
    },
    /// Merging a base config with an overlay hit a hard conflict.
    #[error("merge conflict: {reason}")]
    MergeConflict {
        /// Description of the conflict.
        reason: String,
    },
}

impl From<ConfigError> for RfpError {
    fn from(e: ConfigError) -> Self {
        match &e {
            ConfigError::FileNotFound { .. } => RfpError::new(ErrorCode::NotConfigured, e.to_string()),
            ConfigError::ParseError { .. } | ConfigError::ValidationError { .. } => {
                RfpError::new(ErrorCode::Internal, e.to_string())
            }
            ConfigError::MergeConflict { .. } => RfpError::new(ErrorCode::Internal, e.to_string()),
        }
    }
}

/// Advisory issue surfaced during validation; never blocks loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A deprecated field is set.
    DeprecatedField {
        /// Field name.
        field: String,
        /// Suggested replacement.
        suggestion: Option<String>,
    },
    /// A recommended field is unset; a default will be used.
    MissingOptionalField {
        /// Field name.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// A timeout or budget value is unusually large.
    UnusuallyLarge {
        /// Field name.
        field: String,
        /// The value observed.
        value: f64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeprecatedField { field, suggestion } => {
                write!(f, "deprecated field '{field}'")?;
                if let Some(s) = suggestion {
                    write!(f, " — use '{s}' instead")?;
                }
                Ok(())
            }
            Self::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            Self::UnusuallyLarge { field, value } => {
                write!(f, "'{field}' is unusually large: {value}")
            }
        }
    }
}

/// Per-purpose AI model chain: primary → global default → known-safe, per
/// spec.md §4.5.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ModelChainConfig {
    /// Purpose key, e.g. `"metaprompt_analysis"`, `"rfp_extraction"`.
    pub purpose: String,
    /// Ordered model identifiers to try.
    pub models: Vec<String>,
    /// Default reasoning effort for the first attempt.
    #[serde(default = "default_effort")]
    pub default_effort: String,
}

fn default_effort() -> String {
    "medium".to_string()
}

/// Global budget defaults (spec.md §4.1).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct BudgetDefaults {
    /// Default minutes of wall-clock budget when neither cost nor minutes
    /// is supplied by the caller.
    #[serde(default = "default_minutes")]
    pub default_minutes: f64,
    /// Cost anchor: `(hours, usd)` such that `usd` of output-priced tokens
    /// buys `hours` of agent time. Spec default is `(4.0, 10.0)`.
    #[serde(default = "default_anchor")]
    pub cost_anchor_hours: f64,
    /// See [`Self::cost_anchor_hours`].
    #[serde(default = "default_anchor_usd")]
    pub cost_anchor_usd: f64,
}

fn default_minutes() -> f64 {
    15.0
}
fn default_anchor() -> f64 {
    4.0
}
fn default_anchor_usd() -> f64 {
    10.0
}

impl Default for BudgetDefaults {
    fn default() -> Self {
        Self {
            default_minutes: default_minutes(),
            cost_anchor_hours: default_anchor(),
            cost_anchor_usd: default_anchor_usd(),
        }
    }
}

/// Allowlists enforced at the policy/tool boundary (spec.md §6, §7).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Allowlists {
    /// Slack channel IDs the agent may read/post in. Empty means
    /// unrestricted.
    #[serde(default)]
    pub slack_channels: Vec<String>,
    /// `owner/repo` entries the GitHub tools may touch. Empty means
    /// unrestricted.
    #[serde(default)]
    pub github_repos: Vec<String>,
    /// Object store key prefixes the object store adapter will accept.
    #[serde(default = "default_object_prefixes")]
    pub object_key_prefixes: Vec<String>,
    /// Domains the browser worker may navigate to. Empty means
    /// unrestricted.
    #[serde(default)]
    pub browser_domains: Vec<String>,
}

fn default_object_prefixes() -> Vec<String> {
    vec![
        "rfp/".to_string(),
        "team/".to_string(),
        "contracting/".to_string(),
        "agent/".to_string(),
    ]
}

/// Resilience tuning (spec.md §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ResilienceConfig {
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter fraction applied to computed delays (0.0-1.0).
    #[serde(default = "default_jitter")]
    pub jitter: f64,
    /// Consecutive retryable failures within the rolling window that open
    /// the AI client's circuit breaker.
    #[serde(default = "default_circuit_threshold")]
    pub circuit_breaker_threshold: u32,
    /// Rolling window (seconds) the circuit breaker counts failures over.
    #[serde(default = "default_circuit_window_secs")]
    pub circuit_breaker_window_secs: u64,
    /// How long (seconds) the circuit stays open once tripped.
    #[serde(default = "default_circuit_open_secs")]
    pub circuit_breaker_open_secs: u64,
}

fn default_base_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30_000
}
fn default_jitter() -> f64 {
    0.2
}
fn default_circuit_threshold() -> u32 {
    5
}
fn default_circuit_window_secs() -> u64 {
    60
}
fn default_circuit_open_secs() -> u64 {
    15
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
            circuit_breaker_threshold: default_circuit_threshold(),
            circuit_breaker_window_secs: default_circuit_window_secs(),
            circuit_breaker_open_secs: default_circuit_open_secs(),
        }
    }
}

/// Top-level settings document for the RFP operator platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PlatformConfig {
    /// Environment label, e.g. `"production"`, `"staging"`.
    #[serde(default)]
    pub env: Option<String>,
    /// Per-purpose AI model chains.
    #[serde(default)]
    pub model_chains: Vec<ModelChainConfig>,
    /// Budget defaults.
    #[serde(default)]
    pub budget: BudgetDefaults,
    /// Allowlists.
    #[serde(default)]
    pub allowlists: Allowlists,
    /// Resilience tuning.
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// Free-form vendor-specific overrides (merged last, shallow).
    #[serde(default)]
    pub vendor: BTreeMap<String, serde_json::Value>,
}

impl PlatformConfig {
    /// Loads a [`PlatformConfig`] from a TOML file on disk.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::load_from_str(&text)
    }

    /// Parses a [`PlatformConfig`] from a TOML string.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })
    }

    /// Runs semantic validation, returning advisory warnings (never
    /// blocking) alongside any hard validation errors.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.budget.default_minutes <= 0.0 {
            errors.push("budget.default_minutes must be positive".to_string());
        }
        if self.budget.cost_anchor_hours <= 0.0 || self.budget.cost_anchor_usd <= 0.0 {
            errors.push("budget.cost_anchor_hours and cost_anchor_usd must be positive".to_string());
        }
        if self.resilience.jitter < 0.0 || self.resilience.jitter > 1.0 {
            errors.push("resilience.jitter must be within [0.0, 1.0]".to_string());
        }
        if self.resilience.max_delay_ms < self.resilience.base_delay_ms {
            errors.push("resilience.max_delay_ms must be >= base_delay_ms".to_string());
        }
        if self.model_chains.is_empty() {
            warnings.push(ConfigWarning::MissingOptionalField {
                field: "model_chains".to_string(),
                hint: "no per-purpose model chain configured; callers must supply one explicitly"
                    .to_string(),
            });
        }
        if self.allowlists.slack_channels.is_empty() {
            warnings.push(ConfigWarning::MissingOptionalField {
                field: "allowlists.slack_channels".to_string(),
                hint: "unrestricted: the agent may post to any channel".to_string(),
            });
        }
        if self.resilience.max_delay_ms > 300_000 {
            warnings.push(ConfigWarning::UnusuallyLarge {
                field: "resilience.max_delay_ms".to_string(),
                value: self.resilience.max_delay_ms as f64,
            });
        }

        if !errors.is_empty() {
            return Err(ConfigError::ValidationError { reasons: errors });
        }
        Ok(warnings)
    }

    /// Looks up the model chain configured for `purpose`, if any.
    pub fn model_chain_for(&self, purpose: &str) -> Option<&ModelChainConfig> {
        self.model_chains.iter().find(|c| c.purpose == purpose)
    }

    /// Merges `overlay` onto `self`, overlay winning on scalar fields and
    /// concatenating + deduping list fields. `vendor` maps are merged key
    /// by key, overlay winning on conflicts.
    pub fn merge(mut self, overlay: PlatformConfig) -> Result<Self, ConfigError> {
        if let Some(env) = overlay.env {
            self.env = Some(env);
        }
        for chain in overlay.model_chains {
            if let Some(existing) = self
                .model_chains
                .iter_mut()
                .find(|c| c.purpose == chain.purpose)
            {
                *existing = chain;
            } else {
                self.model_chains.push(chain);
            }
        }
        if overlay.budget != BudgetDefaults::default() {
            self.budget = overlay.budget;
        }
        for ch in overlay.allowlists.slack_channels {
            if !self.allowlists.slack_channels.contains(&ch) {
                self.allowlists.slack_channels.push(ch);
            }
        }
        for repo in overlay.allowlists.github_repos {
            if !self.allowlists.github_repos.contains(&repo) {
                self.allowlists.github_repos.push(repo);
            }
        }
        for prefix in overlay.allowlists.object_key_prefixes {
            if !self.allowlists.object_key_prefixes.contains(&prefix) {
                self.allowlists.object_key_prefixes.push(prefix);
            }
        }
        for domain in overlay.allowlists.browser_domains {
            if !self.allowlists.browser_domains.contains(&domain) {
                self.allowlists.browser_domains.push(domain);
            }
        }
        if overlay.resilience != ResilienceConfig::default() {
            self.resilience = overlay.resilience;
        }
        for (k, v) in overlay.vendor {
            self.vendor.insert(k, v);
        }
        Ok(self)
    }
}
