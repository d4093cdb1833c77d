// SPDX-License-Identifier: MIT OR Apache-2.0
//! Environment variable overlay for [`rfp_config::PlatformConfig`].
//!
//! Reads `RFP_*` variables into a sparse [`PlatformConfig`] overlay that
//! can be merged onto a file-loaded base via
//! [`PlatformConfig::merge`](rfp_config::PlatformConfig::merge), so a
//! deployment can override individual settings without forking the TOML
//! file.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use rfp_config::{Allowlists, BudgetDefaults, PlatformConfig, ResilienceConfig};
use std::env::VarError;

/// Reads one environment variable, treating "unset" and "not valid
/// unicode" identically as absence.
fn read(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.is_empty() => Some(v),
        Ok(_) => None,
        Err(VarError::NotPresent | VarError::NotUnicode(_)) => None,
    }
}

fn read_f64(key: &str) -> Option<f64> {
    read(key).and_then(|v| v.parse().ok())
}

fn read_u64(key: &str) -> Option<u64> {
    read(key).and_then(|v| v.parse().ok())
}

fn read_list(key: &str) -> Vec<String> {
    read(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Builds a [`PlatformConfig`] overlay from the process environment.
///
/// Recognized variables:
/// - `RFP_ENV`
/// - `RFP_BUDGET_DEFAULT_MINUTES`, `RFP_BUDGET_COST_ANCHOR_HOURS`,
///   `RFP_BUDGET_COST_ANCHOR_USD`
/// - `RFP_SLACK_CHANNELS`, `RFP_GITHUB_REPOS`, `RFP_BROWSER_DOMAINS`
///   (comma-separated)
/// - `RFP_RESILIENCE_BASE_DELAY_MS`, `RFP_RESILIENCE_MAX_DELAY_MS`,
///   `RFP_RESILIENCE_JITTER`, `RFP_RESILIENCE_CIRCUIT_BREAKER_THRESHOLD`,
///   `RFP_RESILIENCE_CIRCUIT_BREAKER_WINDOW_SECS`,
///   `RFP_RESILIENCE_CIRCUIT_BREAKER_OPEN_SECS`
///
/// Fields with no corresponding variable set are left at
/// [`PlatformConfig::default`], so merging this overlay onto a base config
/// never clobbers a value the base already set (scalar merge semantics
/// are the base's responsibility, see
/// [`PlatformConfig::merge`](rfp_config::PlatformConfig::merge)).
pub fn overlay_from_env() -> PlatformConfig {
    let mut overlay = PlatformConfig {
        env: read("RFP_ENV"),
        ..PlatformConfig::default()
    };

    if let Some(v) = read_f64("RFP_BUDGET_DEFAULT_MINUTES") {
        overlay.budget.default_minutes = v;
    }
    if let Some(v) = read_f64("RFP_BUDGET_COST_ANCHOR_HOURS") {
        overlay.budget.cost_anchor_hours = v;
    }
    if let Some(v) = read_f64("RFP_BUDGET_COST_ANCHOR_USD") {
        overlay.budget.cost_anchor_usd = v;
    }

    overlay.allowlists.slack_channels = read_list("RFP_SLACK_CHANNELS");
    overlay.allowlists.github_repos = read_list("RFP_GITHUB_REPOS");
    overlay.allowlists.browser_domains = read_list("RFP_BROWSER_DOMAINS");
    let object_prefixes = read_list("RFP_OBJECT_KEY_PREFIXES");
    if !object_prefixes.is_empty() {
        overlay.allowlists.object_key_prefixes = object_prefixes;
    }

    if let Some(v) = read_u64("RFP_RESILIENCE_BASE_DELAY_MS") {
        overlay.resilience.base_delay_ms = v;
    }
    if let Some(v) = read_u64("RFP_RESILIENCE_MAX_DELAY_MS") {
        overlay.resilience.max_delay_ms = v;
    }
    if let Some(v) = read_f64("RFP_RESILIENCE_JITTER") {
        overlay.resilience.jitter = v;
    }
    if let Some(v) = read("RFP_RESILIENCE_CIRCUIT_BREAKER_THRESHOLD").and_then(|v| v.parse().ok()) {
        overlay.resilience.circuit_breaker_threshold = v;
    }
    if let Some(v) = read_u64("RFP_RESILIENCE_CIRCUIT_BREAKER_WINDOW_SECS") {
        overlay.resilience.circuit_breaker_window_secs = v;
    }
    if let Some(v) = read_u64("RFP_RESILIENCE_CIRCUIT_BREAKER_OPEN_SECS") {
        overlay.resilience.circuit_breaker_open_secs = v;
    }

    overlay
}

/// Loads the base config from `path`, then merges an [`overlay_from_env`]
/// overlay on top of it. This is the entry point most binaries should use
/// (`spec.md` §9 "Configuration").
pub fn load_with_env_overlay(path: impl AsRef<std::path::Path>) -> Result<PlatformConfig, rfp_config::ConfigError> {
    let base = PlatformConfig::load_from_file(path)?;
    base.merge(overlay_from_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_to_an_empty_overlay() {
        let _guard = ENV_LOCK.lock().unwrap();
        for key in [
            "RFP_ENV",
            "RFP_BUDGET_DEFAULT_MINUTES",
            "RFP_SLACK_CHANNELS",
        ] {
            std::env::remove_var(key);
        }
        let overlay = overlay_from_env();
        assert_eq!(overlay.env, None);
        assert_eq!(overlay.budget, BudgetDefaults::default());
        assert_eq!(overlay.allowlists, Allowlists::default());
    }

    #[test]
    fn reads_scalar_and_list_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("RFP_ENV", "staging");
        std::env::set_var("RFP_BUDGET_DEFAULT_MINUTES", "30");
        std::env::set_var("RFP_SLACK_CHANNELS", "C1, C2 ,C3");

        let overlay = overlay_from_env();
        assert_eq!(overlay.env.as_deref(), Some("staging"));
        assert_eq!(overlay.budget.default_minutes, 30.0);
        assert_eq!(overlay.allowlists.slack_channels, vec!["C1", "C2", "C3"]);
        assert_eq!(overlay.resilience, ResilienceConfig::default());

        std::env::remove_var("RFP_ENV");
        std::env::remove_var("RFP_BUDGET_DEFAULT_MINUTES");
        std::env::remove_var("RFP_SLACK_CHANNELS");
    }
}
