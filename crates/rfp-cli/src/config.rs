// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading and validation for the RFP operator CLI.

use rfp_config::{ConfigError, ConfigWarning, PlatformConfig};
use std::path::Path;

/// Loads a platform configuration, applying the `RFP_*` environment
/// overlay, and validates it. `path` absent loads nothing but the
/// environment overlay on top of [`PlatformConfig::default`], mirroring
/// `abp-cli`'s optional `backplane.toml`.
pub fn load_and_validate(path: Option<&Path>) -> Result<(PlatformConfig, Vec<ConfigWarning>), ConfigError> {
    let config = match path {
        Some(p) => rfp_config_env::load_with_env_overlay(p)?,
        None => PlatformConfig::default().merge(rfp_config_env::overlay_from_env())?,
    };
    let warnings = config.validate()?;
    Ok((config, warnings))
}
