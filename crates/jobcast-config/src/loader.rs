// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./jobcast.toml` > `~/.config/jobcast/jobcast.toml` > `/etc/jobcast/jobcast.toml`
//! with environment variable overrides via `JOBCAST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::JobcastConfig;

/// Top-level sections, used to map `JOBCAST_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &[
    "gateway",
    "server",
    "storage",
    "session",
    "dispatch",
    "broadcast",
    "webhook",
    "matching",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/jobcast/jobcast.toml` (system-wide)
/// 3. `~/.config/jobcast/jobcast.toml` (user XDG config)
/// 4. `./jobcast.toml` (local directory)
/// 5. `JOBCAST_*` environment variables
pub fn load_config() -> Result<JobcastConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<JobcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JobcastConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<JobcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(JobcastConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(JobcastConfig::default()))
        .merge(Toml::file("/etc/jobcast/jobcast.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("jobcast/jobcast.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("jobcast.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `JOBCAST_SESSION_RECONNECT_DELAY_SECS` to
/// `session.reconnect_delay_secs`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("JOBCAST_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
