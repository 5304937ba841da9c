// SPDX-FileCopyrightText: 2026 Saga Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./saga.toml` > `~/.config/saga/saga.toml` > `/etc/saga/saga.toml`,
//! with `SAGA_*` environment variables overriding every file.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SagaConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/saga/saga.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "saga.toml";

/// Top-level sections, used to turn `SAGA_<SECTION>_<KEY>` into `section.key`.
const SECTIONS: &[&str] = &[
    "server",
    "storage",
    "provider",
    "embedding",
    "vector_store",
    "rag",
    "consolidator",
    "indexer",
];

/// Per-user config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("saga").join("saga.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/saga/saga.toml`
/// 3. `~/.config/saga/saga.toml`
/// 4. `./saga.toml`
/// 5. `SAGA_*` environment variables
pub fn load_config() -> Result<SagaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SagaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SagaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SagaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SagaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SagaConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `SAGA_VECTOR_STORE_HOST` to `vector_store.host`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because both section names
/// and keys contain underscores.
fn env_provider() -> Env {
    Env::prefixed("SAGA_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or_else(|| key.to_string())
}
