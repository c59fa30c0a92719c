// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/motofleet/motofleet.toml`, then
//! `~/.config/motofleet/motofleet.toml`, then `./motofleet.toml`, with
//! `MOTOFLEET_` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MotofleetConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/motofleet/motofleet.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "motofleet.toml";

/// Section names recognised in `MOTOFLEET_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["bot", "conversation", "storage", "whatsapp", "gateway"];

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<MotofleetConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<MotofleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MotofleetConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MotofleetConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MotofleetConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MotofleetConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("motofleet").join("motofleet.toml"))
}

/// Maps `MOTOFLEET_WHATSAPP_ACCESS_TOKEN` to `whatsapp.access_token`.
///
/// Only the first segment is treated as the section, so keys containing
/// underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("MOTOFLEET_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|field| format!("{section}.{field}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}
