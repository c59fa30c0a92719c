// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Motofleet courier bot.
//!
//! TOML files plus `MOTOFLEET_*` environment overrides, strict unknown-key
//! rejection, semantic validation and miette diagnostics.
//!
//! ```no_run
//! use motofleet_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("timeout: {} min", config.conversation.timeout_minutes);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, TomlSources, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::MotofleetConfig;

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<MotofleetConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from an explicit file and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<MotofleetConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let mut sources = TomlSources::new();
            sources.read_if_present(path);
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<MotofleetConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let mut sources = TomlSources::new();
            sources.push("<inline>", toml_content);
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources() -> TomlSources {
    let mut sources = TomlSources::new();
    if let Ok(cwd) = std::env::current_dir() {
        sources.read_if_present(&cwd.join(loader::LOCAL_CONFIG_PATH));
    }
    sources.read_if_present(std::path::Path::new(loader::LOCAL_CONFIG_PATH));
    if let Some(path) = loader::user_config_path() {
        sources.read_if_present(&path);
    }
    sources.read_if_present(std::path::Path::new(loader::SYSTEM_CONFIG_PATH));
    sources
}
