//! Configuration loading for Stagehand.
//!
//! Imported by every Stagehand crate, so dependencies stay minimal.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, merged table by table):
//! 1. `/etc/stagehand/config.toml` (system)
//! 2. `~/.config/stagehand/config.toml` (user)
//! 3. `./stagehand.toml` (local override, replaced by an explicit path)
//! 4. Environment variables (`STAGEHAND_*`)
//!
//! # Example Config
//!
//! ```toml
//! [host]
//! app_name = "Logic Pro"
//! process_name = "Logic Pro"
//!
//! [backend]
//! walker_path = "~/bin/axwalker"
//! timeout_ms = 12000
//!
//! [locale]
//! track_prefixes = ["Track ", "Spur ", "Piste "]
//! container_labels = ["Tracks", "Spuren", "Pistes"]
//!
//! [search]
//! track_depth = 12
//!
//! [midi]
//! port_name = "Stagehand"
//!
//! [telemetry]
//! log_level = "info,stagehand=debug"
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files, discover_config_files_with_override, expand_path, ConfigSources};
pub use sections::{
    BackendConfig, CatalogConfig, HostConfig, LocaleConfig, MidiConfig, SearchConfig,
    TelemetryConfig,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete Stagehand configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StageConfig {
    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub locale: LocaleConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub midi: MidiConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl StageConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration, letting `config_path` replace the local override.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::load_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged, Path::new("<merged>"))?;
        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> String {
        let body = toml::to_string_pretty(self).unwrap_or_default();
        format!("# Stagehand Configuration\n\n{body}")
    }
}
