// src/core/config.rs

use crate::constants::{DEFAULT_COMPLETION_DIR, DEFAULT_SCRIPT_FILENAME};
use crate::core::paths;
use crate::models::{EngineConfig, EngineConfigFile};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_COMPLETION_DIR: &str = "MKRS_COMPLETION_DIR";
pub const ENV_SCRIPT: &str = "MKRS_SCRIPT";

impl EngineConfig {
    /// Loads the user configuration and applies environment overrides.
    /// A missing config file yields the defaults.
    pub fn load() -> Result<Self> {
        let file = match paths::get_engine_config_path() {
            Some(path) => read_config_file(&path)?,
            None => EngineConfigFile::default(),
        };
        Self::resolve(
            file,
            std::env::var(ENV_COMPLETION_DIR).ok(),
            std::env::var(ENV_SCRIPT).ok(),
        )
    }

    /// Layers: built-in defaults, then the config file, then the environment.
    pub fn resolve(
        file: EngineConfigFile,
        env_completion_dir: Option<String>,
        env_script: Option<String>,
    ) -> Result<Self> {
        let completion_dir = match env_completion_dir.or(file.completion_dir) {
            Some(template) => paths::expand_path(&template)?,
            None => PathBuf::from(DEFAULT_COMPLETION_DIR),
        };
        let script_name = env_script
            .or(file.script_name)
            .unwrap_or_else(|| DEFAULT_SCRIPT_FILENAME.to_string());
        Ok(Self {
            completion_dir,
            script_name,
        })
    }
}

fn read_config_file(path: &Path) -> Result<EngineConfigFile> {
    if !path.exists() {
        log::debug!("No engine config at '{}', using defaults", path.display());
        return Ok(EngineConfigFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse '{}'", path.display()))
}
