// src/core/paths.rs

use crate::constants::{ENGINE_CONFIG_FILENAME, MKRS_DIR};
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Returns the path to the mkrs configuration directory (`~/.config/mkrs`).
/// Unlike the project state directory it is never created implicitly.
pub fn get_mkrs_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mkrs"))
}

/// Returns the path of the user-level `config.toml`, if a config directory exists.
pub fn get_engine_config_path() -> Option<PathBuf> {
    get_mkrs_config_dir().map(|dir| dir.join(ENGINE_CONFIG_FILENAME))
}

/// The per-project state directory (`<project_root>/.mkrs`).
pub fn project_state_dir(project_root: &Path) -> PathBuf {
    project_root.join(MKRS_DIR)
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(template: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(template)
        .map_err(|e| anyhow!("Failed to expand path '{}': {}", template, e))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Resolves the project root: an explicit directory, or the current one.
/// The result is canonical and free of Windows UNC prefixes.
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| anyhow!("Could not determine the current directory: {}", e))?,
    };
    dunce::canonicalize(&root)
        .map_err(|e| anyhow!("Project directory '{}' is not accessible: {}", root.display(), e))
}
