// src/system/install.rs

use crate::core::arg_parser::UsageError;
use crate::models::InstallSet;
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Creates `path` and its parents if they are missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory '{}'", path.display()))?;
    log::debug!("Created directory '{}'", path.display());
    Ok(())
}

/// Resolves the value of `flag` (usually `--destdir`) into a root directory.
/// `None` and `/` both mean a system-wide install; an empty value is a usage error.
pub fn install_root(destdir: Option<&str>, flag: &str) -> Result<PathBuf> {
    match destdir {
        None => Ok(PathBuf::from("/")),
        Some("") => Err(UsageError::MissingArgument {
            flag: flag.to_string(),
        }
        .into()),
        Some(raw) => {
            let expanded = shellexpand::full(raw)
                .map_err(|e| anyhow!("Failed to expand destdir '{}': {}", raw, e))?;
            Ok(PathBuf::from(expanded.into_owned()))
        }
    }
}

pub fn is_system_install(destdir: Option<&str>) -> bool {
    matches!(destdir, None | Some("/"))
}

/// Copies every file of an install set under `root`.
///
/// `bin/app = "usr/bin/"` installs `<root>/usr/bin/app`. A directory source is
/// copied recursively under `<root>/<dir>/<name>`. Returns the installed paths.
pub fn install_files(set: &InstallSet, root: &Path, project_root: &Path) -> Result<Vec<PathBuf>> {
    let mut installed = Vec::new();
    for (source, target_dir) in &set.files {
        let source_path = project_root.join(source);
        let file_name = source_path
            .file_name()
            .ok_or_else(|| anyhow!("Install source '{}' has no file name", source))?;
        let dest_dir = root.join(target_dir.trim_start_matches('/'));
        let dest = dest_dir.join(file_name);

        if source_path.is_dir() {
            installed.extend(copy_tree(&source_path, &dest)?);
        } else {
            ensure_dir(&dest_dir)?;
            fs::copy(&source_path, &dest).with_context(|| {
                format!(
                    "Failed to install '{}' to '{}'",
                    source_path.display(),
                    dest.display()
                )
            })?;
            installed.push(dest);
        }
    }

    for path in &installed {
        println!("{} {}", "installed".green(), path.display());
    }
    Ok(installed)
}

fn copy_tree(source: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for entry in WalkDir::new(source) {
        let entry = entry.with_context(|| format!("Failed to walk '{}'", source.display()))?;
        let relative = entry.path().strip_prefix(source)?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to install '{}' to '{}'",
                    entry.path().display(),
                    target.display()
                )
            })?;
            copied.push(target);
        }
    }
    Ok(copied)
}
