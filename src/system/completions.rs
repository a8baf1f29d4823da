// src/system/completions.rs

use crate::constants::COMPLETION_SCRIPT_NAME;
use crate::core::namespace::Namespace;
use crate::core::registry::TargetRegistry;
use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

/// The completion script shipped with this build. Installed copies are compared
/// against it byte for byte.
pub const CANONICAL_SCRIPT: &str = include_str!("../../completions/mkrs.bash");

const FINGERPRINT_LEN: usize = 8;

/// Result of comparing the installed completion script with the canonical one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStatus {
    Absent,
    Identical,
    Different {
        installed: String,
        canonical: String,
    },
    /// Something other than a regular file sits at the install path.
    Obstructed,
}

/// Query, staleness check and installation of the shell completion script.
#[derive(Debug, Clone)]
pub struct CompletionProvider {
    dir: PathBuf,
}

impl CompletionProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn installed_path(&self) -> PathBuf {
        self.dir.join(COMPLETION_SCRIPT_NAME)
    }

    /// Prints one completion candidate per line: the script's targets minus any
    /// name the engine itself defines, then the flags the script advertises.
    /// Returns the number of lines written.
    pub fn list_completions<W: Write>(
        &self,
        registry: &TargetRegistry,
        engine: &Namespace,
        advertised_flags: &[String],
        out: &mut W,
    ) -> io::Result<usize> {
        let mut count = 0;
        for name in registry.completion_candidates(engine) {
            writeln!(out, "{}", name)?;
            count += 1;
        }
        for flag in advertised_flags {
            writeln!(out, "{}", flag)?;
            count += 1;
        }
        Ok(count)
    }

    /// Compares the installed script against [`CANONICAL_SCRIPT`]. Never writes.
    pub fn check_installed(&self) -> io::Result<CompletionStatus> {
        let path = self.installed_path();
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CompletionStatus::Absent),
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            return Ok(CompletionStatus::Obstructed);
        }

        let canonical = CANONICAL_SCRIPT.as_bytes();
        let installed = fs::read(&path)?;
        if installed == canonical {
            return Ok(CompletionStatus::Identical);
        }
        Ok(different(&installed, canonical))
    }

    /// Prints a warning when the installed script is missing or stale. Returns
    /// the status so callers can react; never fails the run.
    pub fn report_freshness(&self) -> Option<CompletionStatus> {
        let status = match self.check_installed() {
            Ok(status) => status,
            Err(e) => {
                log::warn!(
                    "Could not inspect '{}': {}",
                    self.installed_path().display(),
                    e
                );
                return None;
            }
        };

        match &status {
            CompletionStatus::Identical => {}
            CompletionStatus::Absent => {
                println!("{}", "Tab completions not installed:".yellow().bold());
                println!("Use \"sudo mkrs --install_completions\" to install them\n");
            }
            CompletionStatus::Different {
                installed,
                canonical,
            } => {
                println!("{}", "Tab completions outdated:".red().bold());
                log::debug!(
                    "installed fingerprint {}, canonical fingerprint {}",
                    installed,
                    canonical
                );
                println!("Update with \"sudo mkrs --install_completions\"\n");
            }
            CompletionStatus::Obstructed => {
                println!(
                    "{} '{}' is not a regular file.",
                    "Tab completions broken:".red().bold(),
                    self.installed_path().display()
                );
            }
        }
        Some(status)
    }

    /// Writes the canonical script into the completion directory.
    ///
    /// The system directory usually needs root; the OS error is returned as is.
    pub fn install(&self) -> Result<PathBuf> {
        let path = self.installed_path();
        fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "Failed to create completion directory '{}'",
                self.dir.display()
            )
        })?;
        fs::write(&path, CANONICAL_SCRIPT)
            .with_context(|| format!("Failed to install completions to '{}'", path.display()))?;
        log::debug!("Installed completion script at '{}'", path.display());
        Ok(path)
    }
}

fn different(installed: &[u8], canonical: &[u8]) -> CompletionStatus {
    CompletionStatus::Different {
        installed: fingerprint(installed),
        canonical: fingerprint(canonical),
    }
}

/// Short content hash, for diagnostics only.
pub fn fingerprint(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes);
    hex::encode(hash.as_bytes().get(..FINGERPRINT_LEN).unwrap_or_default())
}
