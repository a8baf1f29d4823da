// src/core/store.rs

use crate::constants::OPTIONS_FILENAME;
use crate::core::arg_parser::UsageError;
use crate::core::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Bump when the layout of [`StoreFile`] changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Option store I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Option store '{path}' is corrupted: {source}. Delete it to start over.")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::error::DecodeError,
    },
    #[error("Failed to encode option store: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error(
        "Option store '{path}' has format version {found}, \
         this build understands version {expected}."
    )]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("Failed to replace option store file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Error, Debug)]
pub enum OptionError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// On-disk layout of the option store.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
struct StoreFile {
    version: u32,
    values: BTreeMap<String, String>,
}

/// Project-scoped "remember the last value" storage for CLI settings.
///
/// Every write goes straight to disk, so a value set by one invocation is the
/// default of the next. Separate processes are not synchronized against each
/// other: the last writer wins.
#[derive(Debug)]
pub struct OptionStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl OptionStore {
    /// Opens the store at `path`. A missing file is an empty store; the file is
    /// only created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => decode(&path, &bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        log::debug!(
            "Opened option store '{}' ({} value(s))",
            path.display(),
            values.len()
        );
        Ok(Self { path, values })
    }

    /// Opens the store belonging to the project rooted at `project_root`.
    pub fn for_project(project_root: &Path) -> Result<Self, StoreError> {
        Self::open(paths::project_state_dir(project_root).join(OPTIONS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sticky lookup of a setting.
    ///
    /// 1. An explicit `override_value` is stored and returned.
    /// 2. Otherwise a previously stored value is returned.
    /// 3. Otherwise `default` is stored and returned.
    pub fn get_or_set(
        &mut self,
        key: &str,
        default: &str,
        override_value: Option<&str>,
    ) -> Result<String, StoreError> {
        if let Some(value) = override_value {
            self.set(key, value)?;
            return Ok(value.to_string());
        }
        if let Some(stored) = self.values.get(key) {
            return Ok(stored.clone());
        }
        self.set(key, default)?;
        Ok(default.to_string())
    }

    /// [`get_or_set`](Self::get_or_set) restricted to a closed set of values.
    ///
    /// An override outside `candidates` is a usage error naming the option `key`;
    /// overrides read from a flag are checked against the flag first. A stored
    /// value that is no longer a candidate (the script changed) is replaced by
    /// `default`.
    pub fn resolve_mode(
        &mut self,
        key: &str,
        default: &str,
        candidates: &[&str],
        override_value: Option<&str>,
    ) -> Result<String, OptionError> {
        if let Some(value) = override_value {
            if !candidates.contains(&value) {
                return Err(UsageError::DisallowedSetting {
                    key: key.to_string(),
                    value: value.to_string(),
                    allowed: candidates.join(", "),
                }
                .into());
            }
        }

        let value = self.get_or_set(key, default, override_value)?;
        if candidates.contains(&value.as_str()) {
            return Ok(value);
        }

        log::warn!(
            "Stored value '{}' for '{}' is no longer one of [{}]; falling back to '{}'.",
            value,
            key,
            candidates.join(", "),
            default
        );
        Ok(self.get_or_set(key, default, Some(default))?)
    }

    /// Returns the stored value for `key`, computing and storing it on first use.
    pub fn memoize<F>(&mut self, key: &str, compute: F) -> anyhow::Result<String>
    where
        F: FnOnce() -> anyhow::Result<String>,
    {
        if let Some(stored) = self.values.get(key) {
            log::debug!("Using remembered value for '{}'", key);
            return Ok(stored.clone());
        }
        let value = compute()?;
        self.set(key, &value)?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.values.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        log::debug!("Option store: {} = '{}'", key, value);
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }

    /// Writes the whole store atomically (temp file + rename in the same directory).
    fn save(&self) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let file = StoreFile {
            version: FORMAT_VERSION,
            values: self.values.clone(),
        };
        let bytes = bincode::serde::encode_to_vec(&file, bincode::config::standard())?;

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&bytes).map_err(io_err)?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<BTreeMap<String, String>, StoreError> {
    let (file, _): (StoreFile, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(
            |source| StoreError::Decode {
                path: path.to_path_buf(),
                source,
            },
        )?;
    if file.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: file.version,
            expected: FORMAT_VERSION,
        });
    }
    Ok(file.values)
}
