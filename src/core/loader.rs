// src/core/loader.rs

//! # Script Loader
//!
//! Turns a project script into a [`Namespace`]. Loading is an evaluation, not a
//! parse: persistent options are resolved against the command line and the
//! option store, memoized lookups may run commands, and `ensure_dirs` touches the
//! filesystem. Every call re-evaluates from scratch; nothing is cached, so load
//! once per process.

use crate::constants::ENGINE_INCLUDE;
use crate::core::arg_parser::CliArgs;
use crate::core::engine;
use crate::core::namespace::Namespace;
use crate::core::steps::ScriptTarget;
use crate::core::store::OptionStore;
use crate::core::templater::{self, Environment};
use crate::models::{OptionDef, ScriptFile};
use crate::system::{executor, install, pkg_config};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Could not read script '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse script '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Include cycle: {0}")]
    IncludeCycle(String),
    #[error("Invalid script '{path}': {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// What a script may touch while it is evaluated.
#[derive(Debug)]
pub struct LoadContext<'a> {
    pub store: &'a mut OptionStore,
    pub args: &'a mut CliArgs,
    pub project_root: &'a Path,
}

/// Evaluates a script file into a namespace.
pub trait ScriptLoader {
    fn load(&self, path: &Path, cx: &mut LoadContext<'_>) -> Result<Namespace>;
}

impl<F> ScriptLoader for F
where
    F: Fn(&Path, &mut LoadContext<'_>) -> Result<Namespace>,
{
    fn load(&self, path: &Path, cx: &mut LoadContext<'_>) -> Result<Namespace> {
        self(path, cx)
    }
}

/// Loads `mkrs.toml`-style scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlScriptLoader;

impl ScriptLoader for TomlScriptLoader {
    fn load(&self, path: &Path, cx: &mut LoadContext<'_>) -> Result<Namespace> {
        let mut stack = Vec::new();
        load_file(path, cx, &mut stack)
    }
}

fn load_file(path: &Path, cx: &mut LoadContext<'_>, stack: &mut Vec<PathBuf>) -> Result<Namespace> {
    let canonical = dunce::canonicalize(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if stack.contains(&canonical) {
        let chain = stack
            .iter()
            .chain(std::iter::once(&canonical))
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(ScriptError::IncludeCycle(chain).into());
    }

    let content = fs::read_to_string(&canonical).map_err(|source| ScriptError::Io {
        path: canonical.clone(),
        source,
    })?;
    let script: ScriptFile = toml::from_str(&content).map_err(|source| ScriptError::Parse {
        path: canonical.clone(),
        source,
    })?;
    log::debug!("Evaluating script '{}'", canonical.display());

    stack.push(canonical.clone());
    let result = evaluate(script, &canonical, cx, stack);
    stack.pop();
    result
}

/// Evaluates a parsed script. Order: includes, vars, options, pkg_config,
/// computed, derived, ensure_dirs, targets.
fn evaluate(
    script: ScriptFile,
    path: &Path,
    cx: &mut LoadContext<'_>,
    stack: &mut Vec<PathBuf>,
) -> Result<Namespace> {
    let mut ns = Namespace::new();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    for include in &script.include {
        if include == ENGINE_INCLUDE {
            ns.merge(engine::namespace());
        } else {
            let included = load_file(&base_dir.join(include), cx, stack)
                .with_context(|| format!("Included from '{}'", path.display()))?;
            ns.merge(included);
        }
    }

    for flag in script.completions {
        ns.advertise(flag);
    }

    for (name, value) in script.vars {
        ns.define_str(name, value);
    }

    for (key, def) in &script.options {
        resolve_option(key, def, path, cx, &mut ns)?;
    }

    for (name, def) in script.pkg_config {
        let root = cx.project_root;
        let value = cx.store.memoize(&name, || {
            Ok(pkg_config::lookup(def.kind, &def.packages, root)?)
        })?;
        ns.define_str(name, value);
    }

    for (name, command) in script.computed {
        let env = Environment::from_namespace(&ns);
        let root = cx.project_root;
        let value = cx.store.memoize(&name, || {
            let resolved = templater::resolve(&command, &env)?;
            Ok(executor::capture(&resolved, root)?)
        })?;
        ns.define_str(name, value);
    }

    // Derived values see everything above but not each other.
    let env = Environment::from_namespace(&ns);
    for (name, template) in script.derived {
        let value = templater::resolve(&template, &env)
            .with_context(|| format!("In derived variable '{}'", name))?;
        ns.define_str(name, value);
    }

    for dir in &script.ensure_dirs {
        install::ensure_dir(&cx.project_root.join(dir))?;
    }

    let installs = Arc::new(script.installs);
    for (name, def) in script.targets {
        let description = def.description().map(str::to_string);
        let target = ScriptTarget::new(def.into_steps(), Arc::clone(&installs));
        ns.define_target(name, description, Arc::new(target));
    }

    Ok(ns)
}

fn resolve_option(
    key: &str,
    def: &OptionDef,
    path: &Path,
    cx: &mut LoadContext<'_>,
    ns: &mut Namespace,
) -> Result<()> {
    let invalid = |reason: String| ScriptError::Invalid {
        path: path.to_path_buf(),
        reason,
    };

    match &def.choices {
        Some(choices) => {
            let candidates: Vec<&str> = choices.keys().map(String::as_str).collect();
            if !choices.contains_key(&def.default) {
                return Err(invalid(format!(
                    "default '{}' of option '{}' is not one of its choices",
                    def.default, key
                ))
                .into());
            }
            let override_value = match &def.flag {
                Some(flag) => cx.args.value(flag, Some(candidates.as_slice()))?,
                None => None,
            };
            let value = cx.store.resolve_mode(
                key,
                &def.default,
                &candidates,
                override_value.as_deref(),
            )?;
            if let Some(bind) = &def.bind {
                let mapped = choices.get(&value).cloned().unwrap_or_default();
                ns.define_str(bind.clone(), mapped);
            }
            ns.define_str(key, value);
        }
        None => {
            let override_value = match &def.flag {
                Some(flag) => cx.args.value(flag, None)?,
                None => None,
            };
            let value = cx
                .store
                .get_or_set(key, &def.default, override_value.as_deref())?;
            if let Some(bind) = &def.bind {
                ns.define_str(bind.clone(), value.clone());
            }
            ns.define_str(key, value);
        }
    }
    Ok(())
}
