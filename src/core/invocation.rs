// src/core/invocation.rs

use crate::constants::MAX_CALL_DEPTH;
use crate::core::arg_parser::{CliArgs, CliValue, UsageError};
use crate::core::namespace::Namespace;
use crate::core::registry::TargetRegistry;
use crate::core::store::{OptionError, OptionStore, StoreError};
use crate::core::templater::Environment;
use crate::system::completions::CompletionProvider;
use crate::system::executor::{self, ExecOptions, ExecutionError};
use anyhow::Result;
use std::path::Path;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CallError {
    #[error("No target \"{0}\".")]
    TargetNotFound(String),
    #[error("Target calls nested deeper than {0} levels; check for a target calling itself.")]
    RecursionLimit(u32),
}

/// Everything a running target can reach.
///
/// Built by the dispatcher for one invocation and handed to the target's
/// procedure; targets calling other targets share it.
#[derive(Debug)]
pub struct Invocation<'a> {
    registry: &'a TargetRegistry,
    namespace: &'a Namespace,
    engine: &'a Namespace,
    completions: &'a CompletionProvider,
    project_root: &'a Path,
    store: &'a mut OptionStore,
    args: &'a mut CliArgs,
    depth: u32,
}

impl<'a> Invocation<'a> {
    pub fn new(
        registry: &'a TargetRegistry,
        namespace: &'a Namespace,
        engine: &'a Namespace,
        completions: &'a CompletionProvider,
        project_root: &'a Path,
        store: &'a mut OptionStore,
        args: &'a mut CliArgs,
    ) -> Self {
        Self {
            registry,
            namespace,
            engine,
            completions,
            project_root,
            store,
            args,
            depth: 0,
        }
    }

    /// The variables command templates are resolved against: every string
    /// binding of the loaded script.
    pub fn environment(&self) -> Environment {
        Environment::from_namespace(self.namespace)
    }

    /// Resolves `template` against [`Self::environment`] and runs it in the project root.
    pub fn execute(
        &self,
        template: &str,
        options: ExecOptions,
    ) -> Result<ExitStatus, ExecutionError> {
        executor::execute(template, &self.environment(), self.project_root, options)
    }

    /// Runs another target by name, sharing this invocation's state.
    pub fn call(&mut self, name: &str) -> Result<()> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(CallError::RecursionLimit(MAX_CALL_DEPTH).into());
        }
        let registry = self.registry;
        let target = registry
            .resolve(name)
            .ok_or_else(|| CallError::TargetNotFound(name.to_string()))?;

        log::debug!("Calling target '{}' (depth {})", name, self.depth + 1);
        self.depth += 1;
        let result = target.invoke(self);
        self.depth -= 1;
        result
    }

    pub fn get_or_set(
        &mut self,
        key: &str,
        default: &str,
        override_value: Option<&str>,
    ) -> Result<String, StoreError> {
        self.store.get_or_set(key, default, override_value)
    }

    pub fn resolve_mode(
        &mut self,
        key: &str,
        default: &str,
        candidates: &[&str],
        override_value: Option<&str>,
    ) -> Result<String, OptionError> {
        self.store
            .resolve_mode(key, default, candidates, override_value)
    }

    /// [`Self::resolve_mode`] with the override read from the command line.
    ///
    /// A value outside `candidates` is reported against the flag the user typed.
    pub fn mode_option(
        &mut self,
        key: &str,
        flag_spec: &str,
        default: &str,
        candidates: &[&str],
    ) -> Result<String, OptionError> {
        let override_value = self.args.value(flag_spec, Some(candidates))?;
        self.store
            .resolve_mode(key, default, candidates, override_value.as_deref())
    }

    pub fn get_cli_option(
        &mut self,
        spec: &str,
        allowed_values: Option<&[&str]>,
        has_argument: bool,
    ) -> Result<CliValue, UsageError> {
        self.args.get_cli_option(spec, allowed_values, has_argument)
    }

    pub fn store(&self) -> &OptionStore {
        self.store
    }

    pub fn store_mut(&mut self) -> &mut OptionStore {
        self.store
    }

    pub fn args_mut(&mut self) -> &mut CliArgs {
        self.args
    }

    pub fn registry(&self) -> &TargetRegistry {
        self.registry
    }

    pub fn namespace(&self) -> &Namespace {
        self.namespace
    }

    pub fn engine(&self) -> &Namespace {
        self.engine
    }

    pub fn completions(&self) -> &CompletionProvider {
        self.completions
    }

    pub fn project_root(&self) -> &Path {
        self.project_root
    }
}
