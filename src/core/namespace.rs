// src/core/namespace.rs

use crate::core::invocation::Invocation;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A zero-argument build action.
///
/// "Zero-argument" from the command line's point of view: the only thing a
/// procedure receives is the [`Invocation`] through which it reaches the option
/// store, the command line, the templater and the other targets.
pub trait Procedure {
    fn invoke(&self, cx: &mut Invocation<'_>) -> Result<()>;
}

impl<F> Procedure for F
where
    F: Fn(&mut Invocation<'_>) -> Result<()>,
{
    fn invoke(&self, cx: &mut Invocation<'_>) -> Result<()> {
        self(cx)
    }
}

/// A named procedure exposed to the command line.
#[derive(Clone)]
pub struct Target {
    name: String,
    description: Option<String>,
    procedure: Arc<dyn Procedure>,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        procedure: Arc<dyn Procedure>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            procedure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn invoke(&self, cx: &mut Invocation<'_>) -> Result<()> {
        self.procedure.invoke(cx)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A top-level definition in an evaluated script.
#[derive(Debug, Clone)]
pub enum Binding {
    Str(String),
    Target(Target),
}

/// The result of evaluating a script: every top-level binding, by name.
///
/// A namespace is isolated from the engine's own builtins unless the script
/// explicitly imports them (see [`Namespace::merge`]).
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: BTreeMap<String, Binding>,
    advertised_flags: Vec<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a string variable. Later definitions replace earlier ones.
    pub fn define_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.bindings
            .insert(name.into(), Binding::Str(value.into()));
    }

    pub fn define_target(
        &mut self,
        name: impl Into<String>,
        description: Option<String>,
        procedure: Arc<dyn Procedure>,
    ) {
        let name = name.into();
        let target = Target::new(name.clone(), description, procedure);
        self.bindings.insert(name, Binding::Target(target));
    }

    /// Convenience for defining a target from a closure.
    pub fn define_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut Invocation<'_>) -> Result<()> + 'static,
    {
        self.define_target(name, None, Arc::new(f));
    }

    /// Copies every binding of `other` into this namespace (a wildcard import).
    /// Names already present are overwritten.
    pub fn merge(&mut self, other: Self) {
        self.bindings.extend(other.bindings);
        for flag in other.advertised_flags {
            self.advertise(flag);
        }
    }

    /// Opts into advertising an extra engine flag in completion listings.
    pub fn advertise(&mut self, flag: impl Into<String>) {
        let flag = flag.into();
        if !self.advertised_flags.contains(&flag) {
            self.advertised_flags.push(flag);
        }
    }

    pub fn advertised_flags(&self) -> &[String] {
        &self.advertised_flags
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.bindings.get(name) {
            Some(Binding::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn string_bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().filter_map(|(name, binding)| match binding {
            Binding::Str(value) => Some((name.as_str(), value.as_str())),
            Binding::Target(_) => None,
        })
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.bindings.values().filter_map(|binding| match binding {
            Binding::Target(target) => Some(target),
            Binding::Str(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_and_keeps_both_kinds() {
        let mut base = Namespace::new();
        base.define_str("CC", "gcc");
        base.define_fn("build", |_| Ok(()));

        let mut local = Namespace::new();
        local.define_str("CC", "clang");
        local.define_fn("clean", |_| Ok(()));
        local.advertise("--get_run_deps");

        base.merge(local);
        assert_eq!(base.get_str("CC"), Some("clang"));
        let names: Vec<_> = base.targets().map(Target::name).collect();
        assert_eq!(names, vec!["build", "clean"]);
        assert_eq!(base.advertised_flags(), ["--get_run_deps".to_string()]);
    }

    #[test]
    fn test_string_bindings_skip_targets() {
        let mut ns = Namespace::new();
        ns.define_str("FLAGS", "-O2");
        ns.define_fn("FLAGS2", |_| Ok(()));
        let strings: Vec<_> = ns.string_bindings().collect();
        assert_eq!(strings, vec![("FLAGS", "-O2")]);
        assert_eq!(ns.get_str("FLAGS2"), None);
    }

    #[test]
    fn test_redefining_a_string_as_target_replaces_it() {
        let mut ns = Namespace::new();
        ns.define_str("install", "x");
        ns.define_fn("install", |_| Ok(()));
        assert!(matches!(ns.get("install"), Some(Binding::Target(_))));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_advertise_deduplicates() {
        let mut ns = Namespace::new();
        ns.advertise("--a");
        ns.advertise("--a");
        assert_eq!(ns.advertised_flags().len(), 1);
    }
}
