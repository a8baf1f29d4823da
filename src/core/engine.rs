// src/core/engine.rs

//! The engine's own namespace.
//!
//! Scripts can import these builtins with `include = ["mkrs"]`. They behave like
//! any other target when invoked by name, but they are never offered as tab
//! completions for the script.

use crate::core::invocation::Invocation;
use crate::core::namespace::Namespace;
use anyhow::Result;
use colored::Colorize;
use std::io;

/// Builds the engine namespace. Cheap; called once per process by the dispatcher.
pub fn namespace() -> Namespace {
    let mut ns = Namespace::new();
    ns.define_fn("get_completions", get_completions);
    ns.define_fn("check_completions", check_completions);
    ns.define_fn("install_completions", install_completions);
    ns.define_fn("list_targets", list_targets);
    ns.define_fn("show_options", show_options);
    ns
}

fn get_completions(cx: &mut Invocation<'_>) -> Result<()> {
    let stdout = io::stdout();
    cx.completions().list_completions(
        cx.registry(),
        cx.engine(),
        cx.namespace().advertised_flags(),
        &mut stdout.lock(),
    )?;
    Ok(())
}

fn check_completions(cx: &mut Invocation<'_>) -> Result<()> {
    cx.completions().report_freshness();
    Ok(())
}

fn install_completions(cx: &mut Invocation<'_>) -> Result<()> {
    let path = cx.completions().install()?;
    println!("{} {}", "Tab completions installed:".green().bold(), path.display());
    Ok(())
}

/// Prints the script's targets with their descriptions.
fn list_targets(cx: &mut Invocation<'_>) -> Result<()> {
    let registry = cx.registry();
    let names: Vec<&str> = registry.completion_candidates(cx.engine()).collect();
    if names.is_empty() {
        println!("{}", "No targets defined.".yellow());
        return Ok(());
    }
    let width = names.iter().map(|n| n.len()).max().unwrap_or(0);
    for name in names {
        let desc = registry
            .resolve(name)
            .and_then(|t| t.description())
            .unwrap_or("");
        println!("  {:<width$}  {}", name.cyan(), desc.dimmed(), width = width);
    }
    Ok(())
}

/// Prints every remembered option of this project.
fn show_options(cx: &mut Invocation<'_>) -> Result<()> {
    let store = cx.store();
    println!("{} {}", "Options stored in".dimmed(), store.path().display());
    for (key, value) in store.entries() {
        println!("  {} = {}", key.cyan(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_namespace_has_only_targets() {
        let ns = namespace();
        assert_eq!(ns.targets().count(), ns.len());
        assert!(ns.contains("check_completions"));
        assert!(ns.contains("install_completions"));
        assert!(ns.string_bindings().next().is_none());
    }
}
