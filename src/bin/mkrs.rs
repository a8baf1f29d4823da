// src/bin/mkrs.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use mkrs::{
    cli::{Cli, dispatcher::Dispatcher, dispatcher::Outcome, usage_error},
    core::{loader::TomlScriptLoader, paths, store::OptionStore},
    models::EngineConfig,
    system::completions::CompletionProvider,
};
use std::path::PathBuf;

/// Entry point: logging, argument parsing, and centralized error handling.
fn main() {
    env_logger::init();

    match run_cli(Cli::parse()) {
        Ok(outcome) => log::debug!("Finished with {:?}", outcome),
        Err(e) => {
            if let Some(usage) = usage_error(&e) {
                eprintln!("{}: {}", "Usage".red().bold(), usage);
                std::process::exit(2);
            }
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run_cli(cli: Cli) -> Result<Outcome> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = EngineConfig::load()?;
    let project_root = paths::resolve_project_root(cli.directory.as_deref())?;
    let script = cli
        .file
        .unwrap_or_else(|| PathBuf::from(&config.script_name));
    let script_path = project_root.join(script);

    let store = OptionStore::for_project(&project_root)?;
    let completions = CompletionProvider::new(config.completion_dir.clone());

    let mut dispatcher = Dispatcher::new(
        TomlScriptLoader,
        script_path,
        project_root,
        store,
        completions,
    );
    dispatcher.run(&cli.args)
}
