// src/cli/dispatcher.rs

use crate::constants::DEFAULT_TARGET;
use crate::core::arg_parser::CliArgs;
use crate::core::engine;
use crate::core::invocation::Invocation;
use crate::core::loader::{LoadContext, ScriptLoader};
use crate::core::namespace::Namespace;
use crate::core::registry::TargetRegistry;
use crate::core::store::OptionStore;
use crate::system::completions::CompletionProvider;
use anyhow::Result;
use colored::Colorize;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

/// What a dispatch ended in. Every variant is a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Invoked(String),
    NoDefault,
    TargetNotFound(String),
    CompletionsListed(usize),
    CompletionsInstalled(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineAction {
    QueryCompletions,
    InstallCompletions,
}

/// An engine flag intercepted before any target lookup.
struct ReservedFlag {
    name: &'static str,
    aliases: &'static [&'static str],
    action: EngineAction,
}

static RESERVED_FLAGS: &[ReservedFlag] = &[
    ReservedFlag {
        name: "--get_completions",
        aliases: &["query-completions"],
        action: EngineAction::QueryCompletions,
    },
    ReservedFlag {
        name: "--install_completions",
        aliases: &["install-completions"],
        action: EngineAction::InstallCompletions,
    },
];

fn find_reserved(arg: &str) -> Option<&'static ReservedFlag> {
    RESERVED_FLAGS
        .iter()
        .find(|flag| flag.name == arg || flag.aliases.contains(&arg))
}

/// Routes one command line to a target or an engine action.
pub struct Dispatcher<L: ScriptLoader> {
    loader: L,
    script_path: PathBuf,
    project_root: PathBuf,
    store: OptionStore,
    completions: CompletionProvider,
    engine: Namespace,
    /// Diagnostics and completion candidates go here; stdout by default.
    out: Box<dyn Write>,
}

impl<L: ScriptLoader> fmt::Debug for Dispatcher<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("script_path", &self.script_path)
            .field("project_root", &self.project_root)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl<L: ScriptLoader> Dispatcher<L> {
    pub fn new(
        loader: L,
        script_path: PathBuf,
        project_root: PathBuf,
        store: OptionStore,
        completions: CompletionProvider,
    ) -> Self {
        Self {
            loader,
            script_path,
            project_root,
            store,
            completions,
            engine: engine::namespace(),
            out: Box::new(io::stdout()),
        }
    }

    /// Sends the dispatcher's own messages to `out` instead of stdout.
    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    /// Dispatches `argv` (without the program name).
    ///
    /// A first argument starting with `-` is not a target name: the `default`
    /// target runs and sees the flags. Unknown targets and a missing default are
    /// reported on stdout and are not errors.
    pub fn run(&mut self, argv: &[String]) -> Result<Outcome> {
        log::debug!("Dispatching args: {:?}", argv);

        if let Some(reserved) = argv.first().and_then(|arg| find_reserved(arg)) {
            log::debug!("Intercepted engine flag '{}'", reserved.name);
            return match reserved.action {
                EngineAction::QueryCompletions => {
                    self.query_completions(argv.get(1..).unwrap_or_default())
                }
                EngineAction::InstallCompletions => self.install_completions(),
            };
        }

        let (name, rest, defaulted) = match argv.split_first() {
            Some((first, rest)) if !first.starts_with('-') => (first.as_str(), rest, false),
            _ => (DEFAULT_TARGET, argv, true),
        };

        self.completions.report_freshness();

        let mut args = CliArgs::new(rest.to_vec());
        let namespace = self.load(&mut args)?;
        let registry = TargetRegistry::discover(&namespace);

        let Some(target) = registry.resolve(name) else {
            if defaulted {
                writeln!(self.out, "{}", "No default target.".yellow())?;
                return Ok(Outcome::NoDefault);
            }
            writeln!(self.out, "{}", format!("No target \"{}\".", name).red())?;
            return Ok(Outcome::TargetNotFound(name.to_string()));
        };

        log::debug!("Invoking target '{}'", name);
        let mut cx = Invocation::new(
            &registry,
            &namespace,
            &self.engine,
            &self.completions,
            &self.project_root,
            &mut self.store,
            &mut args,
        );
        target.invoke(&mut cx)?;

        let unconsumed = args.unconsumed();
        if !unconsumed.is_empty() {
            log::warn!("Ignored arguments: {}", unconsumed.join(" "));
        }
        Ok(Outcome::Invoked(name.to_string()))
    }

    /// Prints completion candidates. A script that fails to load has none.
    fn query_completions(&mut self, rest: &[String]) -> Result<Outcome> {
        let mut args = CliArgs::new(rest.to_vec());
        let namespace = match self.load(&mut args) {
            Ok(ns) => ns,
            Err(e) => {
                log::debug!("No completions, script failed to load: {:#}", e);
                Namespace::new()
            }
        };
        let registry = TargetRegistry::discover(&namespace);
        let count = self.completions.list_completions(
            &registry,
            &self.engine,
            namespace.advertised_flags(),
            &mut self.out,
        )?;
        self.out.flush()?;
        Ok(Outcome::CompletionsListed(count))
    }

    fn install_completions(&mut self) -> Result<Outcome> {
        let path = self.completions.install()?;
        writeln!(
            self.out,
            "{} {}",
            "Tab completions installed:".green().bold(),
            path.display()
        )?;
        Ok(Outcome::CompletionsInstalled(path))
    }

    fn load(&mut self, args: &mut CliArgs) -> Result<Namespace> {
        let mut cx = LoadContext {
            store: &mut self.store,
            args,
            project_root: &self.project_root,
        };
        self.loader.load(&self.script_path, &mut cx)
    }

    pub fn store(&self) -> &OptionStore {
        &self.store
    }
}
