// src/core/steps.rs

use crate::core::invocation::Invocation;
use crate::core::namespace::Procedure;
use crate::core::templater;
use crate::models::{
    CallStep, EnsureDirStep, InstallSet, InstallStep, PrintStep, RememberStep, RequireStep, Step,
};
use crate::system::executor::ExecOptions;
use crate::system::install;
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A target declared in a script: a list of steps run in order.
#[derive(Debug, Clone)]
pub struct ScriptTarget {
    steps: Vec<Step>,
    installs: Arc<BTreeMap<String, InstallSet>>,
}

/// Whether the remaining steps of a target should run.
enum Flow {
    Next,
    Stop,
}

impl ScriptTarget {
    pub fn new(steps: Vec<Step>, installs: Arc<BTreeMap<String, InstallSet>>) -> Self {
        Self { steps, installs }
    }

    fn run_step(&self, step: &Step, cx: &mut Invocation<'_>) -> Result<Flow> {
        match step {
            Step::Command(command) => {
                cx.execute(command, ExecOptions::default())?;
            }
            Step::Run(run) => {
                let options = ExecOptions {
                    suppress_output: run.quiet,
                    echo: run.echo,
                    on_failure: run.on_failure,
                };
                cx.execute(&run.run, options)?;
            }
            Step::Call(CallStep { call }) => {
                let name = templater::resolve(call, &cx.environment())?;
                cx.call(&name)?;
            }
            Step::EnsureDir(EnsureDirStep { ensure_dir }) => {
                let dir = templater::resolve(ensure_dir, &cx.environment())?;
                install::ensure_dir(&cx.project_root().join(dir))?;
            }
            Step::Print(PrintStep { print }) => {
                println!("{}", templater::resolve(print, &cx.environment())?);
            }
            Step::Require(RequireStep { require, message }) => {
                let env = cx.environment();
                let path = templater::resolve(require, &env)?;
                if !cx.project_root().join(&path).exists() {
                    let text = match message {
                        Some(m) => templater::resolve(m, &env)?,
                        None => format!("Missing '{}'.", path),
                    };
                    println!("{}", text.yellow());
                    return Ok(Flow::Stop);
                }
            }
            Step::Install(InstallStep { install }) => self.install(install, cx)?,
            Step::Remember(RememberStep { remember, value }) => {
                let value = templater::resolve(value, &cx.environment())?;
                cx.store_mut().get_or_set(remember, "", Some(&value))?;
            }
        }
        Ok(Flow::Next)
    }

    fn install(&self, name: &str, cx: &mut Invocation<'_>) -> Result<()> {
        let set = self
            .installs
            .get(name)
            .ok_or_else(|| anyhow!("No install set named '{}'.", name))?;

        let destdir = cx.args_mut().value(&set.destdir_flag, None)?;
        let root = install::install_root(destdir.as_deref(), &set.destdir_flag)?;
        let installed = install::install_files(set, &root, cx.project_root())
            .with_context(|| format!("Install set '{}' failed", name))?;

        if !install::is_system_install(destdir.as_deref()) || set.on_system_install.is_empty() {
            return Ok(());
        }
        let triggered = match &set.trigger {
            Some(trigger) => installed
                .iter()
                .any(|p| p.to_string_lossy().contains(trigger.as_str())),
            None => true,
        };
        if triggered {
            for hook in &set.on_system_install {
                cx.execute(hook, ExecOptions::default())?;
            }
        }
        Ok(())
    }
}

impl Procedure for ScriptTarget {
    fn invoke(&self, cx: &mut Invocation<'_>) -> Result<()> {
        for step in &self.steps {
            if let Flow::Stop = self.run_step(step, cx)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::core::arg_parser::{CliArgs, UsageError};
    use crate::core::namespace::Namespace;
    use crate::core::registry::TargetRegistry;
    use crate::core::store::OptionStore;
    use crate::models::RunStep;
    use crate::system::completions::CompletionProvider;
    use crate::system::executor::FailurePolicy;
    use std::fs;
    use tempfile::TempDir;

    fn script_target(steps: Vec<Step>) -> Arc<ScriptTarget> {
        Arc::new(ScriptTarget::new(steps, Arc::new(BTreeMap::new())))
    }

    /// Runs `name` from `ns` inside `dir` with `args` on the command line.
    fn run(dir: &TempDir, ns: &Namespace, name: &str, args: &[&str]) -> Result<()> {
        let registry = TargetRegistry::discover(ns);
        let engine = Namespace::new();
        let completions = CompletionProvider::new(dir.path().join("completions"));
        let mut store = OptionStore::for_project(dir.path())?;
        let mut args = CliArgs::new(args.iter().map(|s| s.to_string()).collect());
        let mut cx = Invocation::new(
            &registry,
            ns,
            &engine,
            &completions,
            dir.path(),
            &mut store,
            &mut args,
        );
        cx.call(name)
    }

    #[test]
    fn test_commands_see_script_variables() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_str("OUT", "out.txt");
        ns.define_target(
            "build",
            None,
            script_target(vec![
                Step::EnsureDir(EnsureDirStep {
                    ensure_dir: "bin".into(),
                }),
                Step::Command("echo built > bin/{OUT}".into()),
            ]),
        );
        run(&dir, &ns, "build", &[]).unwrap();
        let content = fs::read_to_string(dir.path().join("bin/out.txt")).unwrap();
        assert_eq!(content.trim(), "built");
    }

    #[test]
    fn test_failing_command_continues_by_default() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "build",
            None,
            script_target(vec![
                Step::Command("false".into()),
                Step::Command("touch after".into()),
            ]),
        );
        run(&dir, &ns, "build", &[]).unwrap();
        assert!(dir.path().join("after").exists());
    }

    #[test]
    fn test_abort_policy_stops_the_target() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "build",
            None,
            script_target(vec![
                Step::Run(RunStep {
                    run: "false".into(),
                    quiet: true,
                    echo: false,
                    on_failure: FailurePolicy::Abort,
                }),
                Step::Command("touch after".into()),
            ]),
        );
        assert!(run(&dir, &ns, "build", &[]).is_err());
        assert!(!dir.path().join("after").exists());
    }

    #[test]
    fn test_missing_variable_spawns_nothing() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "build",
            None,
            script_target(vec![Step::Command("touch {NOPE}".into())]),
        );
        let err = run(&dir, &ns, "build", &[]).unwrap_err();
        assert!(err.to_string().contains("NOPE"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_require_stops_quietly() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "install",
            None,
            script_target(vec![
                Step::Require(RequireStep {
                    require: "bin/viewer".into(),
                    message: Some("Build it first".into()),
                }),
                Step::Command("touch reached".into()),
            ]),
        );
        run(&dir, &ns, "install", &[]).unwrap();
        assert!(!dir.path().join("reached").exists());
    }

    #[test]
    fn test_call_runs_other_target() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_str("WHICH", "leaf");
        ns.define_target(
            "leaf",
            None,
            script_target(vec![Step::Command("touch leaf.done".into())]),
        );
        ns.define_target(
            "all",
            None,
            script_target(vec![Step::Call(CallStep {
                call: "{WHICH}".into(),
            })]),
        );
        run(&dir, &ns, "all", &[]).unwrap();
        assert!(dir.path().join("leaf.done").exists());
    }

    #[test]
    fn test_self_call_hits_the_depth_limit() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "loop",
            None,
            script_target(vec![Step::Call(CallStep {
                call: "loop".into(),
            })]),
        );
        let err = run(&dir, &ns, "loop", &[]).unwrap_err();
        assert!(err.chain().any(|e| e.to_string().contains("nested deeper")));
    }

    #[test]
    fn test_remember_writes_the_store() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_str("VERSION", "1.2");
        ns.define_target(
            "tag",
            None,
            script_target(vec![Step::Remember(RememberStep {
                remember: "last_tag".into(),
                value: "v{VERSION}".into(),
            })]),
        );
        run(&dir, &ns, "tag", &[]).unwrap();
        let store = OptionStore::for_project(dir.path()).unwrap();
        assert_eq!(store.get("last_tag"), Some("v1.2"));
    }

    #[test]
    fn test_install_into_destdir_skips_hooks() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/viewer"), "binary").unwrap();
        let staging = dir.path().join("staging");

        let mut files = BTreeMap::new();
        files.insert("bin/viewer".to_string(), "usr/bin/".to_string());
        let set = InstallSet {
            files,
            on_system_install: vec!["touch hook.ran".to_string()],
            trigger: None,
            destdir_flag: "--destdir".to_string(),
        };
        let mut installs = BTreeMap::new();
        installs.insert("viewer".to_string(), set);

        let mut ns = Namespace::new();
        ns.define_target(
            "install",
            None,
            Arc::new(ScriptTarget::new(
                vec![Step::Install(InstallStep {
                    install: "viewer".into(),
                })],
                Arc::new(installs),
            )),
        );

        let destdir = staging.to_string_lossy().into_owned();
        run(&dir, &ns, "install", &["--destdir", &destdir]).unwrap();
        assert!(staging.join("usr/bin/viewer").exists());
        assert!(!dir.path().join("hook.ran").exists());
    }

    #[test]
    fn test_empty_destdir_installs_nothing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        fs::write(dir.path().join("bin/viewer"), "binary").unwrap();

        let mut files = BTreeMap::new();
        files.insert("bin/viewer".to_string(), "usr/bin/".to_string());
        let mut installs = BTreeMap::new();
        installs.insert(
            "viewer".to_string(),
            InstallSet {
                files,
                destdir_flag: "--destdir".to_string(),
                ..Default::default()
            },
        );
        let mut ns = Namespace::new();
        ns.define_target(
            "install",
            None,
            Arc::new(ScriptTarget::new(
                vec![Step::Install(InstallStep {
                    install: "viewer".into(),
                })],
                Arc::new(installs),
            )),
        );

        let err = run(&dir, &ns, "install", &["--destdir="]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UsageError>(),
            Some(UsageError::MissingArgument { flag }) if flag == "--destdir"
        ));
        assert!(!dir.path().join("usr").exists());
    }

    #[test]
    fn test_unknown_install_set() {
        let dir = TempDir::new().unwrap();
        let mut ns = Namespace::new();
        ns.define_target(
            "install",
            None,
            script_target(vec![Step::Install(InstallStep {
                install: "nothing".into(),
            })]),
        );
        assert!(run(&dir, &ns, "install", &[]).is_err());
    }
}
