// src/models.rs

use crate::system::executor::FailurePolicy;
use crate::system::pkg_config::PkgConfigKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- `mkrs.toml` MODELS (what is read from a project script) ---

/// The deserialized structure of a project script.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptFile {
    /// Other scripts to import wholesale; `"mkrs"` imports the engine builtins.
    #[serde(default)]
    pub include: Vec<String>,
    /// Extra flags to offer in tab completion.
    #[serde(default)]
    pub completions: Vec<String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionDef>,
    #[serde(default)]
    pub pkg_config: BTreeMap<String, PkgConfigDef>,
    /// Variables whose value is the output of a command, remembered after the first run.
    #[serde(default)]
    pub computed: BTreeMap<String, String>,
    /// Variables built from templates over the ones above.
    #[serde(default)]
    pub derived: BTreeMap<String, String>,
    #[serde(default)]
    pub ensure_dirs: Vec<String>,
    #[serde(default)]
    pub installs: BTreeMap<String, InstallSet>,
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDef>,
}

/// A persistent option, e.g. the build mode.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct OptionDef {
    /// Comma separated aliases that override the remembered value, e.g. `"-M,--mode"`.
    pub flag: Option<String>,
    pub default: String,
    /// When present the option is an enumeration: keys are the allowed values,
    /// values are what `bind` receives.
    pub choices: Option<BTreeMap<String, String>>,
    /// Extra variable to bind the (mapped) value to.
    pub bind: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PkgConfigDef {
    pub packages: Vec<String>,
    #[serde(default)]
    pub kind: PkgConfigKind,
}

/// Files to copy on install, keyed by project-relative source path.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InstallSet {
    pub files: BTreeMap<String, String>,
    /// Commands run after a system-wide install (no destdir, or destdir `/`).
    #[serde(default)]
    pub on_system_install: Vec<String>,
    /// Only run the hooks when some installed path contains this text.
    pub trigger: Option<String>,
    #[serde(default = "default_destdir_flag")]
    pub destdir_flag: String,
}

fn default_destdir_flag() -> String {
    "--destdir".to_string()
}

/// A target definition. Uses `untagged` for flexible syntax:
///
/// ```toml
/// [targets]
/// search = "gcc {FLAGS} -o bin/search search.c -lm"
/// both = ["gcc -c a.c", { call = "search" }]
///
/// [targets.install]
/// desc = "Install the viewer"
/// steps = [{ install = "viewer" }]
/// ```
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum TargetDef {
    Command(String),
    Steps(Vec<Step>),
    Extended(ExtendedTarget),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExtendedTarget {
    pub desc: Option<String>,
    pub steps: Vec<Step>,
}

impl TargetDef {
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Extended(ext) => ext.desc.as_deref(),
            _ => None,
        }
    }

    pub fn into_steps(self) -> Vec<Step> {
        match self {
            Self::Command(cmd) => vec![Step::Command(cmd)],
            Self::Steps(steps) => steps,
            Self::Extended(ext) => ext.steps,
        }
    }
}

/// One action of a target. All strings are command templates.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Step {
    /// A bare string runs with the default options.
    Command(String),
    Run(RunStep),
    Call(CallStep),
    EnsureDir(EnsureDirStep),
    Print(PrintStep),
    Require(RequireStep),
    Install(InstallStep),
    Remember(RememberStep),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunStep {
    pub run: String,
    /// Discard the command's stdout.
    #[serde(default)]
    pub quiet: bool,
    #[serde(default = "default_true")]
    pub echo: bool,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct CallStep {
    pub call: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnsureDirStep {
    pub ensure_dir: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PrintStep {
    pub print: String,
}

/// Stops the target (successfully) with a message when `require` is missing.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RequireStep {
    pub require: String,
    pub message: Option<String>,
}

/// Copies an install set. The destination comes from the set's `destdir_flag`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct InstallStep {
    pub install: String,
}

/// Stores `value` under the option key `remember`.
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RememberStep {
    pub remember: String,
    pub value: String,
}

fn default_true() -> bool {
    true
}

// --- ENGINE CONFIGURATION (~/.config/mkrs/config.toml) ---

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfigFile {
    pub completion_dir: Option<String>,
    pub script_name: Option<String>,
}

/// The resolved engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub completion_dir: PathBuf,
    pub script_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_script() {
        let script: ScriptFile = toml::from_str(
            r#"
            include = ["mkrs"]
            completions = ["--get_run_deps"]
            ensure_dirs = ["bin"]

            [vars]
            DEP_FLAGS = "-lcairo -lm"

            [options.mode]
            flag = "-M,--mode"
            default = "debug"
            choices = { debug = "-Og -g -Wall", release = "-O2 -DNDEBUG -Wall" }
            bind = "FLAGS"

            [pkg_config.PANGO_FLAGS]
            packages = ["pango", "pangocairo"]

            [computed]
            GIT_REV = "git rev-parse --short HEAD"

            [installs.viewer]
            files = { "bin/viewer" = "usr/bin/" }
            on_system_install = ["gtk-update-icon-cache-3.0 /usr/share/icons/hicolor/"]
            trigger = "hicolor"

            [targets]
            search = "gcc {FLAGS} -o bin/search search.c -lm"
            all = [
                "echo start",
                { call = "search" },
                { run = "ls", quiet = true, on_failure = "abort" },
            ]

            [targets.install]
            desc = "Install the viewer"
            steps = [
                { require = "bin/viewer", message = "No binary, run: mkrs viewer" },
                { install = "viewer" },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(script.include, vec!["mkrs"]);
        let mode = script.options.get("mode").unwrap();
        assert_eq!(mode.choices.as_ref().unwrap().len(), 2);
        assert_eq!(
            script.pkg_config.get("PANGO_FLAGS").unwrap().kind,
            PkgConfigKind::Both
        );
        assert_eq!(
            script.installs.get("viewer").unwrap().destdir_flag,
            "--destdir"
        );

        let all = script.targets.get("all").unwrap().clone().into_steps();
        assert_eq!(all.len(), 3);
        assert!(matches!(all[0], Step::Command(_)));
        assert!(matches!(all[1], Step::Call(_)));
        match &all[2] {
            Step::Run(run) => {
                assert!(run.quiet);
                assert!(run.echo);
                assert_eq!(run.on_failure, FailurePolicy::Abort);
            }
            other => panic!("expected a run step, got {:?}", other),
        }

        let install = script.targets.get("install").unwrap();
        assert_eq!(install.description(), Some("Install the viewer"));
        let steps = install.clone().into_steps();
        assert!(matches!(steps[0], Step::Require(_)));
        assert!(matches!(steps[1], Step::Install(_)));
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let result: Result<ScriptFile, _> = toml::from_str("target = 1");
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_step_keys_are_rejected() {
        let install: Result<TargetDef, _> = toml::from_str(
            r#"steps = [{ install = "viewer", destdir = "/tmp/staging" }]"#,
        );
        assert!(install.is_err());

        let call: Result<ScriptFile, _> = toml::from_str(
            r#"
            [targets]
            all = [{ call = "build", on_failure = "abort" }]
            "#,
        );
        assert!(call.is_err());

        let require: Result<ScriptFile, _> = toml::from_str(
            r#"
            [targets]
            install = [{ require = "bin/viewer", mesage = "typo" }]
            "#,
        );
        assert!(require.is_err());
    }

    #[test]
    fn test_empty_script_is_valid() {
        let script: ScriptFile = toml::from_str("").unwrap();
        assert!(script.targets.is_empty());
    }
}
