// src/system/executor.rs

use crate::core::templater::{self, Environment, TemplateError};
use colored::Colorize;
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Command '{0}' could not be executed: {1}")]
    Spawn(String, std::io::Error),
    #[error("Command '{command}' exited with {status}.")]
    NonZeroExitStatus { command: String, status: ExitStatus },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// What a failing child command means for the caller.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Hand the exit status back; the caller decides.
    #[default]
    Continue,
    /// Turn a non-zero exit status into [`ExecutionError::NonZeroExitStatus`].
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Send the child's stdout to the null device. Stderr always stays visible.
    pub suppress_output: bool,
    /// Print the resolved command before running it.
    pub echo: bool,
    pub on_failure: FailurePolicy,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            suppress_output: false,
            echo: true,
            on_failure: FailurePolicy::Continue,
        }
    }
}

/// Resolves `template` against `env` and runs it as a single shell command.
///
/// Template errors are returned before anything is spawned. A non-zero exit
/// status is only an error under [`FailurePolicy::Abort`].
pub fn execute(
    template: &str,
    env: &Environment,
    cwd: &Path,
    options: ExecOptions,
) -> Result<ExitStatus, ExecutionError> {
    execute_to(template, env, cwd, options, &mut std::io::stdout())
}

/// Like [`execute`], with the echoed command line written to `echo_out`.
pub fn execute_to<W: Write>(
    template: &str,
    env: &Environment,
    cwd: &Path,
    options: ExecOptions,
    echo_out: &mut W,
) -> Result<ExitStatus, ExecutionError> {
    let command_line = templater::resolve(template, env)?;
    run_shell(&command_line, cwd, options, echo_out)
}

/// Runs an already resolved command line through the platform shell.
pub fn run_shell<W: Write>(
    command_line: &str,
    cwd: &Path,
    options: ExecOptions,
    echo_out: &mut W,
) -> Result<ExitStatus, ExecutionError> {
    if options.echo {
        writeln!(echo_out, "{} {}", "→".blue(), command_line.green()).ok();
        // Keep the echo ahead of the child's own output.
        echo_out.flush().ok();
    }

    let stdout = if options.suppress_output {
        Stdio::null()
    } else {
        Stdio::inherit()
    };

    log::debug!("Running '{}' in '{}'", command_line, cwd.display());
    let status = shell_command(command_line)
        .current_dir(dunce::simplified(cwd))
        .stdin(Stdio::inherit())
        .stdout(stdout)
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| ExecutionError::Spawn(command_line.to_string(), e))?;

    if !status.success() {
        log::debug!("'{}' exited with {}", command_line, status);
        if options.on_failure == FailurePolicy::Abort {
            return Err(ExecutionError::NonZeroExitStatus {
                command: command_line.to_string(),
                status,
            });
        }
    }
    Ok(status)
}

/// Runs a command and returns its trimmed standard output.
/// Stderr is passed through to the user's terminal; a non-zero exit is an error.
pub fn capture(command_line: &str, cwd: &Path) -> Result<String, ExecutionError> {
    log::debug!("Capturing output of '{}'", command_line);
    let output = shell_command(command_line)
        .current_dir(dunce::simplified(cwd))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| ExecutionError::Spawn(command_line.to_string(), e))?;

    if !output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus {
            command: command_line.to_string(),
            status: output.status,
        });
    }

    let text = String::from_utf8(output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: command_line.to_string(),
        source: e,
    })?;
    Ok(text.trim().to_string())
}

fn shell_command(command_line: &str) -> StdCommand {
    if cfg!(target_os = "windows") {
        let mut command = StdCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = StdCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}
