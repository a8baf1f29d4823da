// src/cli/mod.rs

use crate::core::arg_parser::UsageError;
use crate::core::store::OptionError;
use clap::Parser;
use std::path::PathBuf;

pub mod dispatcher;

/// mkrs: runs the targets of a project's `mkrs.toml`.
///
/// Everything after the target name is left to the script: persistent options
/// such as `-M,--mode` and install flags such as `--destdir` are declared there.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Script to load, relative to the project directory.
    #[arg(short = 'f', long = "file", value_name = "SCRIPT")]
    pub file: Option<PathBuf>,

    /// Project directory. Defaults to the current directory.
    #[arg(short = 'C', long = "directory", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Target to run, followed by engine and target flags.
    #[arg(
        value_name = "TARGET",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Finds a usage error anywhere in `err`'s chain.
///
/// `OptionError` wraps usage errors transparently, which hides them from a
/// plain downcast of the chain, so it is unwrapped explicitly.
pub fn usage_error(err: &anyhow::Error) -> Option<&UsageError> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<UsageError>()
            .or_else(|| match cause.downcast_ref::<OptionError>() {
                Some(OptionError::Usage(usage)) => Some(usage),
                _ => None,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_target_flags_are_passed_through() {
        let cli = Cli::try_parse_from(["mkrs", "-C", "/tmp", "search", "-M", "release"]).unwrap();
        assert_eq!(cli.directory, Some(PathBuf::from("/tmp")));
        assert_eq!(cli.args, vec!["search", "-M", "release"]);
    }

    #[test]
    fn test_reserved_flag_is_a_plain_argument() {
        let cli = Cli::try_parse_from(["mkrs", "--get_completions"]).unwrap();
        assert_eq!(cli.args, vec!["--get_completions"]);
    }

    #[test]
    fn test_completion_query_keeps_the_project_flags() {
        let cli =
            Cli::try_parse_from(["mkrs", "-C", "proj", "-f", "other.toml", "--get_completions"])
                .unwrap();
        assert_eq!(cli.directory, Some(PathBuf::from("proj")));
        assert_eq!(cli.file, Some(PathBuf::from("other.toml")));
        assert_eq!(cli.args, vec!["--get_completions"]);
    }

    #[test]
    fn test_usage_error_is_found_through_wrappers() {
        let usage = UsageError::MissingArgument {
            flag: "--mode".to_string(),
        };
        let wrapped: anyhow::Error = Err::<(), _>(OptionError::from(usage.clone()))
            .context("While loading mkrs.toml")
            .unwrap_err();
        assert_eq!(usage_error(&wrapped), Some(&usage));

        let other = anyhow::anyhow!("disk full");
        assert!(usage_error(&other).is_none());
    }
}
