// src/core/arg_parser.rs

use thiserror::Error;

/// A mistake on the command line. Reported as a one-line diagnostic, never a crash.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Option '{flag}' requires an argument.")]
    MissingArgument { flag: String },
    #[error("Option '{flag}' does not take an argument (got '{value}').")]
    UnexpectedArgument { flag: String, value: String },
    #[error("Invalid value '{value}' for '{flag}'. Allowed values: {allowed}.")]
    DisallowedValue {
        flag: String,
        value: String,
        allowed: String,
    },
    /// A value for a remembered option that did not come from a command-line flag.
    #[error("Invalid value '{value}' for option '{key}'. Allowed values: {allowed}.")]
    DisallowedSetting {
        key: String,
        value: String,
        allowed: String,
    },
}

/// The outcome of looking up a named option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliValue {
    Absent,
    /// The flag was given and takes no argument.
    Present,
    Value(String),
}

impl CliValue {
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// The arguments that follow the target name on the command line.
///
/// Options are not declared up front: each target (or the script's top level)
/// asks for the aliases it understands, and every argument it claims is marked
/// as consumed so leftovers can be reported afterwards.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    args: Vec<String>,
    consumed: Vec<bool>,
}

impl CliArgs {
    pub fn new(args: Vec<String>) -> Self {
        let consumed = vec![false; args.len()];
        Self { args, consumed }
    }

    /// Looks up a named option.
    ///
    /// `spec` is a comma separated list of aliases (`"-M,--mode"`). An option
    /// takes an argument when `has_argument` is set or `allowed_values` is given;
    /// both `--mode release` and `--mode=release` are accepted. The first
    /// occurrence wins.
    pub fn get_cli_option(
        &mut self,
        spec: &str,
        allowed_values: Option<&[&str]>,
        has_argument: bool,
    ) -> Result<CliValue, UsageError> {
        let takes_argument = has_argument || allowed_values.is_some();
        let aliases: Vec<&str> = spec
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect();

        let found = self.args.iter().enumerate().find_map(|(index, arg)| {
            match_alias(arg, &aliases)
                .map(|(alias, inline)| (index, alias.to_string(), inline.map(str::to_string)))
        });
        let Some((index, flag, inline_value)) = found else {
            return Ok(CliValue::Absent);
        };

        if !takes_argument {
            if let Some(value) = inline_value {
                return Err(UsageError::UnexpectedArgument { flag, value });
            }
            self.mark_consumed(index);
            return Ok(CliValue::Present);
        }

        let (value, value_index) = match inline_value {
            Some(v) => (v, None),
            None => match self.args.get(index + 1) {
                Some(next) if !next.starts_with('-') => (next.clone(), Some(index + 1)),
                _ => return Err(UsageError::MissingArgument { flag }),
            },
        };

        if let Some(allowed) = allowed_values {
            if !allowed.contains(&value.as_str()) {
                return Err(UsageError::DisallowedValue {
                    flag,
                    value,
                    allowed: allowed.join(", "),
                });
            }
        }

        self.mark_consumed(index);
        if let Some(i) = value_index {
            self.mark_consumed(i);
        }
        Ok(CliValue::Value(value))
    }

    /// Presence check for a flag without an argument.
    pub fn flag(&mut self, spec: &str) -> Result<bool, UsageError> {
        Ok(self.get_cli_option(spec, None, false)?.is_present())
    }

    /// Value of an option that takes an argument, if given.
    pub fn value(
        &mut self,
        spec: &str,
        allowed_values: Option<&[&str]>,
    ) -> Result<Option<String>, UsageError> {
        Ok(self.get_cli_option(spec, allowed_values, true)?.into_value())
    }

    /// Arguments nobody asked for.
    pub fn unconsumed(&self) -> Vec<&str> {
        self.args
            .iter()
            .zip(&self.consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(arg, _)| arg.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    fn mark_consumed(&mut self, index: usize) {
        if let Some(slot) = self.consumed.get_mut(index) {
            *slot = true;
        }
    }
}

/// Matches `arg` against the aliases, either exactly or as `alias=value`.
fn match_alias<'a, 'b>(arg: &'a str, aliases: &[&'b str]) -> Option<(&'b str, Option<&'a str>)> {
    aliases.iter().find_map(|alias| {
        if arg == *alias {
            Some((*alias, None))
        } else {
            arg.strip_prefix(alias)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|value| (*alias, Some(value)))
        }
    })
}
