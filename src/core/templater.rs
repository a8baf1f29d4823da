// src/core/templater.rs

use crate::core::namespace::Namespace;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;

lazy_static! {
    /// Matches, in priority order: escaped braces, a `{...}` placeholder, or a stray brace.
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").unwrap();
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{name}` placeholder has no binding in the environment.
    #[error("Unresolved placeholder '{{{name}}}': no string variable named '{name}' is defined.")]
    MissingVariable { name: String },
    #[error("Malformed command template '{template}': {reason}")]
    Malformed { template: String, reason: String },
}

/// The set of string variables a command template is resolved against.
///
/// Nothing is looked up implicitly: callers construct the environment, usually
/// with [`Environment::from_namespace`], and may layer extra bindings on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every top-level string binding of a loaded script.
    pub fn from_namespace(namespace: &Namespace) -> Self {
        namespace
            .string_bindings()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Returns a copy of this environment with one extra binding.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Substitutes every `{name}` placeholder in `template` with its value from `env`.
///
/// `{{` and `}}` produce literal braces. Any placeholder without a binding is a
/// `MissingVariable` error; the template is never partially resolved.
pub fn resolve(template: &str, env: &Environment) -> Result<String, TemplateError> {
    let mut resolved = String::with_capacity(template.len());
    let mut last_end = 0;

    for captures in PLACEHOLDER_RE.captures_iter(template) {
        let Some(full) = captures.get(0) else {
            continue;
        };
        resolved.push_str(template.get(last_end..full.start()).unwrap_or_default());
        last_end = full.end();

        match (full.as_str(), captures.get(1)) {
            ("{{", _) => resolved.push('{'),
            ("}}", _) => resolved.push('}'),
            (_, Some(name)) => {
                let name = name.as_str();
                if !IDENTIFIER_RE.is_match(name) {
                    return Err(TemplateError::Malformed {
                        template: template.to_string(),
                        reason: format!("'{{{}}}' is not a valid placeholder", name),
                    });
                }
                let value = env
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingVariable {
                        name: name.to_string(),
                    })?;
                resolved.push_str(value);
            }
            (stray, None) => {
                return Err(TemplateError::Malformed {
                    template: template.to_string(),
                    reason: format!(
                        "unmatched '{}' at byte {} (use '{}{}' for a literal brace)",
                        stray,
                        full.start(),
                        stray,
                        stray
                    ),
                });
            }
        }
    }

    resolved.push_str(template.get(last_end..).unwrap_or_default());
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_resolve_substitutes_flags() {
        let resolved = resolve("gcc {FLAGS} -o out.o", &env(&[("FLAGS", "-O2")])).unwrap();
        assert_eq!(resolved, "gcc -O2 -o out.o");
    }

    #[test]
    fn test_resolve_missing_variable_is_an_error() {
        let err = resolve("gcc {MISSING} -o out.o", &Environment::new()).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingVariable {
                name: "MISSING".to_string()
            }
        );
        assert!(err.to_string().contains("MISSING"));
    }

    #[test]
    fn test_resolve_empty_value_is_kept_empty() {
        // An empty binding is still a binding.
        let resolved = resolve("cc {EXTRA}main.c", &env(&[("EXTRA", "")])).unwrap();
        assert_eq!(resolved, "cc main.c");
    }

    #[test]
    fn test_resolve_escaped_braces() {
        let resolved = resolve("echo {{HOME}} ${{X}} {A}", &env(&[("A", "a")])).unwrap();
        assert_eq!(resolved, "echo {HOME} ${X} a");
    }

    #[test]
    fn test_resolve_repeated_and_adjacent_placeholders() {
        let resolved = resolve("{A}{B}-{A}", &env(&[("A", "1"), ("B", "2")])).unwrap();
        assert_eq!(resolved, "12-1");
    }

    #[test]
    fn test_resolve_does_not_reinterpret_substituted_values() {
        let resolved = resolve("echo {A}", &env(&[("A", "{B}")])).unwrap();
        assert_eq!(resolved, "echo {B}");
    }

    #[test]
    fn test_resolve_stray_brace_is_malformed() {
        assert!(matches!(
            resolve("awk '{print $1'", &Environment::new()),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            resolve("echo }", &Environment::new()),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_resolve_invalid_placeholder_body_is_malformed() {
        assert!(matches!(
            resolve("echo { spaced }", &env(&[("spaced", "x")])),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            resolve("echo {}", &Environment::new()),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_environment_with_overrides() {
        let base = env(&[("A", "1")]);
        let layered = base.clone().with("A", "2").with("B", "3");
        assert_eq!(base.get("A"), Some("1"));
        assert_eq!(layered.get("A"), Some("2"));
        assert_eq!(layered.len(), 2);
    }
}
