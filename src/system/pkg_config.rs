// src/system/pkg_config.rs

use crate::system::executor::{self, ExecutionError};
use serde::Deserialize;
use std::path::Path;

/// Which flags to ask `pkg-config` for.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PkgConfigKind {
    Libs,
    Cflags,
    /// Include flags followed by link flags.
    #[default]
    Both,
}

impl PkgConfigKind {
    fn args(self) -> &'static str {
        match self {
            Self::Libs => "--libs",
            Self::Cflags => "--cflags",
            Self::Both => "--cflags --libs",
        }
    }
}

/// Builds the `pkg-config` command line for `packages`, quoting each name.
pub fn command_line(kind: PkgConfigKind, packages: &[String]) -> String {
    let quoted: Vec<String> = packages
        .iter()
        .map(|p| {
            shlex::try_quote(p)
                .map(|q| q.into_owned())
                .unwrap_or_else(|_| p.clone())
        })
        .collect();
    format!("pkg-config {} {}", kind.args(), quoted.join(" "))
}

/// Asks `pkg-config` for compiler flags. `kind` picks link flags, include
/// flags, or both.
pub fn lookup(
    kind: PkgConfigKind,
    packages: &[String],
    cwd: &Path,
) -> Result<String, ExecutionError> {
    executor::capture(&command_line(kind, packages), cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PkgConfigDef;

    #[test]
    fn test_command_line() {
        let pkgs = vec!["pango".to_string(), "pangocairo".to_string()];
        assert_eq!(
            command_line(PkgConfigKind::Libs, &pkgs),
            "pkg-config --libs pango pangocairo"
        );
        assert_eq!(
            command_line(PkgConfigKind::Cflags, &pkgs),
            "pkg-config --cflags pango pangocairo"
        );
        assert_eq!(
            command_line(PkgConfigKind::Both, &pkgs),
            "pkg-config --cflags --libs pango pangocairo"
        );
    }

    #[test]
    fn test_kind_from_script() {
        let def: PkgConfigDef =
            toml::from_str("packages = [\"cairo\"]\nkind = \"cflags\"").unwrap();
        assert_eq!(def.kind, PkgConfigKind::Cflags);
        assert_eq!(
            command_line(def.kind, &def.packages),
            "pkg-config --cflags cairo"
        );

        let bad: Result<PkgConfigDef, _> =
            toml::from_str("packages = [\"cairo\"]\nkind = \"includes\"");
        assert!(bad.is_err());
    }
}
