// src/constants.rs

/// The name of the directory holding mkrs state for a project (at the project root).
pub const MKRS_DIR: &str = ".mkrs";

/// The name of the persistent option store file (inside .mkrs/).
pub const OPTIONS_FILENAME: &str = "options.bin";

/// The default name of the project script, looked up in the project root.
pub const DEFAULT_SCRIPT_FILENAME: &str = "mkrs.toml";

/// The name of the user-level configuration file (in ~/.config/mkrs/).
pub const ENGINE_CONFIG_FILENAME: &str = "config.toml";

/// The name under which the completion script is installed.
pub const COMPLETION_SCRIPT_NAME: &str = "mkrs";

/// The system-wide bash-completion directory.
pub const DEFAULT_COMPLETION_DIR: &str = "/usr/share/bash-completion/completions";

/// The include entry that imports every engine builtin into a script.
pub const ENGINE_INCLUDE: &str = "mkrs";

/// The target invoked when no target name is given.
pub const DEFAULT_TARGET: &str = "default";

/// Maximum nesting of target-to-target calls before we assume a cycle.
pub const MAX_CALL_DEPTH: u32 = 32;
