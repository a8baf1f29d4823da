//! # System Interaction Layer
//!
//! Everything that touches the operating system on behalf of a target: shell
//! commands, `pkg-config` lookups, file installation and the bash completion
//! script.
//!
//! ## Modules
//!
//! - **`executor`**: runs resolved command templates through the platform shell
//!   (`sh -c`, or `cmd /C` on Windows), echoing them first. Captures output for
//!   computed variables.
//! - **`pkg_config`**: memoizable compiler and linker flag lookups.
//! - **`install`**: copies install sets under a destination root.
//! - **`completions`**: the completion query, the staleness check and the
//!   installer for the canonical completion script.

pub mod completions;
pub mod executor;
pub mod install;
pub mod pkg_config;
