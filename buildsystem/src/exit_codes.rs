//! Stable exit codes for buildsystem CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed (invalid config, malformed response, refused deploy, ...).
pub const FAILED: i32 = 1;
// 2 is reserved for usage errors reported by clap.
/// No `build.toml` found between the working directory and the home directory.
pub const CONFIG_MISSING: i32 = 3;
/// An external command (`aws`) reported non-success.
pub const COMMAND_FAILED: i32 = 4;
