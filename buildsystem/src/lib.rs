//! ECS deploy automation for build pipelines.
//!
//! Translates `build.toml` into ECS task and container definitions, renders
//! the `aws ecs` commands that register and deploy them, and interprets the
//! CLI's JSON output.
//!
//! - **[`core`]**: Pure, deterministic logic (identity, definition merging,
//!   command templates, response parsing). No I/O.
//! - **[`io`]**: Side effects (environment, git, config discovery, process
//!   execution), isolated behind small interfaces so tests can script them.
//!
//! [`context`] gathers config and identity once per process; [`deploy`]
//! orchestrates core logic over a [`io::exec::CommandRunner`].

pub mod config;
pub mod context;
pub mod core;
pub mod deploy;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
