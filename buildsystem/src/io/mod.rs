//! Side-effecting helpers: environment, git, config files, processes.

pub mod config;
pub mod env;
pub mod exec;
pub mod git;
pub mod process;
