//! Named failure conditions surfaced by the deploy core.
//!
//! Orchestration code wraps these in `anyhow::Error` with context; `main`
//! downcasts them to pick an exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building definitions or interpreting CLI output.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployError {
    /// CLI output could not be parsed as JSON.
    #[error("malformed response: {context}: {message}")]
    MalformedResponse { context: String, message: String },

    /// JSON parsed, but an expected key is absent.
    #[error("missing field `{field}` in response")]
    MissingField { field: String },

    /// `run-task` returned an empty `tasks` list.
    #[error("response contains an empty `tasks` list")]
    EmptyTaskList,

    /// A process invocation reported non-success.
    #[error("`{command}` failed with {}", describe_status(.status))]
    CommandFailure { command: String, status: Option<i32> },

    /// No `build.toml` in the working directory or any parent below `stop`.
    #[error(
        "couldn't find build.toml in {} or any parent directory below {}. Are you sure you're in the right directory?",
        .start.display(),
        .stop.display()
    )]
    ConfigurationMissing { start: PathBuf, stop: PathBuf },

    /// A task variable was not of the form `NAME=VALUE`.
    #[error("malformed task variable `{0}` (expected NAME=VALUE)")]
    MalformedTaskVariable(String),

    /// A task definition override sets `cpu` or `memory` to zero.
    #[error("task definition `{field}` must be a positive integer")]
    ZeroResourceSize { field: String },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit status {code}"),
        None => "no exit status (terminated by signal or timeout)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failure_embeds_exit_status() {
        let err = DeployError::CommandFailure {
            command: "aws ecs list-tasks".to_string(),
            status: Some(254),
        };
        assert_eq!(
            err.to_string(),
            "`aws ecs list-tasks` failed with exit status 254"
        );
    }

    #[test]
    fn command_failure_without_status() {
        let err = DeployError::CommandFailure {
            command: "aws".to_string(),
            status: None,
        };
        assert!(err.to_string().contains("no exit status"));
    }
}
