//! Execution collaborator for CLI commands.
//!
//! The [`CommandRunner`] trait decouples deploy orchestration from actually
//! spawning `aws`. Tests use scripted runners that return canned output.

use std::cell::RefCell;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::config::ExecConfig;
use crate::core::commands::CliCommand;
use crate::error::DeployError;
use crate::io::process::run_with_timeout;

/// Outcome of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub success: bool,
    /// `None` when killed by a signal or timed out.
    pub exit_code: Option<i32>,
}

/// Abstraction over process execution backends.
pub trait CommandRunner {
    /// Run `command` to completion. Non-success is reported in the result,
    /// not as an error; errors mean the command could not be run at all.
    fn run(&self, command: &CliCommand) -> Result<CommandResult>;

    /// Run `command` and return stdout, failing with
    /// [`DeployError::CommandFailure`] on non-success.
    fn run_capturing(&self, command: &CliCommand) -> Result<String> {
        let result = self.run(command)?;
        if !result.success {
            return Err(DeployError::CommandFailure {
                command: command.render(),
                status: result.exit_code,
            }
            .into());
        }
        Ok(result.stdout)
    }
}

/// Rendered commands in execution order, printed when the process exits.
#[derive(Debug, Default)]
pub struct CommandLog {
    entries: RefCell<Vec<String>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, command: &CliCommand) {
        self.entries.borrow_mut().push(command.render());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    /// Emit every recorded command at `info` level.
    pub fn flush(&self) {
        let entries = self.entries.borrow();
        if entries.is_empty() {
            return;
        }
        info!(count = entries.len(), "command log");
        for command in entries.iter() {
            info!("$ {command}");
        }
    }
}

/// Runner that spawns commands directly (no shell) with a timeout.
#[derive(Debug)]
pub struct ProcessRunner {
    timeout: Duration,
    output_limit_bytes: usize,
    log: CommandLog,
}

impl ProcessRunner {
    pub fn new(exec: &ExecConfig) -> Self {
        Self {
            timeout: Duration::from_secs(exec.timeout_secs),
            output_limit_bytes: exec.output_limit_bytes,
            log: CommandLog::new(),
        }
    }

    pub fn log(&self) -> &CommandLog {
        &self.log
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = %command.program))]
    fn run(&self, command: &CliCommand) -> Result<CommandResult> {
        self.log.record(command);
        debug!(command = %command, "running command");

        let mut cmd = Command::new(&command.program);
        cmd.args(command.arg_values());
        for (key, value) in &command.env {
            cmd.env(key, value);
        }

        let output = run_with_timeout(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {}", command.program))?;

        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "command timed out");
        } else if !output.status.success() {
            warn!(
                exit_code = ?output.exit_code(),
                stderr = %output.stderr.text().trim(),
                "command failed"
            );
        }

        Ok(CommandResult {
            stdout: output.stdout.text(),
            success: output.success(),
            exit_code: output.exit_code(),
        })
    }
}
