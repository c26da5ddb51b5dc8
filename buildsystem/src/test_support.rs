//! Test-only helpers: a scripted command runner and a sample build config.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::config::{BuildConfig, CONFIG_FILE};
use crate::context::BuildContext;
use crate::core::commands::CliCommand;
use crate::core::identity::{BranchSource, EnvSnapshot};
use crate::io::exec::{CommandResult, CommandRunner};

/// Sample `build.toml` with one project and two docker tasks.
pub const SAMPLE_CONFIG: &str = r#"
[deploy]
repository = "buildsystem"
registry = "123456789012.dkr.ecr.us-west-1.amazonaws.com"
ecs_task_execution_role_arn = "arn:aws:iam::123456789012:role/ecsTaskExecutionRole"
aws_region = "us-west-1"
subnets = ["subnet-a"]
security_groups = ["sg-a"]

[clusters]
develop = "DEVELOP"
production = "PRODUCTION"

[projects.connect]
image = "connect"

[projects.connect.docker_build_args]
RUBY_VERSION = "3.3"

[projects.connect.docker_tasks.connect_web.task_definition.default]
cpu = 512
memory = 1024

[projects.connect.docker_tasks.connect_web.task_definition.production]
cpu = 2048
memory = 4096

[projects.connect.docker_tasks.connect_web.task_environment]
ENABLE_WEB = 1
WORKER_QUEUE = "@web"

[projects.connect.docker_tasks.connect_migrate]
command = ["bin/rails", "db:migrate"]
"#;

/// Branch source that never shells out.
pub struct FixedBranch(pub String);

impl BranchSource for FixedBranch {
    fn current_branch(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

pub fn sample_config() -> BuildConfig {
    toml::from_str(SAMPLE_CONFIG).expect("sample config parses")
}

/// Context over [`SAMPLE_CONFIG`] on `branch` with build number 233.
pub fn sample_context(branch: &str, dry_run: bool) -> BuildContext {
    let env = EnvSnapshot {
        dry_run,
        run_id: Some("233".to_string()),
        enc_key: Some("secret".to_string()),
        ..EnvSnapshot::default()
    };
    BuildContext::new(
        "/repo",
        sample_config(),
        env,
        &FixedBranch(branch.to_string()),
    )
    .expect("sample context")
}

/// Write [`SAMPLE_CONFIG`] into `dir`.
pub fn write_sample_config(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, SAMPLE_CONFIG).with_context(|| format!("write {}", path.display()))
}

/// Temporary project root containing [`SAMPLE_CONFIG`].
pub fn sample_project() -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir().context("create tempdir")?;
    write_sample_config(dir.path())?;
    Ok(dir)
}

/// Runner that returns queued results in order and records rendered commands.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<CommandResult>>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(responses: Vec<CommandResult>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Successful result with `stdout`.
    pub fn ok(stdout: &str) -> CommandResult {
        CommandResult {
            stdout: stdout.to_string(),
            success: true,
            exit_code: Some(0),
        }
    }

    /// Failed result with `exit_code`.
    pub fn failed(exit_code: i32) -> CommandResult {
        CommandResult {
            stdout: String::new(),
            success: false,
            exit_code: Some(exit_code),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &CliCommand) -> Result<CommandResult> {
        self.calls.borrow_mut().push(command.render());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted response for `{command}`"))
    }
}
