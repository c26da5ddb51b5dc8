//! Orchestration for registering task definitions, updating services and
//! running one-off tasks.
//!
//! Each operation plans from the [`BuildContext`], renders commands through
//! `core::commands`, runs them via a [`CommandRunner`] and interprets the
//! output with `core::response`. Nothing is retried.

use anyhow::{Context, Result, bail};
use tracing::{debug, info, instrument};

use crate::context::BuildContext;
use crate::core::commands::{self, CliCommand};
use crate::core::container::container_definitions_json;
use crate::core::identity::EnvironmentIdentity;
use crate::core::response::{parse_task_arn, parse_task_revision};
use crate::core::task_definition::{TaskDefinitionInputs, build_task_definition};
use crate::core::task_inputs::{select_task_definition, task_environment, task_tags};
use crate::core::types::{DeployTarget, Tag, TaskDefinition};
use crate::io::exec::CommandRunner;

/// Everything needed to register and deploy one docker task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
    pub identity: EnvironmentIdentity,
    pub target: DeployTarget,
    pub task_definition: TaskDefinition,
    /// Compact JSON for `--container-definitions`.
    pub container_definitions: String,
    pub tags: Vec<Tag>,
}

impl TaskPlan {
    pub fn register_command(&self) -> Result<CliCommand> {
        commands::register_task_definition(
            &self.task_definition,
            &self.container_definitions,
            &self.tags,
        )
        .context("render register-task-definition")
    }

    /// `family:revision`, or the bare family (latest active revision) when the
    /// revision is unknown.
    pub fn task_definition_ref(&self, revision: Option<u64>) -> String {
        match revision {
            Some(revision) => format!("{}:{revision}", self.task_definition.family),
            None => self.task_definition.family.clone(),
        }
    }
}

/// Result of [`deploy_service`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    /// `None` in dry-run mode.
    pub revision: Option<u64>,
    pub task_definition: String,
    /// Rendered commands, executed or (in dry-run) planned.
    pub commands: Vec<String>,
}

/// Result of [`run_task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTaskOutcome {
    pub revision: Option<u64>,
    /// `None` in dry-run mode.
    pub task_arn: Option<String>,
    pub commands: Vec<String>,
}

/// Result of [`register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub revision: Option<u64>,
    pub commands: Vec<String>,
}

/// Build the task plan for `project`/`task` from config and identity.
#[instrument(skip(ctx))]
pub fn plan_task(ctx: &BuildContext, project: &str, task: &str) -> Result<TaskPlan> {
    let deploy = &ctx.config.deploy;
    let project_cfg = ctx.config.project(project)?;
    let task_cfg = project_cfg
        .task(task)
        .with_context(|| format!("project `{project}`"))?;
    let identity = ctx.identity_for(project);

    let service = task_cfg.service.clone().unwrap_or_else(|| task.to_string());
    let image = ctx.docker_image(&project_cfg.image);
    let cluster = deploy.ecs_cluster(&identity.branch)?;
    let region = deploy.aws_region();
    let execution_role_arn = deploy.execution_role_arn()?;

    let task_vars = task_environment(task_cfg, &identity, ctx.enc_key());
    let overrides = select_task_definition(&task_cfg.task_definition, &identity.branch);
    let task_definition = build_task_definition(&TaskDefinitionInputs {
        service: &service,
        cluster: &cluster,
        region,
        task_vars: &task_vars,
        overrides: &overrides,
        execution_role_arn: &execution_role_arn,
    })
    .with_context(|| format!("build task definition for {project}/{task}"))?;
    let container_definitions =
        container_definitions_json(&service, &image, &task_cfg.command, &task_definition)
            .context("serialize container definitions")?;

    debug!(family = %task_definition.family, %image, "planned task");
    let target = DeployTarget {
        subnets: deploy.subnets.clone(),
        security_groups: deploy.security_groups.clone(),
        launch_type: task_cfg.launch_type().to_string(),
        assign_public_ip: task_cfg.assign_public_ip().to_string(),
        ..DeployTarget::new(service, image, cluster, region)
    };
    let tags = task_tags(&identity);
    Ok(TaskPlan {
        identity,
        target,
        task_definition,
        container_definitions,
        tags,
    })
}

/// Register the plan's task definition and return its revision.
#[instrument(skip_all, fields(family = %plan.task_definition.family))]
pub fn register<R: CommandRunner>(
    ctx: &BuildContext,
    runner: &R,
    plan: &TaskPlan,
) -> Result<RegisterOutcome> {
    ensure_deployable(&plan.identity)?;
    let cmd = plan.register_command()?;
    let revision = match execute(ctx, runner, &cmd)? {
        Some(out) => Some(parse_task_revision(&out).context("register-task-definition output")?),
        None => None,
    };
    info!(revision = ?revision, "registered task definition");
    Ok(RegisterOutcome {
        revision,
        commands: vec![cmd.render()],
    })
}

/// Register a new revision and point the service at it.
#[instrument(skip_all, fields(service = %plan.target.service))]
pub fn deploy_service<R: CommandRunner>(
    ctx: &BuildContext,
    runner: &R,
    plan: &TaskPlan,
) -> Result<DeployOutcome> {
    let registered = register(ctx, runner, plan)?;
    let task_definition = plan.task_definition_ref(registered.revision);
    let cmd = commands::update_service(
        &plan.target.service,
        &task_definition,
        &plan.target.cluster,
    );
    execute(ctx, runner, &cmd)?;

    let mut issued = registered.commands;
    issued.push(cmd.render());
    info!(%task_definition, cluster = %plan.target.cluster, "service updated");
    Ok(DeployOutcome {
        revision: registered.revision,
        task_definition,
        commands: issued,
    })
}

/// Register a new revision and start one task from it.
#[instrument(skip_all, fields(family = %plan.task_definition.family))]
pub fn run_task<R: CommandRunner>(
    ctx: &BuildContext,
    runner: &R,
    plan: &TaskPlan,
) -> Result<RunTaskOutcome> {
    let registered = register(ctx, runner, plan)?;
    let task_definition = plan.task_definition_ref(registered.revision);
    let cmd = commands::run_task(&plan.target, &task_definition).context("render run-task")?;
    let task_arn = match execute(ctx, runner, &cmd)? {
        Some(out) => Some(parse_task_arn(&out).context("run-task output")?),
        None => None,
    };

    let mut issued = registered.commands;
    issued.push(cmd.render());
    info!(task_arn = ?task_arn, "task started");
    Ok(RunTaskOutcome {
        revision: registered.revision,
        task_arn,
        commands: issued,
    })
}

fn ensure_deployable(identity: &EnvironmentIdentity) -> Result<()> {
    if !identity.has_cluster() {
        bail!(
            "branch `{}` has no cluster configured; refusing to deploy",
            identity.branch
        );
    }
    Ok(())
}

/// Run `cmd` unless this is a dry run. Returns stdout when executed.
fn execute<R: CommandRunner>(
    ctx: &BuildContext,
    runner: &R,
    cmd: &CliCommand,
) -> Result<Option<String>> {
    if ctx.is_dry_run() {
        info!(command = %cmd, "dry run, not executing");
        return Ok(None);
    }
    runner.run_capturing(cmd).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRunner, sample_context};

    #[test]
    fn plan_merges_config_identity_and_defaults() {
        let ctx = sample_context("develop", false);
        let plan = plan_task(&ctx, "connect", "connect_web").expect("plan");

        assert_eq!(plan.target.service, "connect_web");
        assert_eq!(plan.target.cluster, "develop-buildsystem");
        assert_eq!(
            plan.target.image,
            "123456789012.dkr.ecr.us-west-1.amazonaws.com/connect:233"
        );
        assert_eq!(plan.task_definition.family, "develop_buildsystem_connect_web");
        assert_eq!(plan.task_definition.cpu, Some(512));
        assert_eq!(plan.task_definition.memory, Some(1024));
        let names: Vec<&str> = plan
            .task_definition
            .environment
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["ENABLE_WEB", "WORKER_QUEUE", "ENV", "ENC_KEY", "BUILD_NUM", "DEPLOY_ENV"]
        );
        assert_eq!(plan.tags[0], Tag::new("git_ref", "develop"));
        assert_eq!(plan.target.subnets, vec!["subnet-a"]);
    }

    #[test]
    fn plan_uses_branch_specific_override() {
        let ctx = sample_context("production", false);
        let plan = plan_task(&ctx, "connect", "connect_web").expect("plan");
        assert_eq!(plan.task_definition.cpu, Some(2048));
        assert_eq!(plan.task_definition.memory, Some(4096));
    }

    #[test]
    fn plan_unknown_task_fails() {
        let ctx = sample_context("develop", false);
        let err = plan_task(&ctx, "connect", "nope").expect_err("should fail");
        assert!(format!("{err:#}").contains("unknown docker task `nope`"));
    }

    #[test]
    fn deploy_registers_then_updates_service() {
        let ctx = sample_context("develop", false);
        let plan = plan_task(&ctx, "connect", "connect_web").expect("plan");
        let runner = ScriptedRunner::new(vec![
            ScriptedRunner::ok(r#"{"taskDefinition":{"revision":12}}"#),
            ScriptedRunner::ok("{}"),
        ]);

        let outcome = deploy_service(&ctx, &runner, &plan).expect("deploy");
        assert_eq!(outcome.revision, Some(12));
        assert_eq!(outcome.task_definition, "develop_buildsystem_connect_web:12");

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains("register-task-definition"));
        assert!(calls[1].ends_with(
            "update-service --cluster develop-buildsystem --service connect_web --task-definition develop_buildsystem_connect_web:12"
        ));
        assert_eq!(outcome.commands, calls);
    }

    #[test]
    fn dry_run_executes_nothing() {
        let ctx = sample_context("develop", true);
        let plan = plan_task(&ctx, "connect", "connect_web").expect("plan");
        let runner = ScriptedRunner::new(Vec::new());

        let outcome = deploy_service(&ctx, &runner, &plan).expect("deploy");
        assert_eq!(outcome.revision, None);
        assert_eq!(outcome.task_definition, "develop_buildsystem_connect_web");
        assert_eq!(outcome.commands.len(), 2);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn branch_without_cluster_is_refused() {
        let ctx = sample_context("feature-x", false);
        let plan = plan_task(&ctx, "connect", "connect_web").expect("plan");
        let runner = ScriptedRunner::new(Vec::new());
        let err = register(&ctx, &runner, &plan).expect_err("should refuse");
        assert!(err.to_string().contains("feature-x"));
        assert!(runner.calls().is_empty());
    }
}
