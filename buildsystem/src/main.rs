//! ECS deploy automation CLI.
//!
//! Looks up `build.toml` from the working directory upwards, resolves the
//! branch/build identity once, and registers or deploys ECS task definitions
//! through the `aws` CLI. Set `DRY_RUN` to print commands without running them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use buildsystem::context::BuildContext;
use buildsystem::core::identity::EnvSnapshot;
use buildsystem::core::task_inputs::{object_to_flag_args, task_environment};
use buildsystem::deploy::{deploy_service, plan_task, register, run_task};
use buildsystem::error::DeployError;
use buildsystem::exit_codes;
use buildsystem::io::env::read_env;
use buildsystem::io::exec::ProcessRunner;
use buildsystem::io::git::{Git, SHORT_HASH_LEN};
use buildsystem::logging;
use clap::{Args, Parser, Subcommand};
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "buildsystem",
    version,
    about = "ECS task definitions and deploys from build.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct TaskArgs {
    /// Project name under `[projects]`.
    project: String,
    /// Docker task name under `[projects.<project>.docker_tasks]`.
    task: String,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print branch, build number, cluster, docker tag and commit.
    Identity {
        /// Resolve the cluster with this project's cluster map.
        #[arg(long)]
        project: Option<String>,
    },
    /// Print the merged task definition as JSON.
    TaskDefinition(TaskArgs),
    /// Print the compact container definitions JSON.
    ContainerDefinition(TaskArgs),
    /// Print the fully qualified docker image for a project.
    DockerImage { project: String },
    /// Print `--env K=V` arguments for `docker run`.
    DockerEnv(TaskArgs),
    /// Print `--build-arg K=V` arguments for `docker build`.
    DockerBuildArgs { project: String },
    /// Register a new task definition revision and print it.
    Register(TaskArgs),
    /// Register a new revision and point the ECS service at it.
    Deploy(TaskArgs),
    /// Register a new revision, run one task from it and print its ARN.
    RunTask(TaskArgs),
}

fn main() {
    let cli = Cli::parse();
    let env = read_env();
    logging::init(env.ci);
    let code = match run(cli, env) {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err:#}");
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, env: EnvSnapshot) -> Result<()> {
    let cwd = std::env::current_dir().context("read current directory")?;
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    let ctx = BuildContext::discover(&cwd, &home, env)?;
    let runner = ProcessRunner::new(&ctx.config.exec);
    let result = dispatch(&ctx, &runner, cli.command);
    runner.log().flush();
    result
}

fn dispatch(ctx: &BuildContext, runner: &ProcessRunner, command: Command) -> Result<()> {
    match command {
        Command::Identity { project } => cmd_identity(ctx, project.as_deref()),
        Command::TaskDefinition(args) => {
            let plan = plan_task(ctx, &args.project, &args.task)?;
            let json = serde_json::to_string_pretty(&plan.task_definition)
                .context("serialize task definition")?;
            println!("{json}");
            Ok(())
        }
        Command::ContainerDefinition(args) => {
            let plan = plan_task(ctx, &args.project, &args.task)?;
            println!("{}", plan.container_definitions);
            Ok(())
        }
        Command::DockerImage { project } => {
            let image = &ctx.config.project(&project)?.image;
            println!("{}", ctx.docker_image(image));
            Ok(())
        }
        Command::DockerEnv(args) => {
            let task = ctx.config.project(&args.project)?.task(&args.task)?;
            let vars = task_environment(task, &ctx.identity_for(&args.project), ctx.enc_key());
            let env: Vec<String> = vars.iter().map(|var| format!("--env {var}")).collect();
            println!("{}", env.join(" "));
            Ok(())
        }
        Command::DockerBuildArgs { project } => {
            let build_args = &ctx.config.project(&project)?.docker_build_args;
            println!("{}", object_to_flag_args("--build-arg", build_args));
            Ok(())
        }
        Command::Register(args) => {
            let plan = plan_task(ctx, &args.project, &args.task)?;
            let outcome = register(ctx, runner, &plan)?;
            print_planned(ctx, &outcome.commands);
            if let Some(revision) = outcome.revision {
                println!("{revision}");
            }
            Ok(())
        }
        Command::Deploy(args) => {
            let plan = plan_task(ctx, &args.project, &args.task)?;
            let outcome = deploy_service(ctx, runner, &plan)?;
            print_planned(ctx, &outcome.commands);
            println!("{}", outcome.task_definition);
            Ok(())
        }
        Command::RunTask(args) => {
            let plan = plan_task(ctx, &args.project, &args.task)?;
            let outcome = run_task(ctx, runner, &plan)?;
            print_planned(ctx, &outcome.commands);
            if let Some(arn) = outcome.task_arn {
                println!("{arn}");
            }
            Ok(())
        }
    }
}

fn cmd_identity(ctx: &BuildContext, project: Option<&str>) -> Result<()> {
    let identity = match project {
        Some(name) => {
            ctx.config.project(name)?;
            ctx.identity_for(name)
        }
        None => ctx.identity.clone(),
    };
    println!("branch={}", identity.branch);
    println!("build={}", identity.build_number);
    println!("cluster={}", identity.cluster.as_deref().unwrap_or_default());
    println!("docker_tag={}", identity.docker_tag());
    match Git::new(&ctx.root).short_hash(SHORT_HASH_LEN) {
        Ok(hash) => println!("commit={hash}"),
        Err(err) => debug!(error = %format!("{err:#}"), "no commit hash"),
    }
    Ok(())
}

/// In dry-run mode, print the commands that would have run.
fn print_planned(ctx: &BuildContext, commands: &[String]) {
    if ctx.is_dry_run() {
        for command in commands {
            println!("{command}");
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|cause| cause.downcast_ref::<DeployError>()) {
        Some(DeployError::ConfigurationMissing { .. }) => exit_codes::CONFIG_MISSING,
        Some(DeployError::CommandFailure { .. }) => exit_codes::COMMAND_FAILED,
        _ => exit_codes::FAILED,
    }
}
