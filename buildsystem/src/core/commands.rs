//! AWS CLI command templates.
//!
//! Commands are kept as structured argument lists so the process runner can
//! execute them without a shell. [`CliCommand::render`] produces the
//! equivalent shell text for logs and dry runs; all quoting goes through
//! [`shell_quote`].

use std::fmt;

use serde::Serialize;

use crate::core::types::{DeployTarget, Tag, TaskDefinition};

pub const AWS_PROGRAM: &str = "aws";
/// Disables the CLI pager so output is non-interactive and parseable.
pub const AWS_PAGER_ENV: (&str, &str) = ("AWS_PAGER", "");

/// One command-line token and how it is rendered as shell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Rendered bare when it only contains shell-safe characters.
    Plain(String),
    /// Always rendered single-quoted (JSON payloads, ARNs, enum lists).
    Quoted(String),
}

impl Arg {
    pub fn value(&self) -> &str {
        match self {
            Self::Plain(value) | Self::Quoted(value) => value,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Plain(value) if is_shell_safe(value) => value.clone(),
            Self::Plain(value) | Self::Quoted(value) => shell_quote(value),
        }
    }
}

/// A program invocation: environment overrides plus argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub program: String,
    pub env: Vec<(String, String)>,
    pub args: Vec<Arg>,
}

impl CliCommand {
    /// `AWS_PAGER="" aws <args...>`
    pub fn aws<I, S>(subcommand: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: AWS_PROGRAM.to_string(),
            env: vec![(AWS_PAGER_ENV.0.to_string(), AWS_PAGER_ENV.1.to_string())],
            args: subcommand.into_iter().map(|s| Arg::Plain(s.into())).collect(),
        }
    }

    pub fn plain(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(value.into()));
        self
    }

    pub fn quoted(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg::Quoted(value.into()));
        self
    }

    /// `--flag value`, value rendered bare when safe.
    pub fn flag(self, flag: &str, value: impl Into<String>) -> Self {
        self.plain(flag).plain(value)
    }

    /// `--flag 'value'`
    pub fn flag_quoted(self, flag: &str, value: impl Into<String>) -> Self {
        self.plain(flag).quoted(value)
    }

    /// Argument values in order, as passed to the process.
    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(Arg::value).collect()
    }

    /// Literal shell text equivalent to this command.
    pub fn render(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, value)| format!("{key}={}", env_quote(value)))
            .collect();
        parts.push(self.program.clone());
        parts.extend(self.args.iter().map(Arg::render));
        parts.join(" ")
    }
}

impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Wrap `value` in single quotes, escaping embedded single quotes as `'\''`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn env_quote(value: &str) -> String {
    if value.is_empty() {
        "\"\"".to_string()
    } else if is_shell_safe(value) {
        value.to_string()
    } else {
        shell_quote(value)
    }
}

fn is_shell_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ',' | '+'))
}

/// `aws ecs register-task-definition` for `task`.
///
/// `--cpu` and `--memory` are appended, in that order, only when set.
pub fn register_task_definition(
    task: &TaskDefinition,
    container_definitions: &str,
    tags: &[Tag],
) -> serde_json::Result<CliCommand> {
    let tags_json = serde_json::to_string(tags)?;
    let mut cmd = CliCommand::aws(["ecs", "register-task-definition"])
        .flag_quoted("--container-definitions", container_definitions)
        .flag("--family", &task.family)
        .plain("--requires-compatibilities");
    for compatibility in &task.requires_compatibilities {
        cmd = cmd.quoted(compatibility.as_str());
    }
    cmd = cmd
        .flag("--network-mode", &task.network_mode)
        .flag_quoted("--execution-role-arn", &task.execution_role_arn)
        .flag_quoted("--tags", tags_json);
    if let Some(cpu) = task.cpu {
        cmd = cmd.flag("--cpu", cpu.to_string());
    }
    if let Some(memory) = task.memory {
        cmd = cmd.flag("--memory", memory.to_string());
    }
    Ok(cmd)
}

/// `aws ecs update-service` pointing `service` at `task_definition`
/// (`family` or `family:revision`).
pub fn update_service(service: &str, task_definition: &str, cluster: &str) -> CliCommand {
    CliCommand::aws(["ecs", "update-service"])
        .flag("--cluster", cluster)
        .flag("--service", service)
        .flag("--task-definition", task_definition)
}

#[derive(Debug, Serialize)]
struct NetworkConfiguration<'a> {
    #[serde(rename = "awsvpcConfiguration")]
    awsvpc_configuration: AwsVpcConfiguration<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AwsVpcConfiguration<'a> {
    subnets: &'a [String],
    security_groups: &'a [String],
    assign_public_ip: &'a str,
}

/// `aws ecs run-task` for `family` in the target's cluster and network.
pub fn run_task(target: &DeployTarget, family: &str) -> serde_json::Result<CliCommand> {
    let network = NetworkConfiguration {
        awsvpc_configuration: AwsVpcConfiguration {
            subnets: &target.subnets,
            security_groups: &target.security_groups,
            assign_public_ip: &target.assign_public_ip,
        },
    };
    Ok(CliCommand::aws(["ecs", "run-task"])
        .flag("--cluster", &target.cluster)
        .flag("--launch-type", &target.launch_type)
        .flag("--task-definition", family)
        .flag_quoted("--network-configuration", serde_json::to_string(&network)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task_definition::{TaskDefinitionInputs, build_task_definition};
    use crate::core::types::TaskDefinitionOverride;

    fn task(cpu: Option<u32>, memory: Option<u32>) -> TaskDefinition {
        let overrides = TaskDefinitionOverride {
            cpu,
            memory,
            ..TaskDefinitionOverride::default()
        };
        build_task_definition(&TaskDefinitionInputs {
            service: "connect",
            cluster: "develop-buildsystem",
            region: "us-west-1",
            task_vars: &[],
            overrides: &overrides,
            execution_role_arn: "arn:aws:iam::123456789012:role/ecsTaskExecutionRole",
        })
        .expect("task definition")
    }

    fn tags() -> Vec<Tag> {
        vec![Tag::new("git_ref", "develop"), Tag::new("build", "1234")]
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn plain_args_with_unsafe_characters_are_quoted() {
        let cmd = CliCommand::aws(["ecs"]).flag("--cluster", "a b;rm -rf /");
        assert_eq!(cmd.render(), r#"AWS_PAGER="" aws ecs --cluster 'a b;rm -rf /'"#);
        assert_eq!(cmd.arg_values(), vec!["ecs", "--cluster", "a b;rm -rf /"]);
    }

    #[test]
    fn register_renders_legacy_format_with_cpu_and_memory() {
        let cmd = register_task_definition(&task(Some(256), Some(1024)), r#"[{"name":"connect"}]"#, &tags())
            .expect("command");
        assert_eq!(
            cmd.render(),
            concat!(
                r#"AWS_PAGER="" aws ecs register-task-definition "#,
                r#"--container-definitions '[{"name":"connect"}]' "#,
                r#"--family develop_buildsystem_connect "#,
                r#"--requires-compatibilities 'EC2' 'FARGATE' "#,
                r#"--network-mode awsvpc "#,
                r#"--execution-role-arn 'arn:aws:iam::123456789012:role/ecsTaskExecutionRole' "#,
                r#"--tags '[{"key":"git_ref","value":"develop"},{"key":"build","value":"1234"}]' "#,
                r#"--cpu 256 --memory 1024"#
            )
        );
    }

    #[test]
    fn register_omits_absent_cpu_and_memory() {
        let cmd = register_task_definition(&task(None, Some(512)), "[]", &tags()).expect("command");
        let rendered = cmd.render();
        assert!(!rendered.contains("--cpu"));
        assert!(rendered.ends_with("--memory 512"));

        let cmd = register_task_definition(&task(None, None), "[]", &tags()).expect("command");
        let values = cmd.arg_values();
        assert!(!values.contains(&"--cpu"));
        assert!(!values.contains(&"--memory"));
        assert_eq!(values.last(), Some(&r#"[{"key":"git_ref","value":"develop"},{"key":"build","value":"1234"}]"#));
    }

    #[test]
    fn register_passes_compatibilities_as_separate_tokens() {
        let cmd = register_task_definition(&task(None, None), "[]", &tags()).expect("command");
        let values = cmd.arg_values();
        let pos = values
            .iter()
            .position(|v| *v == "--requires-compatibilities")
            .expect("flag");
        assert_eq!(&values[pos + 1..pos + 3], &["EC2", "FARGATE"]);
    }

    #[test]
    fn register_quotes_json_containing_single_quotes() {
        let cmd = register_task_definition(&task(None, None), r#"[{"command":["echo 'hi'"]}]"#, &[])
            .expect("command");
        assert!(
            cmd.render()
                .contains(r#"--container-definitions '[{"command":["echo '\''hi'\''"]}]'"#)
        );
    }

    #[test]
    fn update_service_renders_fixed_flags() {
        let cmd = update_service("connect", "develop_buildsystem_connect:7", "develop-buildsystem");
        assert_eq!(
            cmd.render(),
            r#"AWS_PAGER="" aws ecs update-service --cluster develop-buildsystem --service connect --task-definition develop_buildsystem_connect:7"#
        );
    }

    #[test]
    fn run_task_embeds_network_configuration() {
        let mut target = DeployTarget::new("connect", "img", "develop-buildsystem", "us-west-1");
        target.subnets = vec!["subnet-1".to_string(), "subnet-2".to_string()];
        target.security_groups = vec!["sg-1".to_string()];
        let cmd = run_task(&target, "develop_buildsystem_migrate").expect("command");
        assert_eq!(
            cmd.render(),
            concat!(
                r#"AWS_PAGER="" aws ecs run-task --cluster develop-buildsystem --launch-type FARGATE "#,
                r#"--task-definition develop_buildsystem_migrate "#,
                r#"--network-configuration '{"awsvpcConfiguration":{"subnets":["subnet-1","subnet-2"],"securityGroups":["sg-1"],"assignPublicIp":"ENABLED"}}'"#
            )
        );
    }

    #[test]
    fn run_task_honors_launch_type_and_public_ip() {
        let mut target = DeployTarget::new("connect", "img", "prod", "us-west-1");
        target.launch_type = "EC2".to_string();
        target.assign_public_ip = "DISABLED".to_string();
        let cmd = run_task(&target, "prod_connect").expect("command");
        let values = cmd.arg_values();
        assert!(values.contains(&"EC2"));
        assert!(values.last().is_some_and(|v| v.contains(r#""assignPublicIp":"DISABLED""#)));
    }
}
