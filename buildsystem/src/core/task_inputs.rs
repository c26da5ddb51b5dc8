//! Per-task inputs derived from config and identity: which task definition
//! override applies, the container environment and the resource tags.

use std::collections::BTreeMap;

use crate::config::DockerTaskConfig;
use crate::core::identity::EnvironmentIdentity;
use crate::core::types::{Tag, TaskDefinitionOverride};

pub const DEFAULT_OVERRIDE_KEY: &str = "default";
pub const FALLBACK_CPU: u32 = 256;
pub const FALLBACK_MEMORY: u32 = 1024;

/// Override for `branch` (lowercased), else `default`, else 256 CPU / 1024 MiB.
pub fn select_task_definition(
    overrides: &BTreeMap<String, TaskDefinitionOverride>,
    branch: &str,
) -> TaskDefinitionOverride {
    overrides
        .get(&branch.to_lowercase())
        .or_else(|| overrides.get(DEFAULT_OVERRIDE_KEY))
        .cloned()
        .unwrap_or_else(|| TaskDefinitionOverride {
            cpu: Some(FALLBACK_CPU),
            memory: Some(FALLBACK_MEMORY),
            ..TaskDefinitionOverride::default()
        })
}

/// Variables every task receives. Absent values render empty.
pub fn default_task_environment(
    identity: &EnvironmentIdentity,
    enc_key: Option<&str>,
) -> Vec<String> {
    let cluster = identity.cluster.as_deref().unwrap_or_default();
    vec![
        format!("ENV={cluster}"),
        format!("ENC_KEY={}", enc_key.unwrap_or_default()),
        format!("BUILD_NUM={}", identity.build_number),
        format!("DEPLOY_ENV={cluster}"),
    ]
}

/// Configured `task_environment` entries (config order), then the defaults.
pub fn task_environment(
    task: &DockerTaskConfig,
    identity: &EnvironmentIdentity,
    enc_key: Option<&str>,
) -> Vec<String> {
    let mut vars = object_to_args(&task.task_environment);
    vars.extend(default_task_environment(identity, enc_key));
    vars
}

/// `git_ref` and `build` tags, in that order.
pub fn task_tags(identity: &EnvironmentIdentity) -> Vec<Tag> {
    vec![
        Tag::new("git_ref", identity.git_ref()),
        Tag::new("build", identity.build_number.as_str()),
    ]
}

/// `{foo = "bar"}` -> `["foo=bar"]`. Non-string scalars use their TOML form.
pub fn object_to_args(table: &toml::Table) -> Vec<String> {
    table
        .iter()
        .map(|(key, value)| format!("{key}={}", scalar_text(value)))
        .collect()
}

/// `{foo = "bar", baz = "qux"}` -> `--flag foo=bar --flag baz=qux`; empty
/// for an empty table.
///
/// Used for `docker build --build-arg` and `docker run --env`.
pub fn object_to_flag_args(flag: &str, table: &toml::Table) -> String {
    object_to_args(table)
        .iter()
        .map(|arg| format!("{flag} {arg}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn scalar_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
