//! Merge defaults, overrides and computed fields into a [`TaskDefinition`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::types::{
    Compatibility, EnvVar, LogConfiguration, PortMapping, TaskDefinition, TaskDefinitionOverride,
};
use crate::error::DeployError;

pub const DEFAULT_CONTAINER_PORT: u16 = 80;
pub const NETWORK_MODE: &str = "awsvpc";
pub const LOG_DRIVER: &str = "awslogs";

/// Inputs for [`build_task_definition`].
#[derive(Debug, Clone, Copy)]
pub struct TaskDefinitionInputs<'a> {
    pub service: &'a str,
    pub cluster: &'a str,
    pub region: &'a str,
    /// `NAME=VALUE` entries appended to the environment in order.
    pub task_vars: &'a [String],
    pub overrides: &'a TaskDefinitionOverride,
    pub execution_role_arn: &'a str,
}

/// Build the complete task definition.
///
/// Override fields replace defaults wholesale. `requiresCompatibilities`,
/// `networkMode`, `executionRoleArn` and `family` are always computed.
/// Overrides with zero sizes or unnamed environment entries are rejected.
pub fn build_task_definition(
    inputs: &TaskDefinitionInputs<'_>,
) -> Result<TaskDefinition, DeployError> {
    let overrides = inputs.overrides;
    overrides.validate()?;
    let forced = overrides.forced_keys();
    if !forced.is_empty() {
        debug!(keys = ?forced, "ignoring non-overridable task definition keys");
    }

    let mut environment = overrides.environment.clone().unwrap_or_default();
    for var in inputs.task_vars {
        environment.push(parse_task_variable(var)?);
    }

    Ok(TaskDefinition {
        family: family_name(inputs.cluster, inputs.service),
        requires_compatibilities: vec![Compatibility::Ec2, Compatibility::Fargate],
        network_mode: NETWORK_MODE.to_string(),
        execution_role_arn: inputs.execution_role_arn.to_string(),
        cpu: overrides.cpu,
        memory: overrides.memory,
        port_mappings: overrides.port_mappings.clone().unwrap_or_else(|| {
            vec![PortMapping {
                container_port: DEFAULT_CONTAINER_PORT,
            }]
        }),
        log_configuration: overrides.log_configuration.clone().unwrap_or_else(|| {
            default_log_configuration(inputs.service, inputs.cluster, inputs.region)
        }),
        environment,
        ulimits: overrides.ulimits.clone(),
    })
}

/// `awslogs` configuration grouping by cluster, prefixed by service.
pub fn default_log_configuration(service: &str, cluster: &str, region: &str) -> LogConfiguration {
    let options = BTreeMap::from([
        ("awslogs-group".to_string(), cluster.to_string()),
        ("awslogs-region".to_string(), region.to_string()),
        ("awslogs-stream-prefix".to_string(), format!("/ecs/{service}")),
    ]);
    LogConfiguration {
        log_driver: LOG_DRIVER.to_string(),
        options,
    }
}

/// Task family: `cluster-service`, lowercased, with `-` replaced by `_`.
pub fn family_name(cluster: &str, service: &str) -> String {
    format!("{cluster}-{service}").to_lowercase().replace('-', "_")
}

/// Split `NAME=VALUE` on the first `=`.
///
/// A missing `=` or an empty name is rejected rather than producing a
/// variable without a value.
pub fn parse_task_variable(var: &str) -> Result<EnvVar, DeployError> {
    match var.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok(EnvVar {
            name: name.to_string(),
            value: value.to_string(),
        }),
        _ => Err(DeployError::MalformedTaskVariable(var.to_string())),
    }
}
