//! Value types shared by the definition builders and command templates.
//!
//! Serialized field names follow the ECS API (camelCase). Optional fields are
//! `Option` and skipped when absent, so serialized JSON never carries `null`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

/// Launch compatibilities requested for every task definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compatibility {
    #[serde(rename = "EC2")]
    Ec2,
    #[serde(rename = "FARGATE")]
    Fargate,
}

impl Compatibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ec2 => "EC2",
            Self::Fargate => "FARGATE",
        }
    }
}

impl fmt::Display for Compatibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogConfiguration {
    pub log_driver: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// A container environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ulimit {
    pub name: String,
    pub soft_limit: u64,
    pub hard_limit: u64,
}

/// Resource tag attached to registered task definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Fully merged ECS task definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    pub family: String,
    pub requires_compatibilities: Vec<Compatibility>,
    pub network_mode: String,
    pub execution_role_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    pub port_mappings: Vec<PortMapping>,
    pub log_configuration: LogConfiguration,
    pub environment: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ulimits: Option<Vec<Ulimit>>,
}

/// Caller-supplied task definition fields, as read from `build.toml`.
///
/// Keys use the ECS camelCase names (`portMappings`, `logConfiguration`),
/// like the records nested inside them. Present fields replace the defaults
/// wholesale. The non-overridable keys are accepted so configs written for
/// the old tooling still load, but the builder always replaces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct TaskDefinitionOverride {
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub port_mappings: Option<Vec<PortMapping>>,
    pub log_configuration: Option<LogConfiguration>,
    pub environment: Option<Vec<EnvVar>>,
    pub ulimits: Option<Vec<Ulimit>>,
    pub family: Option<String>,
    pub requires_compatibilities: Option<Vec<String>>,
    pub network_mode: Option<String>,
    pub execution_role_arn: Option<String>,
}

impl TaskDefinitionOverride {
    /// Reject sizes of zero and environment entries without a name.
    pub fn validate(&self) -> Result<(), DeployError> {
        for (field, size) in [("cpu", self.cpu), ("memory", self.memory)] {
            if size == Some(0) {
                return Err(DeployError::ZeroResourceSize {
                    field: field.to_string(),
                });
            }
        }
        if let Some(var) = self
            .environment
            .iter()
            .flatten()
            .find(|var| var.name.is_empty())
        {
            return Err(DeployError::MalformedTaskVariable(format!(
                "{}={}",
                var.name, var.value
            )));
        }
        Ok(())
    }

    /// Names of non-overridable keys set on this override.
    pub fn forced_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.family.is_some() {
            keys.push("family");
        }
        if self.requires_compatibilities.is_some() {
            keys.push("requiresCompatibilities");
        }
        if self.network_mode.is_some() {
            keys.push("networkMode");
        }
        if self.execution_role_arn.is_some() {
            keys.push("executionRoleArn");
        }
        keys
    }
}

pub const DEFAULT_LAUNCH_TYPE: &str = "FARGATE";
pub const DEFAULT_ASSIGN_PUBLIC_IP: &str = "ENABLED";

/// Where and how a service is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub service: String,
    pub image: String,
    pub cluster: String,
    pub region: String,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    pub launch_type: String,
    pub assign_public_ip: String,
}

impl DeployTarget {
    /// Target with the default launch type and public IP assignment.
    pub fn new(
        service: impl Into<String>,
        image: impl Into<String>,
        cluster: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            image: image.into(),
            cluster: cluster.into(),
            region: region.into(),
            subnets: Vec::new(),
            security_groups: Vec::new(),
            launch_type: DEFAULT_LAUNCH_TYPE.to_string(),
            assign_public_ip: DEFAULT_ASSIGN_PUBLIC_IP.to_string(),
        }
    }
}
