//! `build.toml` data model.
//!
//! ```toml
//! [deploy]
//! repository = "buildsystem"
//! registry = "123456789012.dkr.ecr.us-west-1.amazonaws.com"
//! ecs_task_execution_role_arn = "arn:aws:iam::123456789012:role/ecsTaskExecutionRole"
//!
//! [clusters]
//! develop = "DEVELOP"
//!
//! [projects.connect]
//! image = "connect"
//!
//! # Task definition overrides use the ECS camelCase keys.
//! [projects.connect.docker_tasks.connect_web.task_definition.default]
//! cpu = 512
//! memory = 1024
//! portMappings = [{ containerPort = 3000 }]
//! environment = [{ name = "RAILS_ENV", value = "production" }]
//!
//! [projects.connect.docker_tasks.connect_web.task_environment]
//! ENABLE_WEB = 1
//! ```

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::identity::default_clusters;
use crate::core::types::{DEFAULT_ASSIGN_PUBLIC_IP, DEFAULT_LAUNCH_TYPE, TaskDefinitionOverride};

pub const CONFIG_FILE: &str = "build.toml";
pub const DEFAULT_REGISTRY: &str = "public.ecr.aws";
pub const DEFAULT_REGION: &str = "us-west-1";

/// Root of `build.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub deploy: DeploySettings,
    /// Branch -> cluster label. Falls back to [`default_clusters`].
    pub clusters: Option<BTreeMap<String, String>>,
    pub exec: ExecConfig,
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl BuildConfig {
    pub fn validate(&self) -> Result<()> {
        self.exec.validate()?;
        for (name, project) in &self.projects {
            if project.image.trim().is_empty() {
                return Err(anyhow!("projects.{name}.image must be non-empty"));
            }
            for (task_name, task) in &project.docker_tasks {
                for (key, overrides) in &task.task_definition {
                    overrides.validate().with_context(|| {
                        format!("projects.{name}.docker_tasks.{task_name}.task_definition.{key}")
                    })?;
                }
            }
        }
        Ok(())
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig> {
        self.projects
            .get(name)
            .ok_or_else(|| anyhow!("unknown project `{name}` in {CONFIG_FILE}"))
    }

    /// Cluster map for `project`: the project's own map, else the top-level
    /// map, else the defaults.
    pub fn clusters_for(&self, project: Option<&str>) -> BTreeMap<String, String> {
        project
            .and_then(|name| self.projects.get(name))
            .and_then(|p| p.clusters.clone())
            .or_else(|| self.clusters.clone())
            .unwrap_or_else(default_clusters)
    }
}

/// `[deploy]`: registry, IAM and network settings shared by all projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub repository: Option<String>,
    pub registry: Option<String>,
    pub ecs_task_execution_role_arn: Option<String>,
    pub aws_account_id: Option<String>,
    pub aws_region: Option<String>,
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
    /// Explicit ECS cluster name; otherwise `<branch>-<repository>`.
    pub ecs_cluster: Option<String>,
}

impl DeploySettings {
    pub fn registry(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    pub fn aws_region(&self) -> &str {
        self.aws_region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn execution_role_arn(&self) -> Result<String> {
        if let Some(arn) = &self.ecs_task_execution_role_arn {
            return Ok(arn.clone());
        }
        match &self.aws_account_id {
            Some(account) => Ok(format!("arn:aws:iam::{account}:role/ecsTaskExecutionRole")),
            None => Err(anyhow!(
                "deploy.ecs_task_execution_role_arn or deploy.aws_account_id must be set"
            )),
        }
    }

    pub fn ecs_cluster(&self, branch: &str) -> Result<String> {
        if let Some(cluster) = &self.ecs_cluster {
            return Ok(cluster.clone());
        }
        match &self.repository {
            Some(repository) => Ok(format!("{branch}-{repository}")),
            None => Err(anyhow!(
                "deploy.ecs_cluster or deploy.repository must be set"
            )),
        }
    }

    /// `<registry>/<image>`
    pub fn docker_image_uri(&self, image: &str) -> String {
        format!("{}/{image}", self.registry())
    }

    /// `<registry>/<image>:<tag>`
    pub fn docker_image(&self, image: &str, tag: &str) -> String {
        format!("{}:{tag}", self.docker_image_uri(image))
    }
}

/// `[exec]`: limits for external CLI invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub timeout_secs: u64,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl ExecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("exec.timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("exec.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub image: String,
    pub clusters: Option<BTreeMap<String, String>>,
    pub docker_build_args: toml::Table,
    pub docker_tasks: BTreeMap<String, DockerTaskConfig>,
}

impl ProjectConfig {
    pub fn task(&self, name: &str) -> Result<&DockerTaskConfig> {
        self.docker_tasks
            .get(name)
            .ok_or_else(|| anyhow!("unknown docker task `{name}`"))
    }
}

/// One ECS task/service of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerTaskConfig {
    /// ECS service name; defaults to the task's key.
    pub service: Option<String>,
    pub command: Vec<String>,
    /// Overrides keyed by lowercased branch name, or `default`.
    pub task_definition: BTreeMap<String, TaskDefinitionOverride>,
    /// Extra container environment, in config order.
    pub task_environment: toml::Table,
    pub launch_type: Option<String>,
    pub assign_public_ip: Option<String>,
}

impl DockerTaskConfig {
    pub fn launch_type(&self) -> &str {
        self.launch_type.as_deref().unwrap_or(DEFAULT_LAUNCH_TYPE)
    }

    pub fn assign_public_ip(&self) -> &str {
        self.assign_public_ip
            .as_deref()
            .unwrap_or(DEFAULT_ASSIGN_PUBLIC_IP)
    }
}
