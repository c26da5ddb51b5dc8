//! Single-container definition derived from a task definition.

use serde::Serialize;

use crate::core::types::{EnvVar, LogConfiguration, PortMapping, TaskDefinition, Ulimit};

/// The container entry passed to `--container-definitions`.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub essential: bool,
    pub port_mappings: Vec<PortMapping>,
    pub log_configuration: LogConfiguration,
    pub environment: Vec<EnvVar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ulimits: Option<Vec<Ulimit>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl ContainerDefinition {
    pub fn from_task(
        service: &str,
        image: &str,
        command: &[String],
        task: &TaskDefinition,
    ) -> Self {
        Self {
            name: service.to_string(),
            image: image.to_string(),
            essential: true,
            port_mappings: task.port_mappings.clone(),
            log_configuration: task.log_configuration.clone(),
            environment: task.environment.clone(),
            ulimits: task.ulimits.clone(),
            command: command.to_vec(),
        }
    }
}

/// Build the single-element container list and serialize it compactly.
pub fn container_definitions_json(
    service: &str,
    image: &str,
    command: &[String],
    task: &TaskDefinition,
) -> serde_json::Result<String> {
    let containers = [ContainerDefinition::from_task(service, image, command, task)];
    serde_json::to_string(&containers)
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::core::task_definition::{TaskDefinitionInputs, build_task_definition};
    use crate::core::types::TaskDefinitionOverride;

    const IMAGE: &str = "123456789012.dkr.ecr.us-west-1.amazonaws.com/develop-buildsystem-connect:233";

    fn task(overrides: &TaskDefinitionOverride) -> TaskDefinition {
        build_task_definition(&TaskDefinitionInputs {
            service: "connect",
            cluster: "develop-buildsystem",
            region: "us-west-1",
            task_vars: &[],
            overrides,
            execution_role_arn: "arn:aws:iam::123456789012:role/ecsTaskExecutionRole",
        })
        .expect("task definition")
    }

    fn contains_null(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Array(items) => items.iter().any(contains_null),
            Value::Object(map) => map.values().any(contains_null),
            _ => false,
        }
    }

    #[test]
    fn json_is_compact_in_fixed_key_order() {
        let overrides = TaskDefinitionOverride {
            cpu: Some(2048),
            memory: Some(4096),
            ..TaskDefinitionOverride::default()
        };
        let json =
            container_definitions_json("connect", IMAGE, &[], &task(&overrides)).expect("json");
        assert_eq!(
            json,
            format!(
                concat!(
                    r#"[{{"name":"connect","image":"{}","essential":true,"#,
                    r#""portMappings":[{{"containerPort":80}}],"#,
                    r#""logConfiguration":{{"logDriver":"awslogs","options":{{"awslogs-group":"develop-buildsystem","awslogs-region":"us-west-1","awslogs-stream-prefix":"/ecs/connect"}}}},"#,
                    r#""environment":[]}}]"#
                ),
                IMAGE
            )
        );
        assert!(!json.contains(char::is_whitespace));
    }

    #[test]
    fn absent_fields_are_omitted_not_null() {
        let json = container_definitions_json("connect", IMAGE, &[], &task(&Default::default()))
            .expect("json");
        let parsed: Value = serde_json::from_str(&json).expect("valid json");
        assert!(!contains_null(&parsed));
        let container = &parsed[0];
        assert!(container.get("ulimits").is_none());
        assert!(container.get("command").is_none());
    }

    #[test]
    fn command_present_only_when_non_empty() {
        let command = vec!["bin/rails".to_string(), "db:migrate".to_string()];
        let json = container_definitions_json("connect", IMAGE, &command, &task(&Default::default()))
            .expect("json");
        let parsed: Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed[0]["command"], serde_json::json!(["bin/rails", "db:migrate"]));
        assert!(json.ends_with(r#","command":["bin/rails","db:migrate"]}]"#));
    }

    #[test]
    fn ulimits_included_when_configured() {
        let overrides = TaskDefinitionOverride {
            ulimits: Some(vec![Ulimit {
                name: "nofile".to_string(),
                soft_limit: 65536,
                hard_limit: 65536,
            }]),
            ..TaskDefinitionOverride::default()
        };
        let json =
            container_definitions_json("connect", IMAGE, &[], &task(&overrides)).expect("json");
        assert!(json.contains(r#""ulimits":[{"name":"nofile","softLimit":65536,"hardLimit":65536}]"#));
    }
}
