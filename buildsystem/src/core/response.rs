//! Extract values from `aws ecs` JSON output.

use serde_json::Value;

use crate::error::DeployError;

/// Revision number from `register-task-definition` output.
pub fn parse_task_revision(json: &str) -> Result<u64, DeployError> {
    let value = parse(json, "task revision")?;
    let task_definition = value
        .get("taskDefinition")
        .ok_or_else(|| missing("taskDefinition"))?;
    task_definition
        .get("revision")
        .and_then(Value::as_u64)
        .ok_or_else(|| missing("taskDefinition.revision"))
}

/// ARN of the first task in `run-task` output.
pub fn parse_task_arn(json: &str) -> Result<String, DeployError> {
    let value = parse(json, "task ARN")?;
    let tasks = value.get("tasks").ok_or_else(|| missing("tasks"))?;
    let first = tasks
        .as_array()
        .ok_or_else(|| missing("tasks"))?
        .first()
        .ok_or(DeployError::EmptyTaskList)?;
    first
        .get("taskArn")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing("tasks[0].taskArn"))
}

fn parse(json: &str, what: &str) -> Result<Value, DeployError> {
    serde_json::from_str(json).map_err(|err| DeployError::MalformedResponse {
        context: format!("failed to parse {what}"),
        message: err.to_string(),
    })
}

fn missing(field: &str) -> DeployError {
    DeployError::MissingField {
        field: field.to_string(),
    }
}
