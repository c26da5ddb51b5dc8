//! Discovery and loading of `build.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::{BuildConfig, CONFIG_FILE};
use crate::error::DeployError;

/// Walk from `start` towards the filesystem root looking for `build.toml`.
///
/// The search stops (without checking) at `stop`, normally the user's home
/// directory, or at the filesystem root.
pub fn find_config(start: &Path, stop: &Path) -> Result<PathBuf, DeployError> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop {
            break;
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            debug!(path = %candidate.display(), "found build config");
            return Ok(candidate);
        }
        current = dir.parent();
    }
    Err(DeployError::ConfigurationMissing {
        start: start.to_path_buf(),
        stop: stop.to_path_buf(),
    })
}

/// Parse and validate a config file.
pub fn load_config(path: &Path) -> Result<BuildConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BuildConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Find `build.toml` from `start` and load it. Returns the project root (the
/// directory containing the file) with the config.
pub fn discover_config(start: &Path, stop: &Path) -> Result<(PathBuf, BuildConfig)> {
    let path = find_config(start, stop)?;
    let cfg = load_config(&path)?;
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| start.to_path_buf());
    Ok((root, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[deploy]
repository = "buildsystem"
registry = "123456789012.dkr.ecr.us-west-1.amazonaws.com"
ecs_task_execution_role_arn = "arn:aws:iam::123456789012:role/ecsTaskExecutionRole"

[projects.connect]
image = "connect"

[projects.connect.docker_tasks.connect_web.task_definition.default]
cpu = 512
memory = 1024
"#;

    #[test]
    fn finds_config_in_parent_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(temp.path().join(CONFIG_FILE), SAMPLE).expect("write");

        let (root, cfg) = discover_config(&nested, Path::new("/nonexistent-stop")).expect("load");
        assert_eq!(root, temp.path());
        let task = cfg
            .project("connect")
            .and_then(|p| p.task("connect_web"))
            .expect("task");
        assert_eq!(task.task_definition["default"].cpu, Some(512));
    }

    #[test]
    fn stops_at_stop_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let nested = temp.path().join("work");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(temp.path().join(CONFIG_FILE), SAMPLE).expect("write");

        let err = find_config(&nested, temp.path()).expect_err("should stop");
        assert!(matches!(err, DeployError::ConfigurationMissing { .. }));
    }

    #[test]
    fn rejects_unknown_task_definition_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[projects.web]\nimage = \"web\"\n[projects.web.docker_tasks.web.task_definition.default]\ncpus = 1\n",
        )
        .expect("write");
        assert!(load_config(&path).is_err());
    }
}
