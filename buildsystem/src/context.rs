//! Per-process build context.
//!
//! Config, resolved identity and environment switches are gathered once at
//! startup into an immutable [`BuildContext`] that is passed to every
//! operation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::core::identity::{BranchSource, EnvSnapshot, EnvironmentIdentity};
use crate::io::config::discover_config;
use crate::io::git::Git;

#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Directory containing `build.toml`.
    pub root: PathBuf,
    pub config: BuildConfig,
    pub env: EnvSnapshot,
    pub identity: EnvironmentIdentity,
}

impl BuildContext {
    /// Assemble a context from already-loaded parts.
    ///
    /// The cluster label is resolved against the top-level cluster map; use
    /// [`BuildContext::identity_for`] for project-specific maps.
    pub fn new(
        root: impl Into<PathBuf>,
        config: BuildConfig,
        env: EnvSnapshot,
        git: &impl BranchSource,
    ) -> Result<Self> {
        let identity = EnvironmentIdentity::resolve(&env, git, &config.clusters_for(None))
            .context("resolve build identity")?;
        debug!(
            branch = %identity.branch,
            build = %identity.build_number,
            cluster = ?identity.cluster,
            "resolved identity"
        );
        Ok(Self {
            root: root.into(),
            config,
            env,
            identity,
        })
    }

    /// Discover `build.toml` upwards from `cwd` (stopping at `home`) and
    /// resolve identity from `env`, asking git in the project root when CI
    /// does not name the branch.
    pub fn discover(cwd: &Path, home: &Path, env: EnvSnapshot) -> Result<Self> {
        let (root, config) = discover_config(cwd, home)?;
        info!(root = %root.display(), "loaded build config");
        let git = Git::new(&root);
        Self::new(root, config, env, &git)
    }

    pub fn is_dry_run(&self) -> bool {
        self.env.dry_run
    }

    pub fn enc_key(&self) -> Option<&str> {
        self.env.enc_key.as_deref()
    }

    /// Identity with the cluster label looked up in `project`'s cluster map.
    pub fn identity_for(&self, project: &str) -> EnvironmentIdentity {
        let clusters = self.config.clusters_for(Some(project));
        EnvironmentIdentity {
            cluster: clusters.get(&self.identity.branch).cloned(),
            ..self.identity.clone()
        }
    }

    pub fn docker_tag(&self) -> &str {
        self.identity.docker_tag()
    }

    /// Fully qualified image reference for a project image at the current tag.
    pub fn docker_image(&self, image: &str) -> String {
        self.config.deploy.docker_image(image, self.docker_tag())
    }
}
