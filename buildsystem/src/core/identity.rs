//! Branch, build number and cluster identity for the current invocation.
//!
//! Everything here operates on an [`EnvSnapshot`] captured once at startup, so
//! identity is resolved exactly once per process and never re-read.

use std::collections::BTreeMap;

use anyhow::Result;

pub const CI_VAR: &str = "CI";
pub const DRY_RUN_VAR: &str = "DRY_RUN";
pub const ENC_KEY_VAR: &str = "ENC_KEY";
pub const REF_NAME_VAR: &str = "GITHUB_REF_NAME";
pub const RUN_ID_VAR: &str = "GITHUB_RUN_ID";

pub const DEFAULT_BUILD_NUMBER: &str = "1";
pub const LATEST_TAG: &str = "latest";

/// Values of the environment variables the build system consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    /// `CI` is set (value irrelevant).
    pub ci: bool,
    /// `DRY_RUN` is set (value irrelevant).
    pub dry_run: bool,
    pub enc_key: Option<String>,
    pub ref_name: Option<String>,
    pub run_id: Option<String>,
}

impl EnvSnapshot {
    /// Build a snapshot from a variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            ci: lookup(CI_VAR).is_some(),
            dry_run: lookup(DRY_RUN_VAR).is_some(),
            enc_key: lookup(ENC_KEY_VAR),
            ref_name: lookup(REF_NAME_VAR),
            run_id: lookup(RUN_ID_VAR),
        }
    }
}

/// Source of the current VCS branch when CI does not provide one.
pub trait BranchSource {
    fn current_branch(&self) -> Result<String>;
}

/// Resolved identity of this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentIdentity {
    pub branch: String,
    pub build_number: String,
    /// Cluster label for `branch`, if the branch deploys anywhere.
    pub cluster: Option<String>,
}

impl EnvironmentIdentity {
    /// Resolve branch and build number, then look the branch up in `clusters`.
    pub fn resolve(
        env: &EnvSnapshot,
        git: &impl BranchSource,
        clusters: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let branch = resolve_branch(env, git)?;
        let build_number = resolve_build_number(env);
        let cluster = resolve_cluster(clusters, &branch);
        Ok(Self {
            branch,
            build_number,
            cluster,
        })
    }

    pub fn has_cluster(&self) -> bool {
        self.cluster.is_some()
    }

    /// Git ref recorded on task tags.
    pub fn git_ref(&self) -> &str {
        &self.branch
    }

    pub fn docker_tag(&self) -> &str {
        docker_tag(&self.build_number)
    }
}

/// Branch from the CI ref name (text before the first `/`), else from git.
pub fn resolve_branch(env: &EnvSnapshot, git: &impl BranchSource) -> Result<String> {
    if let Some(ref_name) = &env.ref_name {
        return Ok(branch_from_ref(ref_name).to_string());
    }
    Ok(git.current_branch()?.trim().to_string())
}

pub fn branch_from_ref(ref_name: &str) -> &str {
    ref_name.split('/').next().unwrap_or(ref_name)
}

pub fn resolve_build_number(env: &EnvSnapshot) -> String {
    env.run_id
        .clone()
        .unwrap_or_else(|| DEFAULT_BUILD_NUMBER.to_string())
}

/// Case-sensitive lookup of `branch` in a branch -> cluster label map.
pub fn resolve_cluster(clusters: &BTreeMap<String, String>, branch: &str) -> Option<String> {
    clusters.get(branch).cloned()
}

/// Cluster map used when neither the project nor the config defines one.
pub fn default_clusters() -> BTreeMap<String, String> {
    [
        ("develop", "DEVELOP"),
        ("staging", "STAGING"),
        ("production", "PRODUCTION"),
    ]
    .into_iter()
    .map(|(branch, cluster)| (branch.to_string(), cluster.to_string()))
    .collect()
}

pub fn docker_tag(build_number: &str) -> &str {
    if build_number.is_empty() {
        LATEST_TAG
    } else {
        build_number
    }
}
