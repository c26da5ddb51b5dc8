//! Git lookups: the checked-out branch (used when CI does not name one) and
//! the short commit hash.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

use crate::core::identity::BranchSource;

/// Hash length printed by `buildsystem identity`.
pub const SHORT_HASH_LEN: usize = 10;

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Abbreviated name of the checked-out branch (`HEAD` when detached).
    #[instrument(skip_all)]
    pub fn abbrev_ref(&self) -> Result<String> {
        let out = self.run_capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.trim().to_string();
        debug!(branch = %name, "current branch");
        Ok(name)
    }

    /// Abbreviated hash of `HEAD`, `len` hex digits long.
    #[instrument(skip_all, fields(len))]
    pub fn short_hash(&self, len: usize) -> Result<String> {
        let arg = format!("--short={len}");
        let out = self.run_capture(&["rev-parse", &arg, "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output: Output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))?;
        if !output.status.success() {
            bail!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.workdir.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl BranchSource for Git {
    fn current_branch(&self) -> Result<String> {
        self.abbrev_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_outside_a_repository() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path());
        assert_eq!(git.workdir(), temp.path());
        let err = git.abbrev_ref().expect_err("not a repo");
        assert!(err.to_string().contains("rev-parse"));
        assert!(git.short_hash(SHORT_HASH_LEN).is_err());
    }

    fn git_in(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(["-c", "user.name=buildsystem", "-c", "user.email=ci@example.com"])
            .args(args)
            .current_dir(dir)
            .output()
            .expect("spawn git")
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    #[test]
    fn short_hash_has_requested_length() {
        let temp = tempfile::tempdir().expect("tempdir");
        git_in(temp.path(), &["init", "--quiet"]);
        git_in(temp.path(), &["commit", "--quiet", "--allow-empty", "-m", "init"]);

        let git = Git::new(temp.path());
        let hash = git.short_hash(SHORT_HASH_LEN).expect("short hash");
        assert_eq!(hash.len(), SHORT_HASH_LEN);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(git.short_hash(7).expect("short hash").len(), 7);
    }
}
