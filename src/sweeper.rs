//! Repository-level entry point.
//!
//! [`Sweeper`] binds a [`GitRunner`] to a [`SweepConfig`] and exposes the
//! operations a front end needs: enumerate, classify, fast-forward, delete.
//! Environment problems surface as [`SweepError`] before any branch work;
//! everything per-branch is reported in result records instead.

use std::path::{Path, PathBuf};

use crate::branches;
use crate::classify::{self, BranchInfo, BranchStatus, ProgressSink};
use crate::config::SweepConfig;
use crate::deletion::{self, DeleteRequest, DeleteResult};
use crate::error::{Result, SweepError};
use crate::fast_forward::{self, FastForwardResult, Skip};
use crate::git_utils::{GitRunner, SystemGit};
use crate::worktree::{self, WorktreeInfo, WorktreeMap};

pub struct Sweeper<G: GitRunner = SystemGit> {
    git: G,
    config: SweepConfig,
    location: PathBuf,
}

impl Sweeper<SystemGit> {
    /// Operate on the repository containing `path` using the `git` binary.
    pub fn open(path: impl Into<PathBuf>, config: SweepConfig) -> Self {
        let location = path.into();
        Self::new(SystemGit::new(location.clone()), config, location)
    }
}

impl<G: GitRunner> Sweeper<G> {
    pub fn new(git: G, config: SweepConfig, location: impl Into<PathBuf>) -> Self {
        Self {
            git,
            config,
            location: location.into(),
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn trunk(&self) -> &str {
        &self.config.trunk
    }

    pub fn remote(&self) -> &str {
        &self.config.remote
    }

    /// Fail fast when the pass cannot run at all.
    pub fn ensure_environment(&self) -> Result<()> {
        let inside = self.git.run(&["rev-parse", "--is-inside-work-tree"]);
        if !inside.success || inside.stdout != "true" {
            return Err(SweepError::NotARepository(self.location.clone()));
        }
        if !self.git.run(&["remote", "get-url", self.remote()]).success {
            return Err(SweepError::MissingRemote(self.remote().to_string()));
        }
        if !branches::local_branch_exists(&self.git, self.trunk()) {
            return Err(SweepError::MissingTrunk(self.trunk().to_string()));
        }
        Ok(())
    }

    /// Refresh remote-tracking refs, pruning deleted ones.
    pub fn fetch(&self) -> Result<()> {
        self.git.run_ok(&["fetch", "--prune", "--quiet", self.remote()])?;
        Ok(())
    }

    pub fn current_branch(&self) -> Option<String> {
        branches::current_branch(&self.git)
    }

    pub fn enumerate_branches(&self) -> Result<Vec<String>> {
        Ok(branches::enumerate_branches(
            &self.git,
            self.trunk(),
            &self.config.ignore,
        )?)
    }

    pub fn list_worktrees(&self) -> Result<WorktreeMap> {
        Ok(worktree::list_worktrees(&self.git, self.trunk())?)
    }

    /// Classify every enumerated branch; order follows enumeration.
    pub fn classify_all(&self, progress: &dyn ProgressSink) -> Result<Vec<BranchInfo>> {
        let names = self.enumerate_branches()?;
        Ok(classify::classify_all(
            &self.git,
            &names,
            self.trunk(),
            self.remote(),
            progress,
        ))
    }

    /// Fast-forward every eligible branch; skipped branches are omitted.
    pub fn plan_fast_forwards(&self) -> Result<Vec<FastForwardResult>> {
        let worktrees = self.list_worktrees()?;
        let current = self.current_branch();
        Ok(fast_forward::plan_fast_forwards(
            &self.git,
            self.trunk(),
            current.as_deref(),
            &worktrees,
        )?)
    }

    /// Fast-forward a single branch, reporting ineligibility as an error.
    pub fn advance_branch(&self, branch: &str) -> Result<FastForwardResult> {
        let tracking = fast_forward::tracking_branches(&self.git)?;
        let worktrees = self.list_worktrees()?;
        let current = self.current_branch();

        let refused = |reason: String| FastForwardResult {
            branch: branch.to_string(),
            updated: false,
            error: Some(reason),
        };

        let Some(info) = tracking.iter().find(|t| t.name == branch) else {
            return Ok(refused(format!("no local branch named '{branch}'")));
        };

        Ok(
            match fast_forward::eligibility(
                &self.git,
                info,
                self.trunk(),
                current.as_deref(),
                &worktrees,
            ) {
                Ok(candidate) => fast_forward::advance(&self.git, &candidate),
                Err(skip) => refused(describe_skip(&skip)),
            },
        )
    }

    pub fn delete_branch(&self, branch: &str, worktree: Option<&WorktreeInfo>) -> DeleteResult {
        deletion::delete_branch(&self.git, branch, worktree)
    }

    /// Delete in the given order; trunk and the current branch are refused.
    pub fn delete_branches(&self, requests: &[DeleteRequest]) -> Vec<DeleteResult> {
        let current = self.current_branch();
        deletion::delete_branches(&self.git, requests, self.trunk(), current.as_deref())
    }

    /// Deletion requests for every branch classified as `status`.
    pub fn deletion_requests(
        &self,
        infos: &[BranchInfo],
        worktrees: &WorktreeMap,
        status: BranchStatus,
    ) -> Vec<DeleteRequest> {
        infos
            .iter()
            .filter(|info| info.status == status)
            .map(|info| DeleteRequest {
                branch: info.name.clone(),
                worktree: worktrees.get(&info.name).cloned(),
            })
            .collect()
    }
}

fn describe_skip(skip: &Skip) -> String {
    match skip {
        Skip::Trunk => "is the trunk branch".to_string(),
        Skip::NoUpstream => "has no upstream".to_string(),
        Skip::UpstreamGone => "upstream is gone".to_string(),
        Skip::CheckedOut => "is checked out".to_string(),
        Skip::InWorktree(path) => format!("is checked out in {}", path.display()),
        Skip::Diverged { ahead, behind } => {
            format!("has {ahead} commit(s) not in upstream ({behind} behind)")
        }
    }
}
