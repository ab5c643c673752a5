//! Per-branch verdicts, computed concurrently.
//!
//! Each branch runs through merge detection and, failing that, divergence
//! classification. Branches are analysed in parallel; results come back in
//! enumeration order while progress events arrive in completion order.

use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::divergence;
use crate::git_utils::GitRunner;
use crate::merge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BranchStatus {
    Merged,
    Unpushed,
    NeedsRebase,
    Active,
}

impl BranchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BranchStatus::Merged => "merged",
            BranchStatus::Unpushed => "unpushed",
            BranchStatus::NeedsRebase => "needs-rebase",
            BranchStatus::Active => "active",
        }
    }
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub status: BranchStatus,
}

/// Emitted once per finished branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzeProgress {
    pub branch: String,
    /// 1-based completion count across all workers.
    pub current: usize,
    pub total: usize,
}

/// Receiver of progress events. Called from worker threads.
pub trait ProgressSink: Sync {
    fn on_progress(&self, event: &AnalyzeProgress);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &AnalyzeProgress) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&AnalyzeProgress) + Sync,
{
    fn on_progress(&self, event: &AnalyzeProgress) {
        self(event)
    }
}

/// Verdict for one branch: merged wins over every divergence state.
pub fn classify_branch(
    git: &dyn GitRunner,
    branch: &str,
    trunk: &str,
    remote: &str,
) -> BranchStatus {
    if merge::is_merged(git, branch, trunk) {
        BranchStatus::Merged
    } else {
        divergence::classify(git, branch, trunk, remote)
    }
}

/// Classify every branch in parallel.
///
/// The returned vector matches `branches` index for index.
pub fn classify_all(
    git: &dyn GitRunner,
    branches: &[String],
    trunk: &str,
    remote: &str,
    progress: &dyn ProgressSink,
) -> Vec<BranchInfo> {
    let total = branches.len();
    let completed = AtomicUsize::new(0);

    branches
        .par_iter()
        .map(|name| {
            let status = classify_branch(git, name, trunk, remote);
            let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.on_progress(&AnalyzeProgress {
                branch: name.clone(),
                current,
                total,
            });
            BranchInfo {
                name: name.clone(),
                status,
            }
        })
        .collect()
}
