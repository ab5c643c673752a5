//! Branch deletion.
//!
//! A branch held by a linked worktree can only be deleted after that
//! worktree is removed, so each deletion is a two-step, strictly ordered
//! operation. A worktree with uncommitted or untracked files is never
//! removed; its branch is reported as not deleted. Batches run sequentially
//! and keep going past failures.

use serde::Serialize;

use crate::git_utils::{GitError, GitRunner};
use crate::worktree::WorktreeInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteResult {
    pub branch: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteResult {
    fn ok(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            deleted: true,
            error: None,
        }
    }

    fn failed(branch: &str, error: impl ToString) -> Self {
        Self {
            branch: branch.to_string(),
            deleted: false,
            error: Some(error.to_string()),
        }
    }
}

/// A branch queued for deletion, with the worktree that must go first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub branch: String,
    pub worktree: Option<WorktreeInfo>,
}

/// Whether the worktree at `path` holds uncommitted or untracked files.
pub fn has_local_changes(git: &dyn GitRunner, path: &str) -> Result<bool, GitError> {
    let stdout = git.run_ok(&["-C", path, "status", "--porcelain"])?;
    Ok(!stdout.is_empty())
}

fn remove_worktree(git: &dyn GitRunner, worktree: &WorktreeInfo) -> Result<(), String> {
    let path = worktree.path.to_string_lossy();
    match has_local_changes(git, &path) {
        Ok(false) => {}
        Ok(true) => return Err(format!("worktree {path} has uncommitted changes")),
        Err(e) => return Err(format!("cannot inspect worktree {path}: {e}")),
    }
    // No --force: git also refuses a worktree that changed since the check.
    git.run_ok(&["worktree", "remove", &path])
        .map_err(|e| e.to_string())?;
    log::info!("removed worktree {path}");
    Ok(())
}

/// Delete `branch`, releasing `worktree` first when given.
///
/// A dirty or unremovable worktree leaves the branch ref untouched.
pub fn delete_branch(
    git: &dyn GitRunner,
    branch: &str,
    worktree: Option<&WorktreeInfo>,
) -> DeleteResult {
    if let Some(wt) = worktree {
        if let Err(e) = remove_worktree(git, wt) {
            log::warn!("{branch}: worktree removal failed: {e}");
            return DeleteResult::failed(branch, e);
        }
    }

    match git.run_ok(&["branch", "-D", branch]) {
        Ok(_) => {
            log::info!("deleted branch {branch}");
            DeleteResult::ok(branch)
        }
        Err(e) => {
            log::warn!("{branch}: delete failed: {e}");
            DeleteResult::failed(branch, e)
        }
    }
}

/// Delete branches in order, one result per request.
///
/// `trunk` and `current` are refused rather than handed to git.
pub fn delete_branches(
    git: &dyn GitRunner,
    requests: &[DeleteRequest],
    trunk: &str,
    current: Option<&str>,
) -> Vec<DeleteResult> {
    requests
        .iter()
        .map(|req| {
            if req.branch == trunk {
                DeleteResult::failed(&req.branch, "refusing to delete the trunk branch")
            } else if current == Some(req.branch.as_str()) {
                DeleteResult::failed(&req.branch, "refusing to delete the checked-out branch")
            } else {
                delete_branch(git, &req.branch, req.worktree.as_ref())
            }
        })
        .collect()
}
