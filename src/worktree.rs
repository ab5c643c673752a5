//! Linked worktree discovery.
//!
//! Parses `git worktree list --porcelain` and maps each branch checked out
//! in a linked worktree to that worktree. The worktree the process runs in
//! is never part of the map, nor are detached or bare entries.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::git_utils::{GitError, GitRunner};

/// A linked worktree and the branch it has checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// One record from the porcelain listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
}

/// Branch name to the linked worktree holding it.
pub type WorktreeMap = BTreeMap<String, WorktreeInfo>;

/// Parse `git worktree list --porcelain` output into entries.
///
/// Records are separated by blank lines; each begins with `worktree <path>`.
pub fn parse_worktree_list(output: &str) -> Result<Vec<WorktreeEntry>, GitError> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        match key {
            "worktree" => {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                let path = value
                    .ok_or_else(|| GitError::Parse("worktree line missing path".to_string()))?;
                current = Some(WorktreeEntry {
                    path: PathBuf::from(path),
                    branch: None,
                    bare: false,
                    detached: false,
                });
            }
            "branch" => {
                let entry = current
                    .as_mut()
                    .ok_or_else(|| GitError::Parse("branch line before worktree".to_string()))?;
                let branch_ref =
                    value.ok_or_else(|| GitError::Parse("branch line missing ref".to_string()))?;
                entry.branch = Some(
                    branch_ref
                        .strip_prefix("refs/heads/")
                        .unwrap_or(branch_ref)
                        .to_string(),
                );
            }
            "detached" => {
                if let Some(entry) = current.as_mut() {
                    entry.detached = true;
                }
            }
            "bare" => {
                if let Some(entry) = current.as_mut() {
                    entry.bare = true;
                }
            }
            // HEAD, locked, prunable: not needed here
            _ => {}
        }
    }

    if let Some(entry) = current.take() {
        entries.push(entry);
    }

    Ok(entries)
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Build the branch -> worktree map from parsed entries.
///
/// `primary` is the worktree the process runs in; when unknown the first
/// entry (git's main worktree) is treated as primary.
pub fn linked_worktrees(
    entries: Vec<WorktreeEntry>,
    primary: Option<&Path>,
    trunk: &str,
) -> WorktreeMap {
    let mut map = WorktreeMap::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let is_primary = match primary {
            Some(p) => same_path(&entry.path, p),
            None => index == 0,
        };
        if is_primary || entry.bare || entry.detached {
            continue;
        }
        let Some(branch) = entry.branch else {
            continue;
        };
        if branch == trunk {
            continue;
        }
        map.entry(branch.clone()).or_insert(WorktreeInfo {
            path: entry.path,
            branch: Some(branch),
        });
    }

    map
}

/// List linked worktrees keyed by branch.
pub fn list_worktrees(git: &dyn GitRunner, trunk: &str) -> Result<WorktreeMap, GitError> {
    let stdout = git.run_ok(&["worktree", "list", "--porcelain"])?;
    let entries = parse_worktree_list(&stdout)?;

    let toplevel = git.run(&["rev-parse", "--show-toplevel"]);
    let primary = toplevel
        .success
        .then(|| PathBuf::from(&toplevel.stdout))
        .filter(|p| !p.as_os_str().is_empty());

    Ok(linked_worktrees(entries, primary.as_deref(), trunk))
}
