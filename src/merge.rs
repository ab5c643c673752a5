//! Merge detection.
//!
//! A branch counts as merged when its history is already represented in the
//! trunk. Three checks run cheapest-first and the first to succeed wins:
//!
//! 1. [`Strategy::Ancestry`]: the branch tip is an ancestor of trunk
//!    (fast-forward or ordinary merge).
//! 2. [`Strategy::EquivalentPatches`]: every branch-only commit has a
//!    patch-equivalent commit in trunk (rebase, cherry-pick).
//! 3. [`Strategy::ContentIdentity`]: every file the branch touched since the
//!    merge base has the same blob in trunk (squash merge).
//!
//! A failing git command makes that one check report "not merged"; it never
//! aborts the cascade.

use std::collections::HashMap;

use crate::branches::local_ref;
use crate::git_utils::{GitError, GitRunner};

/// Pathspecs per `ls-tree` call, to stay clear of argv limits.
const LS_TREE_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Ancestry,
    EquivalentPatches,
    ContentIdentity,
}

impl Strategy {
    /// Evaluation order, cheapest first.
    pub const CASCADE: [Strategy; 3] = [
        Strategy::Ancestry,
        Strategy::EquivalentPatches,
        Strategy::ContentIdentity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Ancestry => "ancestry",
            Strategy::EquivalentPatches => "equivalent-patches",
            Strategy::ContentIdentity => "content-identity",
        }
    }

    /// Run this check, surfacing git failures.
    ///
    /// `branch` and `trunk` are local branch names.
    pub fn check(self, git: &dyn GitRunner, branch: &str, trunk: &str) -> Result<bool, GitError> {
        let (branch, trunk) = (local_ref(branch), local_ref(trunk));
        match self {
            Strategy::Ancestry => is_ancestor(git, &branch, &trunk),
            Strategy::EquivalentPatches => patches_in_trunk(git, &branch, &trunk),
            Strategy::ContentIdentity => content_in_trunk(git, &branch, &trunk),
        }
    }

    /// Run this check; any failure reads as "not merged".
    pub fn holds(self, git: &dyn GitRunner, branch: &str, trunk: &str) -> bool {
        match self.check(git, branch, trunk) {
            Ok(verdict) => {
                log::debug!("{branch}: {} -> {verdict}", self.name());
                verdict
            }
            Err(e) => {
                log::warn!("{branch}: {} check inconclusive: {e}", self.name());
                false
            }
        }
    }
}

/// First strategy that finds `branch` merged into `trunk`, if any.
pub fn merged_by(git: &dyn GitRunner, branch: &str, trunk: &str) -> Option<Strategy> {
    Strategy::CASCADE
        .into_iter()
        .find(|s| s.holds(git, branch, trunk))
}

pub fn is_merged(git: &dyn GitRunner, branch: &str, trunk: &str) -> bool {
    merged_by(git, branch, trunk).is_some()
}

fn is_ancestor(git: &dyn GitRunner, branch: &str, trunk: &str) -> Result<bool, GitError> {
    // Exit 1 means "not an ancestor"; other failures are equally not-merged.
    Ok(git
        .run(&["merge-base", "--is-ancestor", branch, trunk])
        .success)
}

/// Commits on each side of `trunk...branch`, with patch equivalence marked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CherrySummary {
    pub trunk_only: usize,
    pub branch_unique: usize,
    pub equivalent: usize,
}

/// Parse `rev-list --left-right --cherry-mark trunk...branch`.
///
/// `<` marks trunk-side commits, `>` branch-side commits without an
/// equivalent, `=` commits whose patch appears on the other side.
pub fn parse_cherry_marks(output: &str) -> Result<CherrySummary, GitError> {
    let mut summary = CherrySummary::default();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.as_bytes()[0] {
            b'<' => summary.trunk_only += 1,
            b'>' => summary.branch_unique += 1,
            b'=' => summary.equivalent += 1,
            _ => return Err(GitError::Parse(format!("unexpected rev-list line {line:?}"))),
        }
    }
    Ok(summary)
}

fn patches_in_trunk(git: &dyn GitRunner, branch: &str, trunk: &str) -> Result<bool, GitError> {
    let range = format!("{trunk}...{branch}");
    let stdout = git.run_ok(&["rev-list", "--left-right", "--cherry-mark", &range])?;
    let summary = parse_cherry_marks(&stdout)?;
    Ok(summary.branch_unique == 0)
}

fn split_nul(output: &str) -> impl Iterator<Item = &str> {
    output.split('\0').filter(|s| !s.is_empty())
}

/// Object ids of `paths` at `rev`. Paths absent at `rev` are missing from the map.
fn object_ids(
    git: &dyn GitRunner,
    rev: &str,
    paths: &[&str],
) -> Result<HashMap<String, String>, GitError> {
    let mut ids = HashMap::new();
    for chunk in paths.chunks(LS_TREE_CHUNK) {
        let mut args = vec!["ls-tree", "-r", "--full-tree", "-z", rev, "--"];
        args.extend_from_slice(chunk);
        let stdout = git.run_ok(&args)?;

        // <mode> SP <type> SP <object> TAB <path>
        for record in split_nul(&stdout) {
            let (meta, path) = record
                .split_once('\t')
                .ok_or_else(|| GitError::Parse(format!("bad ls-tree record {record:?}")))?;
            let oid = meta
                .split_whitespace()
                .nth(2)
                .ok_or_else(|| GitError::Parse(format!("bad ls-tree record {record:?}")))?;
            ids.insert(path.to_string(), oid.to_string());
        }
    }
    Ok(ids)
}

fn content_in_trunk(git: &dyn GitRunner, branch: &str, trunk: &str) -> Result<bool, GitError> {
    let base = git.run_ok(&["merge-base", trunk, branch])?;
    if base.is_empty() {
        return Ok(false);
    }

    let stdout = git.run_ok(&[
        "diff",
        "--name-only",
        "--no-renames",
        "--no-ext-diff",
        "-z",
        &base,
        branch,
        "--",
    ])?;
    let touched: Vec<&str> = split_nul(&stdout).collect();
    if touched.is_empty() {
        return Ok(true);
    }

    let on_branch = object_ids(git, branch, &touched)?;
    let on_trunk = object_ids(git, trunk, &touched)?;

    // Files the branch deleted are skipped; everything else must match.
    Ok(on_branch
        .iter()
        .all(|(path, oid)| on_trunk.get(path) == Some(oid)))
}
