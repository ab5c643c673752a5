//! Fast-forwarding branches to their upstream without a checkout.
//!
//! Only branches that track a live upstream, hold no commits the upstream
//! lacks, and are not checked out anywhere are touched. The update is a
//! plain `git fetch <remote> <ref>:refs/heads/<branch>`, which git refuses
//! unless it is a fast-forward.

use serde::Serialize;
use std::path::PathBuf;

use crate::branches::local_ref;
use crate::git_utils::{parse_left_right, GitError, GitRunner};
use crate::worktree::WorktreeMap;

pub(crate) const TRACKING_FORMAT: &str = "--format=%(refname:lstrip=2)%00%(upstream)%00%(upstream:remotename)%00%(upstream:remoteref)%00%(upstream:track,nobracket)";

/// Outcome for a branch that was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastForwardResult {
    pub branch: String,
    pub updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A local branch and its upstream configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingBranch {
    pub name: String,
    /// Full upstream ref, e.g. `refs/remotes/origin/feature`. Empty when untracked.
    pub upstream: String,
    pub remote: String,
    /// Upstream ref on the remote, e.g. `refs/heads/feature`.
    pub remote_ref: String,
    pub gone: bool,
}

impl TrackingBranch {
    pub fn has_upstream(&self) -> bool {
        !self.upstream.is_empty() && !self.remote.is_empty() && !self.remote_ref.is_empty()
    }
}

/// Why a branch is not fast-forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skip {
    Trunk,
    NoUpstream,
    UpstreamGone,
    CheckedOut,
    InWorktree(PathBuf),
    Diverged { ahead: usize, behind: usize },
}

/// A branch cleared for fast-forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub branch: TrackingBranch,
    pub behind: usize,
}

/// Parse the NUL-separated fields produced by [`TRACKING_FORMAT`].
pub fn parse_tracking(output: &str) -> Result<Vec<TrackingBranch>, GitError> {
    output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let fields: Vec<&str> = line.split('\0').collect();
            if fields.len() != 5 {
                return Err(GitError::Parse(format!("bad for-each-ref line {line:?}")));
            }
            Ok(TrackingBranch {
                name: fields[0].to_string(),
                upstream: fields[1].to_string(),
                remote: fields[2].to_string(),
                remote_ref: fields[3].to_string(),
                gone: fields[4].trim() == "gone",
            })
        })
        .collect()
}

pub fn tracking_branches(git: &dyn GitRunner) -> Result<Vec<TrackingBranch>, GitError> {
    let stdout = git.run_ok(&["for-each-ref", TRACKING_FORMAT, "refs/heads/"])?;
    parse_tracking(&stdout)
}

/// Commits (ahead, behind) of `branch` relative to `upstream`.
pub fn ahead_behind(
    git: &dyn GitRunner,
    branch: &str,
    upstream: &str,
) -> Result<(usize, usize), GitError> {
    let range = format!("{}...{upstream}", local_ref(branch));
    parse_left_right(&git.run_ok(&["rev-list", "--left-right", "--count", &range])?)
}

/// Decide whether `branch` may be fast-forwarded.
pub fn eligibility(
    git: &dyn GitRunner,
    branch: &TrackingBranch,
    trunk: &str,
    current: Option<&str>,
    worktrees: &WorktreeMap,
) -> Result<Candidate, Skip> {
    if branch.name == trunk {
        return Err(Skip::Trunk);
    }
    if !branch.has_upstream() {
        return Err(Skip::NoUpstream);
    }
    if branch.gone {
        return Err(Skip::UpstreamGone);
    }
    if current == Some(branch.name.as_str()) {
        return Err(Skip::CheckedOut);
    }
    if let Some(wt) = worktrees.get(&branch.name) {
        return Err(Skip::InWorktree(wt.path.clone()));
    }

    let (ahead, behind) = match ahead_behind(git, &branch.name, &branch.upstream) {
        Ok(counts) => counts,
        // Upstream ref vanished between listing and counting.
        Err(e) => {
            log::warn!("{}: cannot compare with {}: {e}", branch.name, branch.upstream);
            return Err(Skip::UpstreamGone);
        }
    };
    if ahead > 0 {
        return Err(Skip::Diverged { ahead, behind });
    }

    Ok(Candidate {
        branch: branch.clone(),
        behind,
    })
}

/// Move `candidate` to its upstream tip. Never checks anything out.
pub fn advance(git: &dyn GitRunner, candidate: &Candidate) -> FastForwardResult {
    let branch = &candidate.branch;
    if candidate.behind == 0 {
        return FastForwardResult {
            branch: branch.name.clone(),
            updated: false,
            error: None,
        };
    }

    let refspec = format!("{}:{}", branch.remote_ref, local_ref(&branch.name));
    match git.run_ok(&["fetch", "--quiet", &branch.remote, &refspec]) {
        Ok(_) => {
            log::info!("fast-forwarded {} by {} commit(s)", branch.name, candidate.behind);
            FastForwardResult {
                branch: branch.name.clone(),
                updated: true,
                error: None,
            }
        }
        Err(e) => {
            log::warn!("fast-forward of {} failed: {e}", branch.name);
            FastForwardResult {
                branch: branch.name.clone(),
                updated: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Fast-forward every eligible branch, one at a time.
///
/// Skipped branches produce no result.
pub fn plan_fast_forwards(
    git: &dyn GitRunner,
    trunk: &str,
    current: Option<&str>,
    worktrees: &WorktreeMap,
) -> Result<Vec<FastForwardResult>, GitError> {
    let mut results = Vec::new();
    for branch in tracking_branches(git)? {
        match eligibility(git, &branch, trunk, current, worktrees) {
            Ok(candidate) => results.push(advance(git, &candidate)),
            Err(skip) => log::debug!("{}: not fast-forwarded ({skip:?})", branch.name),
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_utils::testing::FakeGit;
    use crate::worktree::WorktreeInfo;

    fn list_cmd() -> String {
        format!("for-each-ref {TRACKING_FORMAT} refs/heads/")
    }

    fn line(name: &str, track: &str) -> String {
        format!("{name}\0refs/remotes/origin/{name}\0origin\0refs/heads/{name}\0{track}")
    }

    fn counts_cmd(name: &str) -> String {
        format!("rev-list --left-right --count refs/heads/{name}...refs/remotes/origin/{name}")
    }

    fn fetch_cmd(name: &str) -> String {
        format!("fetch --quiet origin refs/heads/{name}:refs/heads/{name}")
    }

    #[test]
    fn parses_tracking_lines() {
        let output = format!(
            "{}\nlocal-only\0\0\0\0\n{}",
            line("a", "behind 2"),
            line("b", "gone")
        );
        let parsed = parse_tracking(&output).unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed[0].has_upstream());
        assert!(!parsed[1].has_upstream());
        assert!(parsed[2].gone);
    }

    #[test]
    fn strictly_behind_branch_is_advanced() {
        let git = FakeGit::new()
            .ok(&list_cmd(), &line("feature", "behind 2"))
            .ok(&counts_cmd("feature"), "0\t2")
            .ok(&fetch_cmd("feature"), "");
        let results = plan_fast_forwards(&git, "main", Some("main"), &WorktreeMap::new()).unwrap();
        assert_eq!(
            results,
            vec![FastForwardResult {
                branch: "feature".to_string(),
                updated: true,
                error: None
            }]
        );
    }

    #[test]
    fn up_to_date_branch_reports_no_update_without_fetch() {
        let git = FakeGit::new()
            .ok(&list_cmd(), &line("feature", ""))
            .ok(&counts_cmd("feature"), "0\t0");
        let results = plan_fast_forwards(&git, "main", None, &WorktreeMap::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].updated);
        assert!(results[0].error.is_none());
        assert!(!git.was_called(&fetch_cmd("feature")));
    }

    #[test]
    fn rejected_fetch_is_per_branch_error() {
        let listing = format!("{}\n{}", line("a", "behind 1"), line("b", "behind 1"));
        let git = FakeGit::new()
            .ok(&list_cmd(), &listing)
            .ok(&counts_cmd("a"), "0 1")
            .ok(&counts_cmd("b"), "0 1")
            .fail(&fetch_cmd("a"))
            .ok(&fetch_cmd("b"), "");
        let results = plan_fast_forwards(&git, "main", None, &WorktreeMap::new()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results[0].updated);
        assert!(results[0].error.is_some());
        assert!(results[1].updated);
    }

    #[test]
    fn skipped_branches_produce_no_result() {
        let listing = [
            line("main", "behind 1"),
            line("current", "behind 1"),
            line("in-wt", "behind 1"),
            line("gone", "gone"),
            line("diverged", "ahead 1, behind 1"),
            line("ahead", "ahead 3"),
            "untracked\0\0\0\0".to_string(),
        ]
        .join("\n");
        let git = FakeGit::new()
            .ok(&list_cmd(), &listing)
            .ok(&counts_cmd("diverged"), "1 1")
            .ok(&counts_cmd("ahead"), "3 0");
        let mut worktrees = WorktreeMap::new();
        worktrees.insert(
            "in-wt".to_string(),
            WorktreeInfo {
                path: PathBuf::from("/wt/in-wt"),
                branch: Some("in-wt".to_string()),
            },
        );

        let results = plan_fast_forwards(&git, "main", Some("current"), &worktrees).unwrap();
        assert!(results.is_empty());
        assert!(!git.calls().iter().any(|c| c.starts_with("fetch")));
    }

    #[test]
    fn eligibility_reasons() {
        let git = FakeGit::new().ok(&counts_cmd("x"), "2 5");
        let branch = parse_tracking(&line("x", "ahead 2, behind 5")).unwrap().remove(0);
        assert_eq!(
            eligibility(&git, &branch, "main", None, &WorktreeMap::new()),
            Err(Skip::Diverged { ahead: 2, behind: 5 })
        );
        assert_eq!(
            eligibility(&git, &branch, "main", Some("x"), &WorktreeMap::new()),
            Err(Skip::CheckedOut)
        );
    }
}
