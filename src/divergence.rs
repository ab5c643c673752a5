//! Status of branches that are not merged into trunk.

use crate::branches::local_ref;
use crate::classify::BranchStatus;
use crate::git_utils::{parse_count, GitError, GitRunner};

/// Full remote-tracking ref that stands for `branch` on the remote.
///
/// The configured upstream wins; otherwise `refs/remotes/<remote>/<branch>`
/// if it exists.
pub fn remote_counterpart(git: &dyn GitRunner, branch: &str, remote: &str) -> Option<String> {
    // `<name>@{upstream}` reads branch config, so tags cannot shadow it.
    let upstream = git.run(&[
        "rev-parse",
        "--symbolic-full-name",
        &format!("{branch}@{{upstream}}"),
    ]);
    if upstream.success && !upstream.stdout.is_empty() {
        return Some(upstream.stdout);
    }

    let fallback = format!("refs/remotes/{remote}/{branch}");
    let exists = git
        .run(&["rev-parse", "--verify", "--quiet", &fallback])
        .success;
    exists.then_some(fallback)
}

/// Number of commits reachable from `to` but not from `from`.
pub fn count_commits(git: &dyn GitRunner, from: &str, to: &str) -> Result<usize, GitError> {
    let range = format!("{from}..{to}");
    parse_count(&git.run_ok(&["rev-list", "--count", &range])?)
}

fn has_unpushed_commits(git: &dyn GitRunner, branch: &str, remote: &str) -> bool {
    let Some(counterpart) = remote_counterpart(git, branch, remote) else {
        log::debug!("{branch}: no remote counterpart");
        return true;
    };
    match count_commits(git, &counterpart, &local_ref(branch)) {
        Ok(ahead) => ahead > 0,
        Err(e) => {
            // Unknown ahead count: keep the branch flagged as holding work.
            log::warn!("{branch}: cannot compare with {counterpart}: {e}");
            true
        }
    }
}

fn trunk_moved_ahead(git: &dyn GitRunner, branch: &str, trunk: &str) -> bool {
    match count_commits(git, &local_ref(branch), &local_ref(trunk)) {
        Ok(behind) => behind > 0,
        Err(e) => {
            log::warn!("{branch}: cannot compare with {trunk}: {e}");
            false
        }
    }
}

/// Classify a branch already known not to be merged.
///
/// Never returns [`BranchStatus::Merged`].
pub fn classify(git: &dyn GitRunner, branch: &str, trunk: &str, remote: &str) -> BranchStatus {
    if has_unpushed_commits(git, branch, remote) {
        BranchStatus::Unpushed
    } else if trunk_moved_ahead(git, branch, trunk) {
        BranchStatus::NeedsRebase
    } else {
        BranchStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_utils::testing::FakeGit;

    const UPSTREAM: &str = "rev-parse --symbolic-full-name feature@{upstream}";
    const FALLBACK: &str = "rev-parse --verify --quiet refs/remotes/origin/feature";
    const AHEAD: &str = "rev-list --count refs/remotes/origin/feature..refs/heads/feature";
    const BEHIND: &str = "rev-list --count refs/heads/feature..refs/heads/main";

    #[test]
    fn no_counterpart_is_unpushed() {
        let git = FakeGit::new().fail(UPSTREAM).fail(FALLBACK);
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Unpushed);
        assert!(!git.was_called(BEHIND));
    }

    #[test]
    fn local_commits_are_unpushed() {
        let git = FakeGit::new()
            .ok(UPSTREAM, "refs/remotes/origin/feature")
            .ok(AHEAD, "2")
            .ok(BEHIND, "5");
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Unpushed);
    }

    #[test]
    fn falls_back_to_same_named_remote_branch() {
        let git = FakeGit::new()
            .fail(UPSTREAM)
            .ok(FALLBACK, "abc")
            .ok(AHEAD, "0")
            .ok(BEHIND, "0");
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Active);
    }

    #[test]
    fn trunk_ahead_needs_rebase() {
        let git = FakeGit::new()
            .ok(UPSTREAM, "refs/remotes/origin/feature")
            .ok(AHEAD, "0")
            .ok(BEHIND, "3");
        assert_eq!(
            classify(&git, "feature", "main", "origin"),
            BranchStatus::NeedsRebase
        );
    }

    #[test]
    fn in_sync_is_active() {
        let git = FakeGit::new()
            .ok(UPSTREAM, "refs/remotes/origin/feature")
            .ok(AHEAD, "0")
            .ok(BEHIND, "0");
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Active);
    }

    #[test]
    fn ahead_count_failure_is_unpushed() {
        let git = FakeGit::new().ok(UPSTREAM, "refs/remotes/origin/feature").fail(AHEAD);
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Unpushed);
    }

    #[test]
    fn trunk_count_failure_is_active() {
        let git = FakeGit::new()
            .ok(UPSTREAM, "refs/remotes/origin/feature")
            .ok(AHEAD, "0")
            .fail(BEHIND);
        assert_eq!(classify(&git, "feature", "main", "origin"), BranchStatus::Active);
    }
}
