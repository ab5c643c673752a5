//! Local branch enumeration.

use crate::git_utils::{GitError, GitRunner};

/// Fully qualified ref for a local branch.
///
/// Revision arguments take this form: a bare name resolves to a same-named
/// tag before the branch.
pub fn local_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

/// List local branch names in refname order, excluding `trunk` and `ignore`.
pub fn enumerate_branches(
    git: &dyn GitRunner,
    trunk: &str,
    ignore: &[String],
) -> Result<Vec<String>, GitError> {
    // lstrip=2 rather than refname:short: short names gain a "heads/" prefix
    // when a tag or remote ref shares the name.
    let stdout = git.run_ok(&["for-each-ref", "--format=%(refname:lstrip=2)", "refs/heads/"])?;

    Ok(stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| *name != trunk && !ignore.iter().any(|i| i == name))
        .map(str::to_owned)
        .collect())
}

/// Returns the branch checked out in the working directory, or `None` for
/// detached HEAD / git failures.
pub fn current_branch(git: &dyn GitRunner) -> Option<String> {
    let output = git.run(&["branch", "--show-current"]);
    if !output.success || output.stdout.is_empty() {
        None
    } else {
        Some(output.stdout)
    }
}

/// Whether `refs/heads/<branch>` exists.
pub fn local_branch_exists(git: &dyn GitRunner, branch: &str) -> bool {
    git.run(&[
        "rev-parse",
        "--verify",
        "--quiet",
        &local_ref(branch),
    ])
    .success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git_utils::testing::FakeGit;

    const LIST: &str = "for-each-ref --format=%(refname:lstrip=2) refs/heads/";

    #[test]
    fn excludes_trunk() {
        let git = FakeGit::new().ok(LIST, "alpha\nmain\nzeta");
        let branches = enumerate_branches(&git, "main", &[]).unwrap();
        assert_eq!(branches, vec!["alpha", "zeta"]);
    }

    #[test]
    fn only_trunk_yields_empty() {
        let git = FakeGit::new().ok(LIST, "main");
        assert!(enumerate_branches(&git, "main", &[]).unwrap().is_empty());
    }

    #[test]
    fn empty_repository_yields_empty() {
        let git = FakeGit::new().ok(LIST, "");
        assert!(enumerate_branches(&git, "main", &[]).unwrap().is_empty());
    }

    #[test]
    fn honours_ignore_list() {
        let git = FakeGit::new().ok(LIST, "feature/a\nmain\nrelease");
        let branches = enumerate_branches(&git, "main", &["release".to_string()]).unwrap();
        assert_eq!(branches, vec!["feature/a"]);
    }

    #[test]
    fn propagates_git_failure() {
        let git = FakeGit::new().fail(LIST);
        assert!(enumerate_branches(&git, "main", &[]).is_err());
    }

    #[test]
    fn current_branch_detached_is_none() {
        let git = FakeGit::new().ok("branch --show-current", "");
        assert_eq!(current_branch(&git), None);

        let git = FakeGit::new().ok("branch --show-current", "feature");
        assert_eq!(current_branch(&git).as_deref(), Some("feature"));
    }
}
