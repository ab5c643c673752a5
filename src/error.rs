use std::path::PathBuf;

use crate::git_utils::GitError;

/// Fatal conditions that abort a pass before any branch is examined.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("Remote '{0}' is not configured")]
    MissingRemote(String),
    #[error("Trunk branch '{0}' does not exist locally")]
    MissingTrunk(String),
    #[error(transparent)]
    Git(#[from] GitError),
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;
