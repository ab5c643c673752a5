pub mod branches;
pub mod classify;
pub mod config;
pub mod deletion;
pub mod divergence;
pub mod error;
pub mod fast_forward;
pub mod git_utils;
pub mod merge;
pub mod sweeper;
pub mod worktree;

pub use classify::{AnalyzeProgress, BranchInfo, BranchStatus, NoProgress, ProgressSink};
pub use config::SweepConfig;
pub use deletion::{DeleteRequest, DeleteResult};
pub use error::SweepError;
pub use fast_forward::FastForwardResult;
pub use git_utils::{GitOutput, GitRunner, SystemGit};
pub use sweeper::Sweeper;
pub use worktree::{WorktreeInfo, WorktreeMap};
