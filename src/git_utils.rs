//! Git command gateway.
//!
//! Every repository query in this crate goes through [`GitRunner`]: an
//! argument vector in, a [`GitOutput`] out. [`SystemGit`] shells out to the
//! `git` executable; tests substitute a scripted runner.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Result of a single git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    /// Stdout with surrounding whitespace trimmed.
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },
    #[error("could not parse git output: {0}")]
    Parse(String),
}

/// Capability to run git with an argument vector.
///
/// Implementations must be shareable across threads: branch classification
/// issues queries from many workers at once.
pub trait GitRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> GitOutput;

    /// Run and return stdout, mapping a non-zero exit to [`GitError`].
    fn run_ok(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args);
        if output.success {
            Ok(output.stdout)
        } else {
            Err(GitError::CommandFailed {
                args: args.join(" "),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs the `git` executable inside a repository directory.
#[derive(Debug, Clone)]
pub struct SystemGit {
    repo_path: PathBuf,
}

impl SystemGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

impl GitRunner for SystemGit {
    fn run(&self, args: &[&str]) -> GitOutput {
        log::debug!("git {}", args.join(" "));

        let output = match Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
        {
            Ok(o) => o,
            Err(e) => return GitOutput::failed(format!("failed to spawn git: {e}")),
        };

        GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Parse the two counts printed by `rev-list --left-right --count a...b`.
pub fn parse_left_right(text: &str) -> Result<(usize, usize), GitError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(GitError::Parse(format!("expected two counts, got {text:?}")));
    }
    let left = parts[0]
        .parse()
        .map_err(|_| GitError::Parse(format!("bad count {:?}", parts[0])))?;
    let right = parts[1]
        .parse()
        .map_err(|_| GitError::Parse(format!("bad count {:?}", parts[1])))?;
    Ok((left, right))
}

/// Parse a single integer printed by `rev-list --count`.
pub fn parse_count(text: &str) -> Result<usize, GitError> {
    text.trim()
        .parse()
        .map_err(|_| GitError::Parse(format!("bad count {text:?}")))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory runner for unit tests.

    use super::{GitOutput, GitRunner};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replies to exact argument vectors; anything unscripted fails.
    #[derive(Default)]
    pub struct FakeGit {
        replies: HashMap<String, GitOutput>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeGit {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn ok(mut self, cmd: &str, stdout: &str) -> Self {
            self.replies.insert(cmd.to_string(), GitOutput::ok(stdout));
            self
        }

        pub fn fail(mut self, cmd: &str) -> Self {
            self.replies
                .insert(cmd.to_string(), GitOutput::failed("scripted failure"));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn was_called(&self, cmd: &str) -> bool {
            self.calls().iter().any(|c| c == cmd)
        }
    }

    impl GitRunner for FakeGit {
        fn run(&self, args: &[&str]) -> GitOutput {
            let key = args.join(" ");
            self.calls.lock().unwrap().push(key.clone());
            self.replies
                .get(&key)
                .cloned()
                .unwrap_or_else(|| GitOutput::failed(format!("unscripted: git {key}")))
        }
    }
}
