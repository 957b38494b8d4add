//! System git backend
//!
//! Every operation is one `git` subprocess with an isolated environment.
//! Output of mutating commands is captured and surfaced in errors.

use super::{VersionControl, push_url_with_token};
use crate::core::error::{GitError, ReleaseError, ReleaseResult, ResultExt};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Environment variables passed through to git
const PASSTHROUGH_ENV: [&str; 9] = [
  "PATH",
  "HOME",
  "SSH_AUTH_SOCK",
  "GIT_AUTHOR_NAME",
  "GIT_AUTHOR_EMAIL",
  "GIT_COMMITTER_NAME",
  "GIT_COMMITTER_EMAIL",
  "GIT_SSH_COMMAND",
  "XDG_CONFIG_HOME",
];

/// Git backend using system git
pub struct SystemGit {
  /// Repository the worktrees are created from
  pub(crate) repo_path: PathBuf,
}

impl SystemGit {
  /// Use the repository containing `path`
  pub fn open(path: &Path) -> Self {
    Self {
      repo_path: path.to_path_buf(),
    }
  }

  /// Create a git command with an isolated environment, run in `dir`
  ///
  /// - Clears environment variables, keeping only `PASSTHROUGH_ENV`
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self, dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir);

    cmd.env_clear();
    for name in PASSTHROUGH_ENV {
      if let Ok(value) = std::env::var(name) {
        cmd.env(name, value);
      }
    }

    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  /// Run a git command, failing with its stderr on a non-zero exit
  fn run<I, S>(&self, dir: &Path, args: I) -> ReleaseResult<Output>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    let shown = args.iter().map(|a| a.to_string_lossy()).collect::<Vec<_>>().join(" ");
    debug!("git {} (in {})", shown, dir.display());

    let output = self
      .git_cmd(dir)
      .args(&args)
      .output()
      .with_context(|| format!("Failed to execute git {}", shown))?;

    if !output.status.success() {
      return Err(ReleaseError::Git(GitError::CommandFailed {
        command: format!("git {}", shown),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(output)
  }
}

impl VersionControl for SystemGit {
  fn add_worktree(&self, committish: &str) -> ReleaseResult<PathBuf> {
    let dir = tempfile::Builder::new()
      .prefix("chart-releaser-")
      .tempdir()
      .context("Failed to create worktree directory")?
      .keep();

    let result = self.run(
      &self.repo_path,
      [
        OsStr::new("worktree"),
        OsStr::new("add"),
        OsStr::new("--detach"),
        dir.as_os_str(),
        OsStr::new(committish),
      ],
    );

    if let Err(e) = result {
      let _ = fs::remove_dir_all(&dir);
      return Err(e);
    }

    Ok(dir)
  }

  fn remove_worktree(&self, path: &Path) -> ReleaseResult<()> {
    self.run(
      &self.repo_path,
      [
        OsStr::new("worktree"),
        OsStr::new("remove"),
        path.as_os_str(),
        OsStr::new("--force"),
      ],
    )?;
    Ok(())
  }

  fn add(&self, worktree: &Path, paths: &[&Path]) -> ReleaseResult<()> {
    if paths.is_empty() {
      return Err(ReleaseError::message("git add: no paths specified"));
    }

    let mut args = vec![OsStr::new("add")];
    args.extend(paths.iter().map(|p| p.as_os_str()));
    self.run(worktree, args)?;
    Ok(())
  }

  fn commit(&self, worktree: &Path, message: &str) -> ReleaseResult<()> {
    self.run(worktree, ["commit", "--message", message, "--signoff"])?;
    Ok(())
  }

  fn pull(&self, worktree: &Path, args: &[&str]) -> ReleaseResult<()> {
    let mut full = vec!["pull"];
    full.extend_from_slice(args);
    self.run(worktree, full)?;
    Ok(())
  }

  fn push(&self, worktree: &Path, args: &[&str]) -> ReleaseResult<()> {
    let mut full = vec!["push"];
    full.extend_from_slice(args);

    match self.run(worktree, full) {
      Ok(_) => Ok(()),
      Err(ReleaseError::Git(GitError::CommandFailed { stderr, .. })) => Err(ReleaseError::Git(GitError::PushFailed {
        branch: args.last().map(|r| redact_refspec(r)).unwrap_or_default(),
        reason: stderr,
      })),
      Err(e) => Err(e),
    }
  }

  fn get_push_url(&self, remote: &str, token: &str) -> ReleaseResult<String> {
    let output = self.run(&self.repo_path, ["remote", "get-url", "--push", remote])?;
    let url = String::from_utf8(output.stdout)?;
    Ok(push_url_with_token(&url, token))
  }
}

/// Keep the destination ref of a refspec; URLs never reach error messages
fn redact_refspec(refspec: &str) -> String {
  refspec.rsplit(':').next().unwrap_or(refspec).to_string()
}
