//! In-memory version control backend for tests
//!
//! Worktrees are real temp directories so the code under test can read and
//! write files in them; every other operation is only recorded.

use super::VersionControl;
use crate::core::error::ReleaseResult;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub struct FakeGit {
  /// Files written into every new worktree (relative path, contents)
  seed: RefCell<Vec<(String, Vec<u8>)>>,
  calls: RefCell<Vec<String>>,
  live: RefCell<Vec<PathBuf>>,
}

impl FakeGit {
  pub fn new() -> Self {
    Self::default()
  }

  /// Pre-populate worktrees with `name` (e.g. an existing index.yaml)
  pub fn seed_file(&self, name: &str, contents: impl Into<Vec<u8>>) {
    self.seed.borrow_mut().push((name.to_string(), contents.into()));
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }

  /// Worktrees created and not yet removed
  pub fn live_worktrees(&self) -> Vec<PathBuf> {
    self.live.borrow().clone()
  }

  fn record(&self, call: String) {
    self.calls.borrow_mut().push(call);
  }
}

impl VersionControl for FakeGit {
  fn add_worktree(&self, committish: &str) -> ReleaseResult<PathBuf> {
    let dir = tempfile::Builder::new().prefix("fake-worktree-").tempdir()?.keep();
    for (name, contents) in self.seed.borrow().iter() {
      fs::write(dir.join(name), contents)?;
    }
    self.record(format!("worktree add {}", committish));
    self.live.borrow_mut().push(dir.clone());
    Ok(dir)
  }

  fn remove_worktree(&self, path: &Path) -> ReleaseResult<()> {
    self.record("worktree remove".to_string());
    self.live.borrow_mut().retain(|p| p != path);
    fs::remove_dir_all(path)?;
    Ok(())
  }

  fn add(&self, _worktree: &Path, paths: &[&Path]) -> ReleaseResult<()> {
    let names: Vec<_> = paths.iter().map(|p| p.display().to_string()).collect();
    self.record(format!("add {}", names.join(" ")));
    Ok(())
  }

  fn commit(&self, _worktree: &Path, message: &str) -> ReleaseResult<()> {
    self.record(format!("commit {}", message));
    Ok(())
  }

  fn pull(&self, _worktree: &Path, args: &[&str]) -> ReleaseResult<()> {
    self.record(format!("pull {}", args.join(" ")));
    Ok(())
  }

  fn push(&self, _worktree: &Path, args: &[&str]) -> ReleaseResult<()> {
    self.record(format!("push {}", args.join(" ")));
    Ok(())
  }

  fn get_push_url(&self, remote: &str, token: &str) -> ReleaseResult<String> {
    self.record(format!("get-push-url {}", remote));
    Ok(format!("https://x-access-token:{}@github.com/owner/repo", token))
  }
}
