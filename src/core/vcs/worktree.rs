use super::VersionControl;
use crate::core::error::ReleaseResult;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Detached worktree owned by a single publish or reconcile call
///
/// The worktree is removed when the guard is dropped, on success and on
/// every error path.
pub struct ScratchWorktree<'a> {
  vcs: &'a dyn VersionControl,
  path: PathBuf,
}

impl<'a> ScratchWorktree<'a> {
  /// Check out `committish` (e.g. `origin/gh-pages`) into a new worktree
  pub fn acquire(vcs: &'a dyn VersionControl, committish: &str) -> ReleaseResult<Self> {
    let path = vcs.add_worktree(committish)?;
    debug!("Created worktree for {} at {}", committish, path.display());
    Ok(Self { vcs, path })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Drop for ScratchWorktree<'_> {
  fn drop(&mut self) {
    if let Err(e) = self.vcs.remove_worktree(&self.path) {
      warn!("Failed to remove worktree {}: {}", self.path.display(), e);
    }
  }
}
