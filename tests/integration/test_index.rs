//! Integration tests for `cr index`

use crate::helpers::{TestWorkspace, git, run_cr, stderr};
use anyhow::Result;

#[test]
fn test_index_rejects_push_and_pr() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["index", "-o", "helm", "-r", "charts", "--push", "--pr"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--push' and '--pr' are mutually exclusive"));
  // Nothing was checked out
  let worktrees = git(&ws.path, &["worktree", "list"])?;
  assert_eq!(String::from_utf8_lossy(&worktrees.stdout).lines().count(), 1);

  Ok(())
}

#[test]
fn test_index_requires_owner() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["update-index", "--git-repo", "charts"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--owner' is required"));

  Ok(())
}

#[test]
fn test_index_path_must_be_directory_or_index_yaml() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(
    &ws.path,
    &["index", "-o", "helm", "-r", "charts", "--index-path", "missing/repo.yaml"],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("should be a directory or a file called index.yaml"));

  Ok(())
}

#[test]
fn test_index_removes_worktree_on_error() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_pages_remote("gh-pages")?;
  std::fs::create_dir_all(ws.path.join("empty"))?;

  let output = run_cr(
    &ws.path,
    &["index", "-o", "helm", "-r", "charts", "--package-path", "empty"],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("no charts found at empty"));

  git(&ws.path, &["worktree", "prune"])?;
  let worktrees = git(&ws.path, &["worktree", "list"])?;
  assert_eq!(String::from_utf8_lossy(&worktrees.stdout).lines().count(), 1);

  Ok(())
}

#[test]
fn test_index_fails_without_pages_branch() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["index", "-o", "helm", "-r", "charts"])?;

  assert_eq!(output.status.code(), Some(2));
  assert!(stderr(&output).contains("worktree add"));

  Ok(())
}
