//! Integration tests for `cr upload`
//!
//! Only paths that fail before talking to GitHub are covered here.

use crate::helpers::{TestWorkspace, run_cr, stderr};
use anyhow::Result;

#[test]
fn test_upload_requires_token() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["upload", "--owner", "helm", "--git-repo", "charts"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--token' is required"));

  Ok(())
}

#[test]
fn test_upload_empty_package_dir() -> Result<()> {
  let ws = TestWorkspace::new()?;
  std::fs::create_dir_all(ws.path.join(".cr-release-packages"))?;

  let output = run_cr(
    &ws.path,
    &["upload", "-o", "helm", "-r", "charts", "-t", "s3cret"],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("no charts found at .cr-release-packages"));

  Ok(())
}

#[test]
fn test_upload_rejects_push_and_pr() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(
    &ws.path,
    &["upload", "-o", "helm", "-r", "charts", "-t", "s3cret", "--push", "--pr"],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--push' and '--pr' are mutually exclusive"));

  Ok(())
}
