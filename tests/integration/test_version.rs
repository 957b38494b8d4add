//! Integration tests for `cr version`

use crate::helpers::{TestWorkspace, run_cr_ok, stdout};
use anyhow::Result;

#[test]
fn test_version_table() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr_ok(&ws.path, &["version"])?;
  let text = stdout(&output);

  assert!(text.contains(&format!("Version:\t{}", env!("CARGO_PKG_VERSION"))));
  assert!(text.contains("Git Commit:"));

  Ok(())
}

#[test]
fn test_version_json() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr_ok(&ws.path, &["version", "--json"])?;
  let info: serde_json::Value = serde_json::from_str(&stdout(&output))?;

  assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
  assert!(info["platform"].is_string());

  Ok(())
}
