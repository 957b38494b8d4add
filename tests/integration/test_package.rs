//! Integration tests for `cr package`

use crate::helpers::{TestWorkspace, run_cr, run_cr_ok, stderr, stdout};
use anyhow::Result;

#[test]
fn test_package_single_chart() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_chart("test-chart", "0.1.0")?;

  let output = run_cr_ok(&ws.path, &["package", "charts/test-chart"])?;

  assert!(stdout(&output).contains("Packaged test-chart 0.1.0"));
  assert!(ws.file_exists(".cr-release-packages/test-chart-0.1.0.tgz"));
  assert!(!ws.file_exists(".cr-release-packages/test-chart-0.1.0.tgz.prov"));

  Ok(())
}

#[test]
fn test_package_recursive_with_custom_destination() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_chart("alpha", "1.0.0")?;
  ws.add_chart("beta-chart", "2.3.4")?;

  run_cr_ok(&ws.path, &["package", "charts", "--recursive", "--package-path", "dist"])?;

  assert!(ws.file_exists("dist/alpha-1.0.0.tgz"));
  assert!(ws.file_exists("dist/beta-chart-2.3.4.tgz"));

  Ok(())
}

#[test]
fn test_package_without_chart_yaml() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["package", "."])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("no Chart.yaml found"));

  Ok(())
}

#[test]
fn test_package_sign_requires_key() -> Result<()> {
  let ws = TestWorkspace::new()?;
  ws.add_chart("test-chart", "0.1.0")?;

  let output = run_cr(&ws.path, &["package", "charts/test-chart", "--sign"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--key' is required"));
  assert!(!ws.file_exists(".cr-release-packages/test-chart-0.1.0.tgz"));

  Ok(())
}
