//! Integration tests for option layering (flags, environment, config file)

use crate::helpers::{TestWorkspace, run_cr, run_cr_with_env, stderr};
use anyhow::Result;

#[test]
fn test_config_file_in_current_directory() -> Result<()> {
  let ws = TestWorkspace::new()?;
  std::fs::write(ws.path.join("cr.toml"), "owner = \"helm\"\ngit-repo = \"charts\"\n")?;

  let output = run_cr(&ws.path, &["upload"])?;

  // owner and git-repo come from cr.toml, so only the token is missing
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("'--token' is required"));

  Ok(())
}

#[test]
fn test_environment_fills_missing_options() -> Result<()> {
  let ws = TestWorkspace::new()?;
  std::fs::write(ws.path.join("cr.yaml"), "owner: helm\ngit-repo: charts\npackage-path: dist\n")?;
  std::fs::create_dir_all(ws.path.join("dist"))?;

  let output = run_cr_with_env(&ws.path, &["upload"], &[("CR_TOKEN", "s3cret")])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("no charts found at dist"));

  Ok(())
}

#[test]
fn test_flags_override_environment() -> Result<()> {
  let ws = TestWorkspace::new()?;
  std::fs::create_dir_all(ws.path.join("flagged"))?;

  let output = run_cr_with_env(
    &ws.path,
    &["upload", "-o", "helm", "-r", "charts", "-t", "s3cret", "-p", "flagged"],
    &[("CR_PACKAGE_PATH", "from-env")],
  )?;

  assert!(stderr(&output).contains("no charts found at flagged"));

  Ok(())
}

#[test]
fn test_explicit_config_file_must_exist() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr(&ws.path, &["upload", "--config", "nope.toml"])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Error loading config file nope.toml"));

  Ok(())
}

#[test]
fn test_invalid_boolean_in_environment() -> Result<()> {
  let ws = TestWorkspace::new()?;

  let output = run_cr_with_env(
    &ws.path,
    &["upload", "-o", "helm", "-r", "charts", "-t", "s3cret"],
    &[("CR_SKIP_EXISTING", "maybe")],
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("Invalid value 'maybe'"));

  Ok(())
}
