//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A git repository holding chart sources
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a repository with one commit on main
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::write(path.join("README.md"), "# Charts\n")?;
    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial commit"])?;

    Ok(Self { _root: root, path })
  }

  /// Add a chart source directory under `charts/<name>`
  pub fn add_chart(&self, name: &str, version: &str) -> Result<PathBuf> {
    let chart_path = self.path.join("charts").join(name);
    std::fs::create_dir_all(chart_path.join("templates"))?;

    std::fs::write(
      chart_path.join("Chart.yaml"),
      format!(
        "apiVersion: v2\nname: {}\nversion: {}\ndescription: A Helm chart for Kubernetes\nappVersion: 1.16.0\n",
        name, version
      ),
    )?;
    std::fs::write(chart_path.join("values.yaml"), "replicaCount: 1\n")?;
    std::fs::write(
      chart_path.join("templates/configmap.yaml"),
      "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {{ .Release.Name }}\n",
    )?;

    Ok(chart_path)
  }

  /// Create a bare `origin` with an empty pages branch and fetch it
  pub fn add_pages_remote(&self, branch: &str) -> Result<PathBuf> {
    let remote = self.path.join(".remote.git");
    git(&self.path, &["init", "--bare", remote.to_string_lossy().as_ref()])?;
    git(&self.path, &["remote", "add", "origin", remote.to_string_lossy().as_ref()])?;
    git(&self.path, &["push", "origin", &format!("HEAD:refs/heads/{}", branch)])?;
    git(&self.path, &["fetch", "origin"])?;
    Ok(remote)
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the cr binary, returning its output whatever the exit status
///
/// `HOME` points at `cwd` and `CR_*` variables are cleared so the host's
/// configuration never leaks into a test.
pub fn run_cr_with_env(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let cr_bin = env!("CARGO_BIN_EXE_cr");

  let mut cmd = Command::new(cr_bin);
  cmd.current_dir(cwd).args(args).env("HOME", cwd);
  for (name, _) in std::env::vars() {
    if name.starts_with("CR_") {
      cmd.env_remove(name);
    }
  }
  for (name, value) in env {
    cmd.env(name, value);
  }

  cmd.output().context("Failed to run cr")
}

pub fn run_cr(cwd: &Path, args: &[&str]) -> Result<Output> {
  run_cr_with_env(cwd, args, &[])
}

/// Run the cr binary and fail unless it exits successfully
pub fn run_cr_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_cr(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "cr command failed: cr {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}
