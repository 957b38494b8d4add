//! Build chart packages from chart source directories

use super::{CHART_FILE, ChartMetadata, digest_file, provenance_path};
use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::Pattern;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

const IGNORE_FILE: &str = ".helmignore";

/// Where packages go and how they are signed
#[derive(Debug, Clone)]
pub struct PackageOptions {
  pub destination: PathBuf,
  pub sign: Option<SignOptions>,
}

/// GPG key used to write provenance files
#[derive(Debug, Clone)]
pub struct SignOptions {
  /// Key name or id passed to `gpg --local-user`
  pub key: String,
  pub keyring: Option<PathBuf>,
  pub passphrase_file: Option<PathBuf>,
}

/// Result of packaging one chart
#[derive(Debug, Clone)]
pub struct PackagedChart {
  pub metadata: ChartMetadata,
  pub archive: PathBuf,
  pub provenance: Option<PathBuf>,
}

/// `.helmignore` rules
#[derive(Debug, Default)]
pub struct IgnoreRules {
  rules: Vec<IgnoreRule>,
}

#[derive(Debug)]
struct IgnoreRule {
  pattern: Pattern,
  negate: bool,
  dir_only: bool,
  /// Patterns without a slash match the base name at any depth
  basename: bool,
}

impl IgnoreRules {
  /// Parse `.helmignore` syntax: globs, `!` negation, trailing `/` for directories
  pub fn parse(contents: &str) -> ReleaseResult<Self> {
    let mut rules = Vec::new();
    for line in contents.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }

      let (negate, line) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
      };
      let (dir_only, line) = match line.strip_suffix('/') {
        Some(rest) => (true, rest),
        None => (false, line),
      };
      let line = line.trim_start_matches('/');
      if line.is_empty() {
        continue;
      }

      rules.push(IgnoreRule {
        pattern: Pattern::new(line)?,
        negate,
        dir_only,
        basename: !line.contains('/'),
      });
    }
    Ok(Self { rules })
  }

  /// Rules from `<chart_dir>/.helmignore`, empty when the file is absent
  pub fn load(chart_dir: &Path) -> ReleaseResult<Self> {
    let path = chart_dir.join(IGNORE_FILE);
    if !path.exists() {
      return Ok(Self::default());
    }
    let contents = fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    Self::parse(&contents)
  }

  /// Last matching rule wins
  pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
    let full = relative.to_string_lossy().replace('\\', "/");
    let base = relative
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();

    let mut ignored = false;
    for rule in &self.rules {
      if rule.dir_only && !is_dir {
        continue;
      }
      let matched = rule.pattern.matches(&full) || (rule.basename && rule.pattern.matches(&base));
      if matched {
        ignored = !rule.negate;
      }
    }
    ignored
  }
}

/// Chart directories to package
///
/// Without `recursive` every path must itself be a chart; with it, every
/// directory below the paths that holds a `Chart.yaml` is returned.
pub fn find_charts(paths: &[PathBuf], recursive: bool) -> ReleaseResult<Vec<PathBuf>> {
  let mut charts = Vec::new();
  for path in paths {
    if !path.is_dir() {
      return Err(ReleaseError::with_help(
        format!("chart directory not found: {}", path.display()),
        "Pass the directory that contains Chart.yaml.",
      ));
    }
    if recursive {
      collect_charts(path, &mut charts)?;
    } else if path.join(CHART_FILE).is_file() {
      charts.push(path.clone());
    } else {
      return Err(ReleaseError::with_help(
        format!("no {} found in {}", CHART_FILE, path.display()),
        "Use --recursive to package every chart below a directory.",
      ));
    }
  }
  Ok(charts)
}

fn collect_charts(dir: &Path, charts: &mut Vec<PathBuf>) -> ReleaseResult<()> {
  if dir.join(CHART_FILE).is_file() {
    charts.push(dir.to_path_buf());
    // Subcharts are packaged with their parent
    return Ok(());
  }

  let mut children: Vec<PathBuf> = fs::read_dir(dir)
    .with_context(|| format!("failed to read {}", dir.display()))?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|p| p.is_dir() && p.file_name().is_some_and(|n| n != ".git"))
    .collect();
  children.sort();

  for child in children {
    collect_charts(&child, charts)?;
  }
  Ok(())
}

/// Package `chart_dir` into `<destination>/<name>-<version>.tgz`
pub fn package_chart(chart_dir: &Path, options: &PackageOptions) -> ReleaseResult<PackagedChart> {
  let chart_file = chart_dir.join(CHART_FILE);
  let raw = fs::read(&chart_file).with_context(|| format!("failed to read {}", chart_file.display()))?;
  let metadata = ChartMetadata::from_yaml(&raw, &chart_file)?;

  let rules = IgnoreRules::load(chart_dir)?;
  let mut files = Vec::new();
  collect_files(chart_dir, Path::new(""), &rules, &mut files)?;
  files.sort();

  fs::create_dir_all(&options.destination)
    .with_context(|| format!("failed to create {}", options.destination.display()))?;
  let archive = options.destination.join(metadata.archive_name());

  write_archive(&archive, chart_dir, &metadata.name, &files)?;
  debug!("Wrote {} ({} files)", archive.display(), files.len());

  let provenance = match &options.sign {
    Some(sign) => Some(sign_archive(&archive, &metadata, sign)?),
    None => None,
  };

  Ok(PackagedChart {
    metadata,
    archive,
    provenance,
  })
}

fn collect_files(root: &Path, relative: &Path, rules: &IgnoreRules, files: &mut Vec<PathBuf>) -> ReleaseResult<()> {
  let dir = root.join(relative);
  for entry in fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))? {
    let entry = entry?;
    let name = entry.file_name();
    if name == ".git" {
      continue;
    }

    let rel = relative.join(&name);
    let file_type = entry.file_type()?;
    if rules.is_ignored(&rel, file_type.is_dir()) {
      continue;
    }

    if file_type.is_dir() {
      collect_files(root, &rel, rules, files)?;
    } else if file_type.is_file() {
      files.push(rel);
    }
  }
  Ok(())
}

fn write_archive(archive: &Path, chart_dir: &Path, chart_name: &str, files: &[PathBuf]) -> ReleaseResult<()> {
  let out = File::create(archive).with_context(|| format!("failed to create {}", archive.display()))?;
  let mut builder = tar::Builder::new(GzEncoder::new(out, Compression::default()));
  let mtime = chrono::Utc::now().timestamp().max(0) as u64;

  for rel in files {
    let source = chart_dir.join(rel);
    let mut file = File::open(&source).with_context(|| format!("failed to open {}", source.display()))?;
    let size = file.metadata()?.len();

    let mut header = tar::Header::new_gnu();
    header.set_size(size);
    header.set_mode(0o644);
    header.set_mtime(mtime);
    builder
      .append_data(&mut header, Path::new(chart_name).join(rel), &mut file)
      .with_context(|| format!("failed to add {} to archive", rel.display()))?;
  }

  builder.into_inner()?.finish()?;
  Ok(())
}

/// Provenance body: chart metadata, a YAML document end marker, and the archive digest
pub(crate) fn provenance_body(metadata: &ChartMetadata, archive_name: &str, digest: &str) -> ReleaseResult<String> {
  let chart = serde_yaml::to_string(metadata)?;
  Ok(format!(
    "{}...\nfiles:\n  {}: sha256:{}\n",
    chart, archive_name, digest
  ))
}

fn sign_archive(archive: &Path, metadata: &ChartMetadata, sign: &SignOptions) -> ReleaseResult<PathBuf> {
  let digest = digest_file(archive)?;
  let body = provenance_body(metadata, &metadata.archive_name(), &digest)?;
  let output = provenance_path(archive);

  let mut cmd = Command::new("gpg");
  cmd.args(["--batch", "--yes", "--clearsign", "--local-user", &sign.key]);
  if let Some(keyring) = &sign.keyring {
    cmd.arg("--no-default-keyring").arg("--keyring").arg(keyring);
  }
  if let Some(passphrase) = &sign.passphrase_file {
    cmd.args(["--pinentry-mode", "loopback", "--passphrase-file"]).arg(passphrase);
  }
  cmd.arg("--output").arg(&output);
  cmd.stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::piped());

  let mut child = cmd.spawn().context("failed to run gpg")?;
  if let Some(mut stdin) = child.stdin.take() {
    stdin.write_all(body.as_bytes()).context("failed to write to gpg")?;
  }
  let result = child.wait_with_output().context("failed to wait for gpg")?;

  if !result.status.success() {
    return Err(ReleaseError::with_help(
      format!(
        "failed to sign {}: {}",
        archive.display(),
        String::from_utf8_lossy(&result.stderr).trim_end()
      ),
      "Check --key, --keyring and --passphrase-file.",
    ));
  }

  Ok(output)
}
