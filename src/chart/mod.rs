//! Chart packages: metadata, archive access and digests
//!
//! A packaged chart is a gzip'd tarball whose entries all live under a
//! single `<chart>/` directory, with the metadata in `<chart>/Chart.yaml`.

mod package;

pub use package::{PackageOptions, SignOptions, find_charts, package_chart};

use crate::core::error::{PackageError, ReleaseResult, ResultExt};
use flate2::read::GzDecoder;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Metadata file at the root of every chart
pub const CHART_FILE: &str = "Chart.yaml";

/// Suffix of packaged charts
pub const ARCHIVE_EXT: &str = ".tgz";

/// Suffix of provenance files next to a package
pub const PROVENANCE_EXT: &str = ".prov";

/// Contents of `Chart.yaml`
///
/// Only the fields the releaser reads are typed; everything else is kept in
/// `extra` so index entries carry the full metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_version: Option<String>,
  #[serde(deserialize_with = "scalar_string")]
  pub name: String,
  #[serde(deserialize_with = "scalar_string")]
  pub version: String,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub description: String,
  #[serde(
    default,
    deserialize_with = "optional_scalar_string",
    skip_serializing_if = "Option::is_none"
  )]
  pub app_version: Option<String>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ChartMetadata {
  /// `<name>-<version>.tgz`
  pub fn archive_name(&self) -> String {
    format!("{}-{}{}", self.name, self.version, ARCHIVE_EXT)
  }

  /// Parse and validate `Chart.yaml` contents
  pub fn from_yaml(bytes: &[u8], origin: &Path) -> ReleaseResult<Self> {
    let metadata: ChartMetadata = serde_yaml::from_slice(bytes).map_err(|e| PackageError::InvalidChart {
      path: origin.to_path_buf(),
      reason: e.to_string(),
    })?;

    if metadata.name.trim().is_empty() {
      return Err(invalid(origin, "chart name is empty"));
    }
    if metadata.version.trim().is_empty() {
      return Err(invalid(origin, "chart version is empty"));
    }
    Ok(metadata)
  }
}

/// Versions and app versions are often written as bare YAML numbers
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match serde_yaml::Value::deserialize(deserializer)? {
    serde_yaml::Value::String(s) => Ok(s),
    serde_yaml::Value::Number(n) => Ok(n.to_string()),
    serde_yaml::Value::Bool(b) => Ok(b.to_string()),
    other => Err(D::Error::custom(format!("expected a string, found {:?}", other))),
  }
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
  match serde_yaml::Value::deserialize(deserializer)? {
    serde_yaml::Value::Null => Ok(None),
    serde_yaml::Value::String(s) => Ok(Some(s)),
    serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
    serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
    other => Err(D::Error::custom(format!("expected a string, found {:?}", other))),
  }
}

fn invalid(path: &Path, reason: impl Into<String>) -> crate::core::error::ReleaseError {
  PackageError::InvalidChart {
    path: path.to_path_buf(),
    reason: reason.into(),
  }
  .into()
}

/// Load the chart metadata embedded in a packaged chart
pub fn load_archive(path: &Path) -> ReleaseResult<ChartMetadata> {
  let bytes = read_archive_file(path, CHART_FILE)?
    .ok_or_else(|| invalid(path, format!("{} not found in archive", CHART_FILE)))?;
  ChartMetadata::from_yaml(&bytes, path)
}

/// Read `<chart>/<name>` from a packaged chart, `None` when absent
pub fn read_archive_file(path: &Path, name: &str) -> ReleaseResult<Option<Vec<u8>>> {
  let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  let mut archive = tar::Archive::new(GzDecoder::new(file));
  let wanted = Path::new(name);

  let entries = archive.entries().map_err(|e| invalid(path, e.to_string()))?;
  for entry in entries {
    let mut entry = entry.map_err(|e| invalid(path, e.to_string()))?;
    let entry_path = entry.path().map_err(|e| invalid(path, e.to_string()))?.into_owned();

    let mut components = entry_path.components();
    if components.next().is_none() {
      continue;
    }
    if components.as_path() == wanted {
      let mut contents = Vec::new();
      entry
        .read_to_end(&mut contents)
        .map_err(|e| invalid(path, e.to_string()))?;
      return Ok(Some(contents));
    }
  }

  Ok(None)
}

/// Hex-encoded SHA-256 of a file
pub fn digest_file(path: &Path) -> ReleaseResult<String> {
  let mut file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
  let mut hasher = Sha256::new();
  io::copy(&mut file, &mut hasher).with_context(|| format!("failed to read {}", path.display()))?;
  Ok(hex::encode(hasher.finalize()))
}

/// Packaged charts directly inside `dir`, in glob order
///
/// Provenance files do not match the pattern.
pub fn list_packages(dir: &Path) -> ReleaseResult<Vec<PathBuf>> {
  let pattern = dir.join(format!("*{}", ARCHIVE_EXT));
  let pattern = pattern.to_string_lossy();
  let mut packages = Vec::new();
  for entry in glob::glob(&pattern)? {
    let path = entry?;
    if path.is_file() {
      packages.push(path);
    }
  }

  if packages.is_empty() {
    return Err(PackageError::NoPackagesFound { path: dir.to_path_buf() }.into());
  }
  Ok(packages)
}

/// Path of the provenance file belonging to `archive`
pub fn provenance_path(archive: &Path) -> PathBuf {
  let mut name = archive.as_os_str().to_os_string();
  name.push(PROVENANCE_EXT);
  PathBuf::from(name)
}
