//! Chart repository index (`index.yaml`)

use crate::chart::{ARCHIVE_EXT, ChartMetadata};
use crate::core::error::{PackageError, ReleaseResult, ResultExt};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

pub const API_VERSION: &str = "v1";

#[cfg(unix)]
const INDEX_FILE_MODE: u32 = 0o644;

/// The index document: every published version of every chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexFile {
  pub api_version: String,
  #[serde(default)]
  pub entries: BTreeMap<String, Vec<ChartVersion>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub generated: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One chart version in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartVersion {
  #[serde(flatten)]
  pub metadata: ChartMetadata,
  #[serde(default)]
  pub urls: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub digest: String,
}

impl Default for IndexFile {
  fn default() -> Self {
    Self::new()
  }
}

impl IndexFile {
  /// Empty index without a generation timestamp
  pub fn new() -> Self {
    Self {
      api_version: API_VERSION.to_string(),
      entries: BTreeMap::new(),
      generated: None,
      extra: BTreeMap::new(),
    }
  }

  pub fn load(path: &Path) -> ReleaseResult<Self> {
    let contents = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_slice(&contents).with_context(|| format!("failed to parse {}", path.display()))
  }

  /// Load `path`, or start empty when it does not exist
  pub fn load_or_new(path: &Path) -> ReleaseResult<Self> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::new())
    }
  }

  pub fn has(&self, name: &str, version: &str) -> bool {
    self
      .entries
      .get(name)
      .is_some_and(|versions| versions.iter().any(|v| v.metadata.version == version))
  }

  /// Append a version entry; the caller checks `has` first
  pub fn add(&mut self, metadata: ChartMetadata, url: String, digest: String) {
    let entry = ChartVersion {
      metadata,
      urls: vec![url],
      created: Some(Utc::now()),
      digest,
    };
    self
      .entries
      .entry(entry.metadata.name.clone())
      .or_default()
      .push(entry);
  }

  /// Names ascending (map order), versions descending
  pub fn sort_entries(&mut self) {
    for versions in self.entries.values_mut() {
      versions.sort_by(|a, b| compare_versions(&b.metadata.version, &a.metadata.version));
    }
  }

  /// Stamp `generated` and replace `path` with the serialized index
  ///
  /// The document goes to a temp file in the same directory first, so an
  /// interrupted write leaves the previous file intact.
  pub fn write(&mut self, path: &Path) -> ReleaseResult<()> {
    self.generated = Some(Utc::now());
    let yaml = serde_yaml::to_string(self)?;

    let dir = match path.parent() {
      Some(p) if !p.as_os_str().is_empty() => p,
      _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(yaml.as_bytes())?;
    // Temp files are created 0600; the index is served to everyone
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      tmp.as_file().set_permissions(fs::Permissions::from_mode(INDEX_FILE_MODE))?;
    }
    tmp.persist(path)
      .map_err(|e| e.error)
      .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
  }
}

/// Semantic version order, lexical order when either side is not semver
fn compare_versions(a: &str, b: &str) -> Ordering {
  let parse = |v: &str| Version::parse(v.trim_start_matches('v')).ok();
  match (parse(a), parse(b)) {
    (Some(a), Some(b)) => a.cmp(&b),
    _ => a.cmp(b),
  }
}

/// Split `<name>-<version>[.tgz]` on the last hyphen
///
/// Names may contain hyphens, versions may not. A name without any hyphen
/// cannot be split.
pub fn split_package_name_and_version(file_name: &str) -> ReleaseResult<(String, String)> {
  let stem = file_name.strip_suffix(ARCHIVE_EXT).unwrap_or(file_name);
  match stem.rsplit_once('-') {
    Some((name, version)) if !name.is_empty() && !version.is_empty() => Ok((name.to_string(), version.to_string())),
    _ => Err(
      PackageError::InvalidFileName {
        name: file_name.to_string(),
      }
      .into(),
    ),
  }
}
