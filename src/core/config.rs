//! Layered configuration for chart-releaser
//!
//! Options are resolved from four layers, highest precedence first:
//! command-line flags, `CR_`-prefixed environment variables, a config file,
//! and built-in defaults.
//!
//! Config files are searched in order: `cr.toml`, `cr.yaml`, `cr.yml` inside
//! `.`, `~/.cr` and `/etc/cr`, unless `--config` names one explicitly.

use crate::core::error::{ConfigError, ReleaseError, ReleaseResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_RELEASE_NAME_TEMPLATE: &str = "{{ .Name }}-{{ .Version }}";
pub const DEFAULT_PACKAGE_PATH: &str = ".cr-release-packages";
pub const DEFAULT_INDEX_PATH: &str = ".cr-index/index.yaml";
pub const DEFAULT_PAGES_BRANCH: &str = "gh-pages";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_GIT_BASE_URL: &str = "https://api.github.com/";
pub const DEFAULT_GIT_UPLOAD_URL: &str = "https://uploads.github.com/";

pub const INDEX_FILE_NAME: &str = "index.yaml";
const CONFIG_FILE_NAMES: [&str; 3] = ["cr.toml", "cr.yaml", "cr.yml"];

/// Every option chart-releaser understands, keyed by its flag name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKey {
  Owner,
  GitRepo,
  Token,
  GitBaseUrl,
  GitUploadUrl,
  PackagePath,
  IndexPath,
  PagesBranch,
  Remote,
  Push,
  Pr,
  Commit,
  ReleaseNameTemplate,
  ReleaseNotesFile,
  GenerateReleaseNotes,
  MakeReleaseLatest,
  SkipExisting,
  PackagesWithIndex,
  Sign,
  Key,
  Keyring,
  PassphraseFile,
}

impl OptionKey {
  pub const ALL: [OptionKey; 22] = [
    OptionKey::Owner,
    OptionKey::GitRepo,
    OptionKey::Token,
    OptionKey::GitBaseUrl,
    OptionKey::GitUploadUrl,
    OptionKey::PackagePath,
    OptionKey::IndexPath,
    OptionKey::PagesBranch,
    OptionKey::Remote,
    OptionKey::Push,
    OptionKey::Pr,
    OptionKey::Commit,
    OptionKey::ReleaseNameTemplate,
    OptionKey::ReleaseNotesFile,
    OptionKey::GenerateReleaseNotes,
    OptionKey::MakeReleaseLatest,
    OptionKey::SkipExisting,
    OptionKey::PackagesWithIndex,
    OptionKey::Sign,
    OptionKey::Key,
    OptionKey::Keyring,
    OptionKey::PassphraseFile,
  ];

  /// Flag name, also used as the config file key
  pub fn as_str(self) -> &'static str {
    match self {
      OptionKey::Owner => "owner",
      OptionKey::GitRepo => "git-repo",
      OptionKey::Token => "token",
      OptionKey::GitBaseUrl => "git-base-url",
      OptionKey::GitUploadUrl => "git-upload-url",
      OptionKey::PackagePath => "package-path",
      OptionKey::IndexPath => "index-path",
      OptionKey::PagesBranch => "pages-branch",
      OptionKey::Remote => "remote",
      OptionKey::Push => "push",
      OptionKey::Pr => "pr",
      OptionKey::Commit => "commit",
      OptionKey::ReleaseNameTemplate => "release-name-template",
      OptionKey::ReleaseNotesFile => "release-notes-file",
      OptionKey::GenerateReleaseNotes => "generate-release-notes",
      OptionKey::MakeReleaseLatest => "make-release-latest",
      OptionKey::SkipExisting => "skip-existing",
      OptionKey::PackagesWithIndex => "packages-with-index",
      OptionKey::Sign => "sign",
      OptionKey::Key => "key",
      OptionKey::Keyring => "keyring",
      OptionKey::PassphraseFile => "passphrase-file",
    }
  }

  /// Environment variable name, e.g. `CR_GIT_REPO`
  pub fn env_var(self) -> String {
    format!("CR_{}", self.as_str().to_uppercase().replace('-', "_"))
  }
}

/// One configuration layer; unset fields fall through to the next layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OptionLayer {
  pub owner: Option<String>,
  pub git_repo: Option<String>,
  pub token: Option<String>,
  pub git_base_url: Option<String>,
  pub git_upload_url: Option<String>,
  pub package_path: Option<PathBuf>,
  pub index_path: Option<PathBuf>,
  pub pages_branch: Option<String>,
  pub remote: Option<String>,
  pub push: Option<bool>,
  pub pr: Option<bool>,
  pub commit: Option<String>,
  pub release_name_template: Option<String>,
  pub release_notes_file: Option<String>,
  pub generate_release_notes: Option<bool>,
  pub make_release_latest: Option<bool>,
  pub skip_existing: Option<bool>,
  pub packages_with_index: Option<bool>,
  pub sign: Option<bool>,
  pub key: Option<String>,
  pub keyring: Option<PathBuf>,
  pub passphrase_file: Option<PathBuf>,
}

impl OptionLayer {
  /// Read the `CR_*` variables from the process environment
  pub fn from_env() -> ReleaseResult<Self> {
    Self::from_env_with(|name| std::env::var(name).ok())
  }

  /// Build a layer from an arbitrary variable lookup
  pub fn from_env_with<F>(lookup: F) -> ReleaseResult<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut layer = Self::default();
    for key in OptionKey::ALL {
      if let Some(raw) = lookup(&key.env_var())
        && !raw.is_empty()
      {
        layer.set(key, &raw)?;
      }
    }
    Ok(layer)
  }

  /// Parse a TOML or YAML config file, chosen by extension
  pub fn from_file(path: &Path) -> ReleaseResult<Self> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::FileLoad {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    let parsed: Result<OptionLayer, String> = match path.extension().and_then(|e| e.to_str()) {
      Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
      _ => toml_edit::de::from_str(&content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|reason| {
      ReleaseError::Config(ConfigError::FileLoad {
        path: path.to_path_buf(),
        reason,
      })
    })
  }

  fn set(&mut self, key: OptionKey, raw: &str) -> ReleaseResult<()> {
    let text = || Some(raw.to_string());
    let path = || Some(PathBuf::from(raw));
    match key {
      OptionKey::Owner => self.owner = text(),
      OptionKey::GitRepo => self.git_repo = text(),
      OptionKey::Token => self.token = text(),
      OptionKey::GitBaseUrl => self.git_base_url = text(),
      OptionKey::GitUploadUrl => self.git_upload_url = text(),
      OptionKey::PackagePath => self.package_path = path(),
      OptionKey::IndexPath => self.index_path = path(),
      OptionKey::PagesBranch => self.pages_branch = text(),
      OptionKey::Remote => self.remote = text(),
      OptionKey::Push => self.push = Some(parse_bool(key, raw)?),
      OptionKey::Pr => self.pr = Some(parse_bool(key, raw)?),
      OptionKey::Commit => self.commit = text(),
      OptionKey::ReleaseNameTemplate => self.release_name_template = text(),
      OptionKey::ReleaseNotesFile => self.release_notes_file = text(),
      OptionKey::GenerateReleaseNotes => self.generate_release_notes = Some(parse_bool(key, raw)?),
      OptionKey::MakeReleaseLatest => self.make_release_latest = Some(parse_bool(key, raw)?),
      OptionKey::SkipExisting => self.skip_existing = Some(parse_bool(key, raw)?),
      OptionKey::PackagesWithIndex => self.packages_with_index = Some(parse_bool(key, raw)?),
      OptionKey::Sign => self.sign = Some(parse_bool(key, raw)?),
      OptionKey::Key => self.key = text(),
      OptionKey::Keyring => self.keyring = path(),
      OptionKey::PassphraseFile => self.passphrase_file = path(),
    }
    Ok(())
  }

  /// Stack `self` on top of `lower`: values set here win
  pub fn or(self, lower: OptionLayer) -> OptionLayer {
    OptionLayer {
      owner: self.owner.or(lower.owner),
      git_repo: self.git_repo.or(lower.git_repo),
      token: self.token.or(lower.token),
      git_base_url: self.git_base_url.or(lower.git_base_url),
      git_upload_url: self.git_upload_url.or(lower.git_upload_url),
      package_path: self.package_path.or(lower.package_path),
      index_path: self.index_path.or(lower.index_path),
      pages_branch: self.pages_branch.or(lower.pages_branch),
      remote: self.remote.or(lower.remote),
      push: self.push.or(lower.push),
      pr: self.pr.or(lower.pr),
      commit: self.commit.or(lower.commit),
      release_name_template: self.release_name_template.or(lower.release_name_template),
      release_notes_file: self.release_notes_file.or(lower.release_notes_file),
      generate_release_notes: self.generate_release_notes.or(lower.generate_release_notes),
      make_release_latest: self.make_release_latest.or(lower.make_release_latest),
      skip_existing: self.skip_existing.or(lower.skip_existing),
      packages_with_index: self.packages_with_index.or(lower.packages_with_index),
      sign: self.sign.or(lower.sign),
      key: self.key.or(lower.key),
      keyring: self.keyring.or(lower.keyring),
      passphrase_file: self.passphrase_file.or(lower.passphrase_file),
    }
  }
}

fn parse_bool(key: OptionKey, raw: &str) -> ReleaseResult<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ReleaseError::Config(ConfigError::InvalidValue {
      key: key.as_str().to_string(),
      value: raw.to_string(),
    })),
  }
}

/// Fully resolved options shared by every command
#[derive(Debug, Clone)]
pub struct Options {
  pub owner: String,
  pub git_repo: String,
  pub token: String,
  pub git_base_url: String,
  pub git_upload_url: String,
  pub package_path: PathBuf,
  pub index_path: PathBuf,
  pub pages_branch: String,
  pub remote: String,
  pub push: bool,
  pub pr: bool,
  /// Target commitish for new releases (default: the repository's default branch)
  pub commit: Option<String>,
  pub release_name_template: String,
  /// File inside the chart archive to use as release notes
  pub release_notes_file: Option<String>,
  pub generate_release_notes: bool,
  pub make_release_latest: bool,
  pub skip_existing: bool,
  /// Host packages on the pages branch next to index.yaml
  pub packages_with_index: bool,
  pub sign: bool,
  pub key: Option<String>,
  pub keyring: Option<PathBuf>,
  pub passphrase_file: Option<PathBuf>,
}

impl Default for Options {
  fn default() -> Self {
    Self::from_layer(OptionLayer::default())
  }
}

impl Options {
  /// Resolve a merged layer against the built-in defaults
  pub fn from_layer(layer: OptionLayer) -> Self {
    Self {
      owner: layer.owner.unwrap_or_default(),
      git_repo: layer.git_repo.unwrap_or_default(),
      token: layer.token.unwrap_or_default(),
      git_base_url: layer.git_base_url.unwrap_or_else(|| DEFAULT_GIT_BASE_URL.to_string()),
      git_upload_url: layer.git_upload_url.unwrap_or_else(|| DEFAULT_GIT_UPLOAD_URL.to_string()),
      package_path: layer.package_path.unwrap_or_else(|| PathBuf::from(DEFAULT_PACKAGE_PATH)),
      index_path: layer.index_path.unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
      pages_branch: layer.pages_branch.unwrap_or_else(|| DEFAULT_PAGES_BRANCH.to_string()),
      remote: layer.remote.unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
      push: layer.push.unwrap_or(false),
      pr: layer.pr.unwrap_or(false),
      commit: layer.commit.filter(|c| !c.is_empty()),
      release_name_template: layer
        .release_name_template
        .unwrap_or_else(|| DEFAULT_RELEASE_NAME_TEMPLATE.to_string()),
      release_notes_file: layer.release_notes_file.filter(|f| !f.is_empty()),
      generate_release_notes: layer.generate_release_notes.unwrap_or(false),
      make_release_latest: layer.make_release_latest.unwrap_or(true),
      skip_existing: layer.skip_existing.unwrap_or(false),
      packages_with_index: layer.packages_with_index.unwrap_or(false),
      sign: layer.sign.unwrap_or(false),
      key: layer.key.filter(|k| !k.is_empty()),
      keyring: layer.keyring,
      passphrase_file: layer.passphrase_file,
    }
  }

  /// Load options for a command
  ///
  /// `flags` holds what was given on the command line. An explicit
  /// `config_file` must load; the default search locations may be absent.
  pub fn load(config_file: Option<&Path>, flags: OptionLayer, required: &[OptionKey]) -> ReleaseResult<Self> {
    let file_layer = match config_file {
      Some(path) => {
        let layer = OptionLayer::from_file(path)?;
        info!("Using config file: {}", path.display());
        layer
      }
      None => match find_config_file(&config_search_locations()) {
        Some(path) => match OptionLayer::from_file(&path) {
          Ok(layer) => {
            info!("Using config file: {}", path.display());
            layer
          }
          Err(e) => {
            debug!("Ignoring unreadable config file {}: {}", path.display(), e);
            OptionLayer::default()
          }
        },
        None => OptionLayer::default(),
      },
    };

    let merged = flags.or(OptionLayer::from_env()?).or(file_layer);
    Self::resolve(merged, required)
  }

  /// Validate and normalize a merged layer
  pub fn resolve(merged: OptionLayer, required: &[OptionKey]) -> ReleaseResult<Self> {
    let mut options = Self::from_layer(merged);
    options.validate(required)?;
    options.normalize_index_path()?;
    Ok(options)
  }

  /// Check required options and mutually exclusive flags
  pub fn validate(&self, required: &[OptionKey]) -> ReleaseResult<()> {
    for key in required {
      if !self.is_set(*key) {
        return Err(ReleaseError::Config(ConfigError::MissingOption {
          key: key.as_str().to_string(),
        }));
      }
    }

    if self.push && self.pr {
      return Err(ReleaseError::Config(ConfigError::MutuallyExclusive {
        first: OptionKey::Push.as_str().to_string(),
        second: OptionKey::Pr.as_str().to_string(),
      }));
    }

    Ok(())
  }

  /// Whether an option carries a usable value
  pub fn is_set(&self, key: OptionKey) -> bool {
    match key {
      OptionKey::Owner => !self.owner.is_empty(),
      OptionKey::GitRepo => !self.git_repo.is_empty(),
      OptionKey::Token => !self.token.is_empty(),
      OptionKey::GitBaseUrl => !self.git_base_url.is_empty(),
      OptionKey::GitUploadUrl => !self.git_upload_url.is_empty(),
      OptionKey::PackagePath => !self.package_path.as_os_str().is_empty(),
      OptionKey::IndexPath => !self.index_path.as_os_str().is_empty(),
      OptionKey::PagesBranch => !self.pages_branch.is_empty(),
      OptionKey::Remote => !self.remote.is_empty(),
      OptionKey::Push => self.push,
      OptionKey::Pr => self.pr,
      OptionKey::Commit => self.commit.is_some(),
      OptionKey::ReleaseNameTemplate => !self.release_name_template.is_empty(),
      OptionKey::ReleaseNotesFile => self.release_notes_file.is_some(),
      OptionKey::GenerateReleaseNotes => self.generate_release_notes,
      OptionKey::MakeReleaseLatest => self.make_release_latest,
      OptionKey::SkipExisting => self.skip_existing,
      OptionKey::PackagesWithIndex => self.packages_with_index,
      OptionKey::Sign => self.sign,
      OptionKey::Key => self.key.is_some(),
      OptionKey::Keyring => self.keyring.is_some(),
      OptionKey::PassphraseFile => self.passphrase_file.is_some(),
    }
  }

  /// Make `index_path` point at an `index.yaml` file
  ///
  /// A directory gets `index.yaml` appended; anything else is a usage error.
  pub fn normalize_index_path(&mut self) -> ReleaseResult<()> {
    if self.index_path.file_name().and_then(|n| n.to_str()) == Some(INDEX_FILE_NAME) {
      return Ok(());
    }

    if self.index_path.is_dir() {
      self.index_path = self.index_path.join(INDEX_FILE_NAME);
      return Ok(());
    }

    Err(ReleaseError::Config(ConfigError::IndexPath {
      path: self.index_path.clone(),
    }))
  }

  /// Whether the index (or packages) should be published from a worktree
  pub fn publishes_to_pages(&self) -> bool {
    self.push || self.pr
  }
}

/// Directories searched for a config file when `--config` is not given
pub fn config_search_locations() -> Vec<PathBuf> {
  let mut locations = vec![PathBuf::from(".")];
  if let Some(home) = dirs::home_dir() {
    locations.push(home.join(".cr"));
  }
  locations.push(PathBuf::from("/etc/cr"));
  locations
}

/// Find the first config file in the given directories
pub fn find_config_file(locations: &[PathBuf]) -> Option<PathBuf> {
  locations
    .iter()
    .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
    .find(|candidate| candidate.is_file())
}
