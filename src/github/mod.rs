//! Release repository: GitHub Releases and pull requests
//!
//! - **ReleaseRepository**: the operations the releaser needs from the host
//! - **GitHubClient**: REST implementation over `reqwest::blocking`

mod client;

#[cfg(test)]
pub mod fake;

pub use client::GitHubClient;

use crate::core::error::ReleaseResult;
use semver::Version;
use serde::Deserialize;
use std::path::PathBuf;

/// A published release as returned by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Release {
  pub id: u64,
  pub tag_name: String,
  #[serde(default)]
  pub assets: Vec<Asset>,
}

/// A file attached to a release
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Asset {
  pub name: String,
  #[serde(rename = "browser_download_url")]
  pub url: String,
}

/// Release to create, with local files to attach
#[derive(Debug, Clone)]
pub struct ReleaseRequest {
  /// Used as both the tag and the title
  pub name: String,
  pub notes: String,
  /// Commitish the tag is created from; the default branch when unset
  pub commit: Option<String>,
  pub assets: Vec<PathBuf>,
  pub make_latest: bool,
}

/// Capabilities of the remote release host
pub trait ReleaseRepository {
  /// Release for `tag`, or `None` when there is no such release
  fn get_release(&self, tag: &str) -> ReleaseResult<Option<Release>>;

  /// Every release of the repository, across all pages
  fn list_releases(&self) -> ReleaseResult<Vec<Release>>;

  /// Create a release and upload its assets
  fn create_release(&self, request: &ReleaseRequest) -> ReleaseResult<Release>;

  /// Open a pull request from `head` into `base`, returning its URL
  fn create_pull_request(&self, title: &str, head: &str, base: &str) -> ReleaseResult<String>;

  /// Release notes generated by the host for a tag that is about to be created
  fn generate_release_notes(&self, tag: &str, previous_tag: Option<&str>, commit: Option<&str>)
  -> ReleaseResult<String>;

  /// Release with the highest semantic version among tags `<prefix><version>`
  ///
  /// Tags whose suffix is not a semantic version are ignored.
  fn get_latest_release(&self, prefix: &str) -> ReleaseResult<Option<Release>> {
    let latest = self
      .list_releases()?
      .into_iter()
      .filter_map(|release| {
        let version = release
          .tag_name
          .strip_prefix(prefix)
          .and_then(|v| Version::parse(v.trim_start_matches('v')).ok())?;
        Some((version, release))
      })
      .max_by(|(a, _), (b, _)| a.cmp(b))
      .map(|(_, release)| release);
    Ok(latest)
  }
}
