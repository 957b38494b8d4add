//! CLI commands for chart-releaser
//!
//! - **package**: Package chart directories into `.tgz` archives
//! - **upload**: Create a GitHub release for every packaged chart
//! - **index**: Add released charts to the repository index
//! - **version**: Print build information
//!
//! Commands receive the command-line layer of options and resolve the rest
//! (environment, config file, defaults) themselves.

pub mod index;
pub mod package;
pub mod upload;
pub mod version;

pub use index::run_index;
pub use package::run_package;
pub use upload::run_upload;
pub use version::run_version;

use crate::core::config::Options;
use crate::core::error::ReleaseResult;
use crate::core::vcs::SystemGit;
use crate::github::GitHubClient;

/// GitHub client for the configured repository
fn github_client(options: &Options) -> ReleaseResult<GitHubClient> {
  GitHubClient::new(
    &options.owner,
    &options.git_repo,
    &options.token,
    &options.git_base_url,
    &options.git_upload_url,
  )
}

/// Git backend for the repository in the current directory
fn current_repo() -> ReleaseResult<SystemGit> {
  Ok(SystemGit::open(&std::env::current_dir()?))
}
