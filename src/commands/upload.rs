use super::{current_repo, github_client};
use crate::core::config::{OptionKey, OptionLayer, Options};
use crate::core::error::ReleaseResult;
use crate::release::Releaser;
use rand::rngs::StdRng;
use std::path::Path;

/// Options `upload` cannot run without
pub const REQUIRED: [OptionKey; 3] = [OptionKey::Owner, OptionKey::GitRepo, OptionKey::Token];

/// Run the upload command
pub fn run_upload(config_file: Option<&Path>, flags: OptionLayer, rng: StdRng) -> ReleaseResult<()> {
  let options = Options::load(config_file, flags, &REQUIRED)?;

  let client = github_client(&options)?;
  let git = current_repo()?;

  println!(
    "📦 Uploading charts from {} to {}/{}",
    options.package_path.display(),
    options.owner,
    options.git_repo
  );
  Releaser::new(&options, &client, &git, rng).create_releases()
}
