use super::{current_repo, github_client};
use crate::core::config::{OptionKey, OptionLayer, Options};
use crate::core::error::ReleaseResult;
use crate::release::Releaser;
use rand::rngs::StdRng;
use std::path::Path;

/// Options `index` cannot run without
pub const REQUIRED: [OptionKey; 2] = [OptionKey::Owner, OptionKey::GitRepo];

/// Run the index command
pub fn run_index(config_file: Option<&Path>, flags: OptionLayer, rng: StdRng) -> ReleaseResult<()> {
  let options = Options::load(config_file, flags, &REQUIRED)?;

  let client = github_client(&options)?;
  let git = current_repo()?;

  println!(
    "🔍 Updating {} from releases of {}/{}",
    options.index_path.display(),
    options.owner,
    options.git_repo
  );
  let changed = Releaser::new(&options, &client, &git, rng).update_index_file()?;
  if changed && !options.publishes_to_pages() {
    println!("   Index written locally; use --push or --pr to publish it");
  }
  Ok(())
}
