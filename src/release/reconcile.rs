use super::{Releaser, render_release_name};
use crate::chart::{ARCHIVE_EXT, list_packages, load_archive};
use crate::core::config::INDEX_FILE_NAME;
use crate::core::error::{ReleaseResult, ResultExt};
use crate::core::vcs::ScratchWorktree;
use crate::github::Asset;
use crate::index::{IndexFile, split_package_name_and_version};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const INDEX_COMMIT_MESSAGE: &str = "Update index.yaml";

impl Releaser<'_> {
  /// Add every released package missing from the index, returning whether
  /// the index changed
  ///
  /// The index is read from the pages branch and written to the configured
  /// index path. With push or pull request mode the new index is also
  /// committed to the pages branch.
  pub fn update_index_file(&mut self) -> ReleaseResult<bool> {
    let options = self.options;
    let vcs = self.vcs;
    let worktree = ScratchWorktree::acquire(vcs, &self.pages_ref())?;

    let worktree_index = worktree.path().join(INDEX_FILE_NAME);
    let mut index = IndexFile::load_or_new(&worktree_index)?;
    let packages = list_packages(&options.package_path)?;

    let mut changed = false;
    for package in packages {
      let metadata =
        load_archive(&package).with_context(|| format!("failed to load chart {}", package.display()))?;
      let release_name = render_release_name(&options.release_name_template, &metadata)?;

      let Some(release) = self.lookup_release(&release_name)? else {
        warn!("No release found for {}, skipping", release_name);
        continue;
      };

      match release.assets.iter().find(|a| a.name.ends_with(ARCHIVE_EXT)) {
        Some(asset) => {
          if self.add_to_index(&mut index, asset)? {
            changed = true;
          }
        }
        None => warn!("Release {} has no chart package attached", release_name),
      }
    }

    if !changed {
      println!("✅ Index {} did not change", options.index_path.display());
      return Ok(false);
    }

    index.sort_entries();
    index
      .write(&options.index_path)
      .with_context(|| format!("failed to write {}", options.index_path.display()))?;
    println!("📝 Updated {}", options.index_path.display());

    if options.publishes_to_pages() {
      vcs.pull(worktree.path(), &[options.remote.as_str(), options.pages_branch.as_str()])?;
      fs::copy(&options.index_path, &worktree_index)
        .with_context(|| format!("failed to copy {} into worktree", options.index_path.display()))?;
      vcs.add(worktree.path(), &[Path::new(INDEX_FILE_NAME)])?;
      vcs.commit(worktree.path(), INDEX_COMMIT_MESSAGE)?;
      self.publish_worktree(worktree.path(), INDEX_COMMIT_MESSAGE)?;
    }

    Ok(true)
  }

  /// Add the package behind `asset` unless its name and version are indexed
  fn add_to_index(&self, index: &mut IndexFile, asset: &Asset) -> ReleaseResult<bool> {
    let (name, version) = split_package_name_and_version(&asset.name)?;
    if index.has(&name, &version) {
      debug!("{} {} is already indexed", name, version);
      return Ok(false);
    }

    let local = self.options.package_path.join(&asset.name);
    let metadata = load_archive(&local).with_context(|| format!("failed to load chart {}", local.display()))?;
    let digest = crate::chart::digest_file(&local)?;
    let url = if self.options.packages_with_index {
      asset.name.clone()
    } else {
      asset.url.clone()
    };

    info!("Adding {} {} to index", name, version);
    index.add(metadata, url, digest);
    Ok(true)
  }
}
