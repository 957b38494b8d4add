use super::{Releaser, render_release_name};
use crate::chart::{self, ChartMetadata, list_packages, load_archive, provenance_path};
use crate::core::error::{ReleaseError, ReleaseResult, ResultExt};
use crate::core::vcs::ScratchWorktree;
use crate::github::ReleaseRequest;
use semver::Version;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

impl Releaser<'_> {
  /// Create one release per packaged chart in the package directory
  ///
  /// Fails with `NoPackagesFound` before any remote call when the directory
  /// holds no packages. Releases created before a failure stay published.
  pub fn create_releases(&mut self) -> ReleaseResult<()> {
    let options = self.options;
    let packages = list_packages(&options.package_path)?;

    for package in packages {
      let metadata =
        load_archive(&package).with_context(|| format!("failed to load chart {}", package.display()))?;
      let release_name = render_release_name(&options.release_name_template, &metadata)?;
      let notes = self.release_notes(&package, &metadata, &release_name)?;

      if options.skip_existing && self.lookup_release(&release_name)?.is_some() {
        println!("⏭️  Skipping {}: release already exists", release_name);
        continue;
      }

      let mut assets = vec![package.clone()];
      let provenance = provenance_path(&package);
      if provenance.is_file() {
        assets.push(provenance);
      }

      let request = ReleaseRequest {
        name: release_name.clone(),
        notes,
        commit: options.commit.clone(),
        assets,
        make_latest: options.make_release_latest,
      };
      self
        .repository
        .create_release(&request)
        .with_context(|| format!("failed to create release {}", release_name))?;
      println!("🚀 Released {}", release_name);

      if options.packages_with_index {
        self.publish_package(&package, &release_name)?;
      }
    }

    Ok(())
  }

  /// Body of the release for one chart
  ///
  /// A configured notes file read from the package wins, then generated
  /// notes (only for a version newer than every published one), then the
  /// chart description.
  fn release_notes(&self, package: &Path, metadata: &ChartMetadata, release_name: &str) -> ReleaseResult<String> {
    let options = self.options;

    if let Some(notes_file) = &options.release_notes_file {
      return match chart::read_archive_file(package, notes_file)? {
        Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        None => {
          warn!(
            "Release notes file {} not found in {}, using the chart description",
            notes_file,
            package.display()
          );
          Ok(metadata.description.clone())
        }
      };
    }

    if !options.generate_release_notes {
      return Ok(metadata.description.clone());
    }

    let prefix = format!("{}-", metadata.name);
    let latest = self
      .repository
      .get_latest_release(&prefix)
      .with_context(|| format!("failed to get latest release for {}", metadata.name))?;

    let previous_tag = match latest {
      Some(latest) => {
        let current = parse_version(&metadata.version)?;
        let published = parse_version(&latest.tag_name[prefix.len()..])?;
        if current <= published {
          debug!(
            "{} is not newer than {}, using the chart description",
            metadata.version, latest.tag_name
          );
          return Ok(metadata.description.clone());
        }
        Some(latest.tag_name)
      }
      None => None,
    };

    self
      .repository
      .generate_release_notes(release_name, previous_tag.as_deref(), options.commit.as_deref())
      .with_context(|| format!("failed to generate release notes for {}", release_name))
  }

  /// Commit `package` to the pages branch next to the index
  fn publish_package(&mut self, package: &Path, release_name: &str) -> ReleaseResult<()> {
    let vcs = self.vcs;
    let worktree = ScratchWorktree::acquire(vcs, &self.pages_ref())?;

    let file_name = package
      .file_name()
      .ok_or_else(|| ReleaseError::message(format!("invalid package path {}", package.display())))?;
    fs::copy(package, worktree.path().join(file_name))
      .with_context(|| format!("failed to copy {} into worktree", package.display()))?;

    let message = format!("Publishing chart package for {}", release_name);
    vcs.add(worktree.path(), &[Path::new(file_name)])?;
    vcs.commit(worktree.path(), &message)?;
    self.publish_worktree(worktree.path(), &message)
  }
}

fn parse_version(raw: &str) -> ReleaseResult<Version> {
  Version::parse(raw.trim_start_matches('v'))
    .map_err(|e| ReleaseError::message(format!("invalid chart version '{}': {}", raw, e)))
}
