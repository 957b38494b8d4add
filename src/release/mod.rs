//! Release publishing and index reconciliation
//!
//! `Releaser` drives both workflows against a release repository and a
//! version control backend:
//!
//! - **create_releases** (`publish`): one GitHub release per packaged chart
//! - **update_index_file** (`reconcile`): add released charts to `index.yaml`
//!
//! Both may finish by publishing a commit to the pages branch, either by
//! pushing it directly or through a pull request from a scratch branch.

mod publish;
mod reconcile;
pub mod template;

pub use template::render_release_name;

use crate::core::config::Options;
use crate::core::error::ReleaseResult;
use crate::core::retry::RetryPolicy;
use crate::core::vcs::VersionControl;
use crate::github::{Release, ReleaseRepository};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::Rng;
use std::path::Path;

/// Prefix of branches opened for pull requests
const PR_BRANCH_PREFIX: &str = "chart-releaser-";
const PR_BRANCH_SUFFIX_LEN: usize = 16;

pub struct Releaser<'a> {
  options: &'a Options,
  repository: &'a dyn ReleaseRepository,
  vcs: &'a dyn VersionControl,
  rng: StdRng,
  retry: RetryPolicy,
}

impl<'a> Releaser<'a> {
  /// `rng` names pull request branches; seed it once per process
  pub fn new(
    options: &'a Options,
    repository: &'a dyn ReleaseRepository,
    vcs: &'a dyn VersionControl,
    rng: StdRng,
  ) -> Self {
    Self {
      options,
      repository,
      vcs,
      rng,
      retry: RetryPolicy::default(),
    }
  }

  #[cfg(test)]
  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// `<remote>/<pages-branch>`
  fn pages_ref(&self) -> String {
    format!("{}/{}", self.options.remote, self.options.pages_branch)
  }

  /// Release for `tag`, retrying transient failures
  fn lookup_release(&self, tag: &str) -> ReleaseResult<Option<Release>> {
    self
      .retry
      .run(&format!("get release {}", tag), || self.repository.get_release(tag))
  }

  /// Publish the commit checked out in `worktree` to the pages branch
  ///
  /// Does nothing unless push or pull request mode is configured.
  fn publish_worktree(&mut self, worktree: &Path, message: &str) -> ReleaseResult<()> {
    let options = self.options;
    if options.push {
      let url = self.vcs.get_push_url(&options.remote, &options.token)?;
      let refspec = format!("HEAD:refs/heads/{}", options.pages_branch);
      self.vcs.push(worktree, &[url.as_str(), refspec.as_str()])?;
      println!("✅ Pushed to {}", options.pages_branch);
    } else if options.pr {
      let branch = self.random_branch_name();
      let url = self.vcs.get_push_url(&options.remote, &options.token)?;
      let refspec = format!("HEAD:refs/heads/{}", branch);
      self.vcs.push(worktree, &[url.as_str(), refspec.as_str()])?;

      let pr_url = self
        .repository
        .create_pull_request(message, &branch, &options.pages_branch)?;
      println!("🔀 Opened pull request: {}", pr_url);
    }
    Ok(())
  }

  /// `chart-releaser-` followed by random lowercase alphanumerics
  fn random_branch_name(&mut self) -> String {
    let suffix: String = (&mut self.rng)
      .sample_iter(&Alphanumeric)
      .take(PR_BRANCH_SUFFIX_LEN)
      .map(|b| char::from(b).to_ascii_lowercase())
      .collect();
    format!("{}{}", PR_BRANCH_PREFIX, suffix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::vcs::fake::FakeGit;
  use crate::github::fake::FakeRepository;
  use rand::SeedableRng;

  #[test]
  fn test_random_branch_name() {
    let options = Options::default();
    let repo = FakeRepository::new();
    let git = FakeGit::new();
    let mut releaser = Releaser::new(&options, &repo, &git, StdRng::seed_from_u64(7));

    let first = releaser.random_branch_name();
    let second = releaser.random_branch_name();
    assert!(first.starts_with("chart-releaser-"));
    assert_eq!(first.len(), PR_BRANCH_PREFIX.len() + PR_BRANCH_SUFFIX_LEN);
    assert!(first[PR_BRANCH_PREFIX.len()..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    assert_ne!(first, second);
  }

  #[test]
  fn test_branch_names_follow_supplied_rng() {
    let options = Options::default();
    let repo = FakeRepository::new();
    let git = FakeGit::new();

    let mut first = Releaser::new(&options, &repo, &git, StdRng::seed_from_u64(42));
    let mut second = Releaser::new(&options, &repo, &git, StdRng::seed_from_u64(42));
    assert_eq!(first.random_branch_name(), second.random_branch_name());
  }

  #[test]
  fn test_publish_worktree_without_mode_is_noop() {
    let options = Options::default();
    let repo = FakeRepository::new();
    let git = FakeGit::new();
    let mut releaser = Releaser::new(&options, &repo, &git, StdRng::seed_from_u64(0));

    releaser.publish_worktree(Path::new("/tmp"), "Update index.yaml").unwrap();
    assert!(git.calls().is_empty());
    assert!(repo.pulls().is_empty());
  }

  #[test]
  fn test_publish_worktree_pull_request() {
    let options = Options {
      pr: true,
      token: "s3cret".to_string(),
      ..Options::default()
    };
    let repo = FakeRepository::new();
    let git = FakeGit::new();
    let mut releaser = Releaser::new(&options, &repo, &git, StdRng::seed_from_u64(1));

    releaser.publish_worktree(Path::new("/tmp"), "Update index.yaml").unwrap();

    let pulls = repo.pulls();
    assert_eq!(pulls.len(), 1);
    assert!(pulls[0].0.starts_with("chart-releaser-"));
    assert_eq!(pulls[0].1, "gh-pages");
    let push = git.calls().into_iter().find(|c| c.starts_with("push ")).unwrap();
    assert!(push.ends_with(&format!("HEAD:refs/heads/{}", pulls[0].0)));
  }
}
