//! In-memory release repository for tests

use super::{Asset, Release, ReleaseRepository, ReleaseRequest};
use crate::core::error::{ReleaseError, ReleaseResult};
use std::cell::{Cell, RefCell};

#[derive(Default)]
pub struct FakeRepository {
  releases: RefCell<Vec<Release>>,
  created: RefCell<Vec<ReleaseRequest>>,
  pulls: RefCell<Vec<(String, String)>>,
  notes_requests: RefCell<Vec<(String, Option<String>)>>,
  lookups: Cell<usize>,
  /// Number of upcoming `get_release` calls that fail
  failing_lookups: Cell<usize>,
  fail_create: Cell<bool>,
}

impl FakeRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an existing release whose assets are named `assets`
  pub fn add_release(&self, tag: &str, assets: &[&str]) {
    let mut releases = self.releases.borrow_mut();
    let id = releases.len() as u64 + 1;
    releases.push(Release {
      id,
      tag_name: tag.to_string(),
      assets: assets
        .iter()
        .map(|name| Asset {
          name: name.to_string(),
          url: format!("https://github.com/owner/repo/releases/download/{}/{}", tag, name),
        })
        .collect(),
    });
  }

  pub fn fail_next_lookups(&self, count: usize) {
    self.failing_lookups.set(count);
  }

  pub fn fail_create(&self) {
    self.fail_create.set(true);
  }

  pub fn created(&self) -> Vec<ReleaseRequest> {
    self.created.borrow().clone()
  }

  pub fn pulls(&self) -> Vec<(String, String)> {
    self.pulls.borrow().clone()
  }

  pub fn notes_requests(&self) -> Vec<(String, Option<String>)> {
    self.notes_requests.borrow().clone()
  }

  pub fn lookups(&self) -> usize {
    self.lookups.get()
  }
}

impl ReleaseRepository for FakeRepository {
  fn get_release(&self, tag: &str) -> ReleaseResult<Option<Release>> {
    self.lookups.set(self.lookups.get() + 1);
    let failing = self.failing_lookups.get();
    if failing > 0 {
      self.failing_lookups.set(failing - 1);
      return Err(ReleaseError::message("connection reset by peer"));
    }
    Ok(self.releases.borrow().iter().find(|r| r.tag_name == tag).cloned())
  }

  fn list_releases(&self) -> ReleaseResult<Vec<Release>> {
    Ok(self.releases.borrow().clone())
  }

  fn create_release(&self, request: &ReleaseRequest) -> ReleaseResult<Release> {
    if self.fail_create.get() {
      return Err(ReleaseError::message("create release: invalid status 422"));
    }
    self.created.borrow_mut().push(request.clone());
    let names: Vec<String> = request
      .assets
      .iter()
      .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
      .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    self.add_release(&request.name, &refs);
    Ok(self.releases.borrow().last().cloned().unwrap_or_default())
  }

  fn create_pull_request(&self, _title: &str, head: &str, base: &str) -> ReleaseResult<String> {
    self.pulls.borrow_mut().push((head.to_string(), base.to_string()));
    Ok(format!("https://github.com/owner/repo/pull/{}", self.pulls.borrow().len()))
  }

  fn generate_release_notes(
    &self,
    tag: &str,
    previous_tag: Option<&str>,
    _commit: Option<&str>,
  ) -> ReleaseResult<String> {
    self
      .notes_requests
      .borrow_mut()
      .push((tag.to_string(), previous_tag.map(str::to_string)));
    Ok(format!("Generated notes for {}", tag))
  }
}
