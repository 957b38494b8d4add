use super::{Release, ReleaseRepository, ReleaseRequest};
use crate::core::error::{ConfigError, ReleaseError, ReleaseResult, RemoteError, ResultExt};
use crate::core::retry::RetryPolicy;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";

/// GitHub REST client scoped to one repository
pub struct GitHubClient {
  http: Client,
  owner: String,
  repo: String,
  api_url: Url,
  upload_url: Url,
  retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct CreateReleaseBody<'a> {
  tag_name: &'a str,
  name: &'a str,
  body: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  target_commitish: Option<&'a str>,
  make_latest: &'static str,
}

#[derive(Debug, Serialize)]
struct CreatePullBody<'a> {
  title: &'a str,
  head: &'a str,
  base: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerateNotesBody<'a> {
  tag_name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  previous_tag_name: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  target_commitish: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GeneratedNotes {
  body: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
  html_url: String,
}

impl GitHubClient {
  /// Build a client for `owner/repo`; an empty token sends anonymous requests
  pub fn new(owner: &str, repo: &str, token: &str, api_url: &str, upload_url: &str) -> ReleaseResult<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
    if !token.is_empty() {
      let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| ConfigError::InvalidValue {
        key: "token".to_string(),
        value: "<redacted>".to_string(),
      })?;
      auth.set_sensitive(true);
      headers.insert(AUTHORIZATION, auth);
    }
    headers.insert(
      USER_AGENT,
      HeaderValue::from_static(concat!("chart-releaser/", env!("CARGO_PKG_VERSION"))),
    );

    let http = Client::builder()
      .default_headers(headers)
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;

    Ok(Self {
      http,
      owner: owner.to_string(),
      repo: repo.to_string(),
      api_url: parse_base_url("git-base-url", api_url)?,
      upload_url: parse_base_url("git-upload-url", upload_url)?,
      retry: RetryPolicy::default(),
    })
  }

  /// `<base>repos/<owner>/<repo>/<path>`
  fn endpoint(&self, base: &Url, path: &str) -> ReleaseResult<Url> {
    let relative = format!("repos/{}/{}/{}", self.owner, self.repo, path);
    base.join(&relative).map_err(|e| {
      ReleaseError::message(format!("invalid API path '{}': {}", relative, e))
    })
  }

  fn send(&self, request: RequestBuilder) -> ReleaseResult<Response> {
    Ok(request.send()?)
  }

  fn upload_asset(&self, release_id: u64, path: &std::path::Path) -> ReleaseResult<()> {
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .ok_or_else(|| ReleaseError::message(format!("asset path has no file name: {}", path.display())))?;
    let bytes = fs::read(path).with_context(|| format!("failed to read asset {}", path.display()))?;

    let mut url = self.endpoint(&self.upload_url, &format!("releases/{}/assets", release_id))?;
    url.query_pairs_mut().append_pair("name", &file_name);

    self.retry.run(&format!("upload {}", file_name), || {
      debug!("POST {}", url);
      let response = self.send(
        self
          .http
          .post(url.clone())
          .header(CONTENT_TYPE, "application/octet-stream")
          .body(bytes.clone()),
      )?;
      expect_status(response, StatusCode::CREATED, "upload release asset")?;
      Ok(())
    })?;

    info!("Uploaded {}", file_name);
    Ok(())
  }
}

impl ReleaseRepository for GitHubClient {
  fn get_release(&self, tag: &str) -> ReleaseResult<Option<Release>> {
    let url = self.endpoint(&self.api_url, &format!("releases/tags/{}", tag))?;
    debug!("GET {}", url);
    let response = self.send(self.http.get(url))?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let response = expect_status(response, StatusCode::OK, "get release")?;
    Ok(Some(response.json()?))
  }

  fn list_releases(&self) -> ReleaseResult<Vec<Release>> {
    let mut releases = Vec::new();
    let mut page = 1;
    loop {
      let mut url = self.endpoint(&self.api_url, "releases")?;
      url
        .query_pairs_mut()
        .append_pair("per_page", &PER_PAGE.to_string())
        .append_pair("page", &page.to_string());
      debug!("GET {}", url);

      let response = expect_status(self.send(self.http.get(url))?, StatusCode::OK, "list releases")?;
      let batch: Vec<Release> = response.json()?;
      let done = batch.len() < PER_PAGE;
      releases.extend(batch);
      if done {
        return Ok(releases);
      }
      page += 1;
    }
  }

  fn create_release(&self, request: &ReleaseRequest) -> ReleaseResult<Release> {
    let url = self.endpoint(&self.api_url, "releases")?;
    let body = CreateReleaseBody {
      tag_name: &request.name,
      name: &request.name,
      body: &request.notes,
      target_commitish: request.commit.as_deref(),
      make_latest: if request.make_latest { "true" } else { "false" },
    };
    debug!("POST {}", url);

    let response = self.send(self.http.post(url).json(&body))?;
    let release: Release = expect_status(response, StatusCode::CREATED, "create release")?.json()?;

    for asset in &request.assets {
      self.upload_asset(release.id, asset)?;
    }

    Ok(release)
  }

  fn create_pull_request(&self, title: &str, head: &str, base: &str) -> ReleaseResult<String> {
    let url = self.endpoint(&self.api_url, "pulls")?;
    let body = CreatePullBody {
      title,
      head,
      base,
    };
    debug!("POST {}", url);

    let response = self.send(self.http.post(url).json(&body))?;
    let pull: PullRequest = expect_status(response, StatusCode::CREATED, "create pull request")?.json()?;
    Ok(pull.html_url)
  }

  fn generate_release_notes(
    &self,
    tag: &str,
    previous_tag: Option<&str>,
    commit: Option<&str>,
  ) -> ReleaseResult<String> {
    let url = self.endpoint(&self.api_url, "releases/generate-notes")?;
    let body = GenerateNotesBody {
      tag_name: tag,
      previous_tag_name: previous_tag,
      target_commitish: commit,
    };
    debug!("POST {}", url);

    let response = self.send(self.http.post(url).json(&body))?;
    let notes: GeneratedNotes = expect_status(response, StatusCode::OK, "generate release notes")?.json()?;
    Ok(notes.body)
  }
}

/// Parse a base URL, forcing a trailing slash so joins append to it
fn parse_base_url(key: &str, raw: &str) -> ReleaseResult<Url> {
  let normalized = if raw.ends_with('/') {
    raw.to_string()
  } else {
    format!("{}/", raw)
  };
  Url::parse(&normalized).map_err(|_| {
    ReleaseError::Config(ConfigError::InvalidValue {
      key: key.to_string(),
      value: raw.to_string(),
    })
  })
}

fn expect_status(response: Response, expected: StatusCode, operation: &str) -> ReleaseResult<Response> {
  if response.status() == expected {
    return Ok(response);
  }
  let status = response.status().as_u16();
  let body = response.text().unwrap_or_default();
  Err(ReleaseError::Remote(RemoteError::Status {
    operation: operation.to_string(),
    status,
    body,
  }))
}
