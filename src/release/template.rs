//! Release name templates
//!
//! Templates interpolate chart metadata fields written as `{{ .Field }}`:
//! `Name`, `Version`, `AppVersion` and `Description`.

use crate::chart::ChartMetadata;
use crate::core::error::{PackageError, ReleaseResult};

/// Render `template` against the metadata of one chart
pub fn render_release_name(template: &str, metadata: &ChartMetadata) -> ReleaseResult<String> {
  let fail = |reason: String| PackageError::Template {
    template: template.to_string(),
    reason,
  };

  let mut out = String::with_capacity(template.len());
  let mut rest = template;
  while let Some(start) = rest.find("{{") {
    out.push_str(&rest[..start]);
    let after = &rest[start + 2..];
    let end = after.find("}}").ok_or_else(|| fail("unclosed action".to_string()))?;

    let action = after[..end].trim_matches(|c: char| c.is_whitespace() || c == '-');
    let field = action
      .strip_prefix('.')
      .ok_or_else(|| fail(format!("unsupported action '{}'", action)))?;

    let value = match field {
      "Name" => metadata.name.as_str(),
      "Version" => metadata.version.as_str(),
      "AppVersion" => metadata.app_version.as_deref().unwrap_or_default(),
      "Description" => metadata.description.as_str(),
      other => return Err(fail(format!("can't evaluate field {}", other)).into()),
    };
    out.push_str(value);
    rest = &after[end + 2..];
  }

  if rest.contains("}}") {
    return Err(fail("unexpected '}}'".to_string()).into());
  }
  out.push_str(rest);
  Ok(out)
}
