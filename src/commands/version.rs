use crate::core::error::ReleaseResult;
use serde::Serialize;

/// Build information baked in at compile time
#[derive(Debug, Serialize)]
pub struct BuildInfo {
  pub version: &'static str,
  pub git_commit: &'static str,
  pub build_date: &'static str,
  pub platform: String,
}

impl BuildInfo {
  pub fn current() -> Self {
    Self {
      version: env!("CARGO_PKG_VERSION"),
      git_commit: option_env!("CR_GIT_COMMIT").unwrap_or("unknown"),
      build_date: option_env!("CR_BUILD_DATE").unwrap_or("unknown"),
      platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
    }
  }
}

/// Run the version command
pub fn run_version(json: bool) -> ReleaseResult<()> {
  let info = BuildInfo::current();
  if json {
    println!("{}", serde_json::to_string_pretty(&info)?);
    return Ok(());
  }

  println!("Version:\t{}", info.version);
  println!("Git Commit:\t{}", info.git_commit);
  println!("Build Date:\t{}", info.build_date);
  println!("Platform:\t{}", info.platform);
  Ok(())
}
