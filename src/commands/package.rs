use crate::chart::{PackageOptions, SignOptions, find_charts, package_chart};
use crate::core::config::{OptionKey, OptionLayer, Options};
use crate::core::error::{ConfigError, ReleaseResult};
use std::path::{Path, PathBuf};

/// Options `package` cannot run without
pub const REQUIRED: [OptionKey; 1] = [OptionKey::PackagePath];

/// Run the package command
pub fn run_package(
  config_file: Option<&Path>,
  flags: OptionLayer,
  paths: Vec<PathBuf>,
  recursive: bool,
) -> ReleaseResult<()> {
  let options = Options::load(config_file, flags, &REQUIRED)?;
  let package_options = package_options(&options)?;

  let paths = if paths.is_empty() {
    vec![PathBuf::from(".")]
  } else {
    paths
  };
  let charts = find_charts(&paths, recursive)?;

  for chart_dir in charts {
    let packaged = package_chart(&chart_dir, &package_options)?;
    println!(
      "📦 Packaged {} {} to {}",
      packaged.metadata.name,
      packaged.metadata.version,
      packaged.archive.display()
    );
    if let Some(provenance) = &packaged.provenance {
      println!("   Signed: {}", provenance.display());
    }
  }

  Ok(())
}

fn package_options(options: &Options) -> ReleaseResult<PackageOptions> {
  let sign = if options.sign {
    let key = options.key.clone().ok_or_else(|| ConfigError::MissingOption {
      key: OptionKey::Key.as_str().to_string(),
    })?;
    Some(SignOptions {
      key,
      keyring: options.keyring.clone(),
      passphrase_file: options.passphrase_file.clone(),
    })
  } else {
    None
  };

  Ok(PackageOptions {
    destination: options.package_path.clone(),
    sign,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ReleaseError;

  #[test]
  fn test_sign_requires_key() {
    let options = Options {
      sign: true,
      ..Options::default()
    };
    let err = package_options(&options).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::MissingOption { .. })));
    assert_eq!(err.to_string(), "'--key' is required");
  }

  #[test]
  fn test_unsigned_package_options() {
    let options = Options::default();
    let package = package_options(&options).unwrap();
    assert_eq!(package.destination, PathBuf::from(".cr-release-packages"));
    assert!(package.sign.is_none());
  }
}
