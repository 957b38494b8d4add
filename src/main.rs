mod chart;
mod commands;
mod core;
mod github;
mod index;
mod release;

use clap::{Args, Parser, Subcommand};
use core::config::OptionLayer;
use core::error::{ReleaseError, print_error};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Host Helm chart repositories on GitHub Releases and Pages
#[derive(Parser)]
#[command(name = "cr")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Config file (default: cr.toml, cr.yaml or cr.yml in ., ~/.cr or /etc/cr)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Package Helm charts
  Package {
    /// Chart directories to package (default: .)
    paths: Vec<PathBuf>,
    /// Package every chart found below the given paths
    #[arg(long)]
    recursive: bool,
    #[command(flatten)]
    package: PackageArgs,
  },

  /// Upload Helm chart packages to GitHub Releases
  Upload {
    #[command(flatten)]
    repo: RepoArgs,
    #[command(flatten)]
    pages: PagesArgs,
    #[command(flatten)]
    release: ReleaseArgs,
  },

  /// Update a Helm chart repository index.yaml from GitHub releases
  #[command(visible_alias = "update-index")]
  Index {
    #[command(flatten)]
    repo: RepoArgs,
    #[command(flatten)]
    pages: PagesArgs,
    /// Path to the index file or its directory
    #[arg(short = 'i', long)]
    index_path: Option<PathBuf>,
    /// Path to directory with chart packages
    #[arg(short = 'p', long)]
    package_path: Option<PathBuf>,
    /// Template for release names, rendered against Chart.yaml
    #[arg(long)]
    release_name_template: Option<String>,
    /// Host packages in the pages branch next to index.yaml
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    packages_with_index: Option<bool>,
  },

  /// Print version information
  Version {
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },
}

/// GitHub repository and credentials
#[derive(Args)]
struct RepoArgs {
  /// GitHub username or organization
  #[arg(short = 'o', long)]
  owner: Option<String>,
  /// GitHub repository
  #[arg(short = 'r', long)]
  git_repo: Option<String>,
  /// GitHub auth token
  #[arg(short = 't', long)]
  token: Option<String>,
  /// GitHub API base URL
  #[arg(short = 'b', long)]
  git_base_url: Option<String>,
  /// GitHub upload URL
  #[arg(short = 'u', long)]
  git_upload_url: Option<String>,
}

/// Publishing to the pages branch
#[derive(Args)]
struct PagesArgs {
  /// Branch serving the chart repository
  #[arg(long)]
  pages_branch: Option<String>,
  /// Git remote of the pages branch
  #[arg(long)]
  remote: Option<String>,
  /// Push the change to the pages branch
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  push: Option<bool>,
  /// Open a pull request against the pages branch
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  pr: Option<bool>,
}

/// How releases are created
#[derive(Args)]
struct ReleaseArgs {
  /// Path to directory with chart packages
  #[arg(short = 'p', long)]
  package_path: Option<PathBuf>,
  /// Target commit for the release tag
  #[arg(short = 'c', long)]
  commit: Option<String>,
  /// Template for release names, rendered against Chart.yaml
  #[arg(long)]
  release_name_template: Option<String>,
  /// Chart file used as the release notes
  #[arg(long)]
  release_notes_file: Option<String>,
  /// Let GitHub generate release notes
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  generate_release_notes: Option<bool>,
  /// Mark the created release as latest
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  make_release_latest: Option<bool>,
  /// Skip charts that already have a release
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  skip_existing: Option<bool>,
  /// Also commit packages to the pages branch
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  packages_with_index: Option<bool>,
}

/// Package destination and signing
#[derive(Args)]
struct PackageArgs {
  /// Destination directory for packages
  #[arg(short = 'p', long)]
  package_path: Option<PathBuf>,
  /// Write a provenance file signed with gpg
  #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
  sign: Option<bool>,
  /// Name of the signing key
  #[arg(long)]
  key: Option<String>,
  /// Keyring containing the signing key
  #[arg(long)]
  keyring: Option<PathBuf>,
  /// File holding the key passphrase
  #[arg(long)]
  passphrase_file: Option<PathBuf>,
}

impl RepoArgs {
  fn apply(self, layer: &mut OptionLayer) {
    layer.owner = self.owner;
    layer.git_repo = self.git_repo;
    layer.token = self.token;
    layer.git_base_url = self.git_base_url;
    layer.git_upload_url = self.git_upload_url;
  }
}

impl PagesArgs {
  fn apply(self, layer: &mut OptionLayer) {
    layer.pages_branch = self.pages_branch;
    layer.remote = self.remote;
    layer.push = self.push;
    layer.pr = self.pr;
  }
}

impl ReleaseArgs {
  fn apply(self, layer: &mut OptionLayer) {
    layer.package_path = self.package_path;
    layer.commit = self.commit;
    layer.release_name_template = self.release_name_template;
    layer.release_notes_file = self.release_notes_file;
    layer.generate_release_notes = self.generate_release_notes;
    layer.make_release_latest = self.make_release_latest;
    layer.skip_existing = self.skip_existing;
    layer.packages_with_index = self.packages_with_index;
  }
}

impl PackageArgs {
  fn apply(self, layer: &mut OptionLayer) {
    layer.package_path = self.package_path;
    layer.sign = self.sign;
    layer.key = self.key;
    layer.keyring = self.keyring;
    layer.passphrase_file = self.passphrase_file;
  }
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

/// Logs go to stderr; `CR_LOG` overrides the verbosity flags
fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => "warn",
    1 => "info",
    _ => "debug",
  };
  let filter = EnvFilter::try_from_env("CR_LOG").unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = cli.config.as_deref();
  let mut flags = OptionLayer::default();
  let rng = StdRng::from_entropy();

  let result = match cli.command {
    Commands::Package {
      paths,
      recursive,
      package,
    } => {
      package.apply(&mut flags);
      commands::run_package(config, flags, paths, recursive)
    }
    Commands::Upload { repo, pages, release } => {
      repo.apply(&mut flags);
      pages.apply(&mut flags);
      release.apply(&mut flags);
      commands::run_upload(config, flags, rng)
    }
    Commands::Index {
      repo,
      pages,
      index_path,
      package_path,
      release_name_template,
      packages_with_index,
    } => {
      repo.apply(&mut flags);
      pages.apply(&mut flags);
      flags.index_path = index_path;
      flags.package_path = package_path;
      flags.release_name_template = release_name_template;
      flags.packages_with_index = packages_with_index;
      commands::run_index(config, flags, rng)
    }
    Commands::Version { json } => commands::run_version(json),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
