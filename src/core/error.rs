//! Error types for chart-releaser with contextual messages and exit codes
//!
//! A single error type categorizes every failure the CLI can hit. Each category
//! maps to an exit code, and most carry a help line pointing at the fix.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for chart-releaser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, missing files)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Data error (invalid package, template)
  Data = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for chart-releaser
#[derive(Debug)]
pub enum ReleaseError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Release repository (GitHub API) errors
  Remote(RemoteError),

  /// Chart package and template errors
  Package(PackageError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ReleaseError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    ReleaseError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Categorized errors keep their category, help line and exit code; the
  /// context becomes a prefix of the rendered message.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ReleaseError::Message { message, context, help } => ReleaseError::Message {
        message: ctx_str,
        context: Some(context.map(|c| format!("{}: {}", message, c)).unwrap_or(message)),
        help,
      },
      ReleaseError::Config(_) => self,
      other => wrap_with_context(other, ctx_str),
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ReleaseError::Config(_) => ExitCode::User,
      ReleaseError::Git(_) => ExitCode::System,
      ReleaseError::Remote(_) => ExitCode::System,
      ReleaseError::Package(PackageError::NoPackagesFound { .. }) => ExitCode::User,
      ReleaseError::Package(_) => ExitCode::Data,
      ReleaseError::Io(_) => ExitCode::System,
      ReleaseError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ReleaseError::Config(e) => e.help_message(),
      ReleaseError::Git(e) => e.help_message(),
      ReleaseError::Remote(e) => e.help_message(),
      ReleaseError::Package(e) => e.help_message(),
      ReleaseError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

/// Keeps the category of an error while prefixing it with context
fn wrap_with_context(err: ReleaseError, ctx: String) -> ReleaseError {
  match err {
    ReleaseError::Git(e) => ReleaseError::Git(GitError::Context {
      context: ctx,
      source: Box::new(e),
    }),
    ReleaseError::Remote(e) => ReleaseError::Remote(RemoteError::Context {
      context: ctx,
      source: Box::new(e),
    }),
    ReleaseError::Package(e) => ReleaseError::Package(PackageError::Context {
      context: ctx,
      source: Box::new(e),
    }),
    ReleaseError::Io(e) => ReleaseError::Message {
      message: ctx,
      context: Some(format!("I/O error: {}", e)),
      help: None,
    },
    other => other,
  }
}

impl fmt::Display for ReleaseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReleaseError::Config(e) => write!(f, "{}", e),
      ReleaseError::Git(e) => write!(f, "{}", e),
      ReleaseError::Remote(e) => write!(f, "{}", e),
      ReleaseError::Package(e) => write!(f, "{}", e),
      ReleaseError::Io(e) => write!(f, "I/O error: {}", e),
      ReleaseError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, ": {}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ReleaseError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ReleaseError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ReleaseError {
  fn from(err: io::Error) -> Self {
    ReleaseError::Io(err)
  }
}

impl From<String> for ReleaseError {
  fn from(msg: String) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<&str> for ReleaseError {
  fn from(msg: &str) -> Self {
    ReleaseError::message(msg)
  }
}

impl From<ConfigError> for ReleaseError {
  fn from(err: ConfigError) -> Self {
    ReleaseError::Config(err)
  }
}

impl From<GitError> for ReleaseError {
  fn from(err: GitError) -> Self {
    ReleaseError::Git(err)
  }
}

impl From<RemoteError> for ReleaseError {
  fn from(err: RemoteError) -> Self {
    ReleaseError::Remote(err)
  }
}

impl From<PackageError> for ReleaseError {
  fn from(err: PackageError) -> Self {
    ReleaseError::Package(err)
  }
}

impl From<toml_edit::de::Error> for ReleaseError {
  fn from(err: toml_edit::de::Error) -> Self {
    ReleaseError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_yaml::Error> for ReleaseError {
  fn from(err: serde_yaml::Error) -> Self {
    ReleaseError::message(format!("YAML error: {}", err))
  }
}

impl From<serde_json::Error> for ReleaseError {
  fn from(err: serde_json::Error) -> Self {
    ReleaseError::message(format!("JSON error: {}", err))
  }
}

impl From<reqwest::Error> for ReleaseError {
  fn from(err: reqwest::Error) -> Self {
    ReleaseError::Remote(RemoteError::Http {
      message: err.to_string(),
    })
  }
}

impl From<glob::PatternError> for ReleaseError {
  fn from(err: glob::PatternError) -> Self {
    ReleaseError::message(format!("Invalid glob pattern: {}", err))
  }
}

impl From<glob::GlobError> for ReleaseError {
  fn from(err: glob::GlobError) -> Self {
    ReleaseError::message(format!("Failed to read glob match: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ReleaseError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ReleaseError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Explicitly requested config file could not be loaded
  FileLoad { path: PathBuf, reason: String },

  /// Missing required option
  MissingOption { key: String },

  /// Two options that cannot be combined were both set
  MutuallyExclusive { first: String, second: String },

  /// Option value could not be parsed
  InvalidValue { key: String, value: String },

  /// Index path is neither a directory nor an index.yaml file
  IndexPath { path: PathBuf },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingOption { key } => Some(format!(
        "Pass --{} or set CR_{} in the environment or in cr.toml",
        key,
        key.to_uppercase().replace('-', "_")
      )),
      ConfigError::MutuallyExclusive { .. } => Some("Choose either --push or --pr, not both.".to_string()),
      ConfigError::IndexPath { .. } => Some("Point --index-path at a directory or at an index.yaml file.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::FileLoad { path, reason } => {
        write!(f, "Error loading config file {}: {}", path.display(), reason)
      }
      ConfigError::MissingOption { key } => write!(f, "'--{}' is required", key),
      ConfigError::MutuallyExclusive { first, second } => {
        write!(f, "'--{}' and '--{}' are mutually exclusive", first, second)
      }
      ConfigError::InvalidValue { key, value } => {
        write!(f, "Invalid value '{}' for '{}'", value, key)
      }
      ConfigError::IndexPath { path } => write!(
        f,
        "path ({}) should be a directory or a file called index.yaml",
        path.display()
      ),
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Push failed
  PushFailed { branch: String, reason: String },

  /// Git error with operation context
  Context { context: String, source: Box<GitError> },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") || reason.contains("rejected") {
          Some("The pages branch moved while this run was in progress. Re-run to pick up the latest state.".to_string())
        } else if reason.contains("403") || reason.contains("Authentication failed") {
          Some("Check that the token has write access to the repository.".to_string())
        } else {
          None
        }
      }
      GitError::CommandFailed { stderr, .. } if stderr.contains("invalid reference") => {
        Some("Fetch the pages branch first, e.g. `git fetch origin gh-pages`.".to_string())
      }
      GitError::Context { source, .. } => source.help_message(),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr.trim_end())
      }
      GitError::PushFailed { branch, reason } => {
        write!(f, "Push to {} failed: {}", branch, reason.trim_end())
      }
      GitError::Context { context, source } => write!(f, "{}: {}", context, source),
    }
  }
}

/// Release repository errors
#[derive(Debug)]
pub enum RemoteError {
  /// Transport-level failure
  Http { message: String },

  /// Unexpected HTTP status from the API
  Status { operation: String, status: u16, body: String },

  /// Remote error with operation context
  Context { context: String, source: Box<RemoteError> },
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self {
      RemoteError::Status { status: 401, .. } => Some("The GitHub token is missing or invalid.".to_string()),
      RemoteError::Status { status: 404, .. } => {
        Some("Check --owner and --git-repo, and that the token can see the repository.".to_string())
      }
      RemoteError::Status { status: 422, .. } => {
        Some("The release or asset probably exists already. Use --skip-existing to ignore published charts.".to_string())
      }
      RemoteError::Context { source, .. } => source.help_message(),
      _ => None,
    }
  }
}

impl fmt::Display for RemoteError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RemoteError::Http { message } => write!(f, "HTTP request failed: {}", message),
      RemoteError::Status {
        operation,
        status,
        body,
      } => {
        write!(f, "{}: invalid status {}", operation, status)?;
        if !body.is_empty() {
          write!(f, "\n{}", body)?;
        }
        Ok(())
      }
      RemoteError::Context { context, source } => write!(f, "{}: {}", context, source),
    }
  }
}

/// Chart package errors
#[derive(Debug)]
pub enum PackageError {
  /// Package directory yielded zero archives
  NoPackagesFound { path: PathBuf },

  /// File is not a valid chart archive
  InvalidChart { path: PathBuf, reason: String },

  /// Release name template could not be rendered
  Template { template: String, reason: String },

  /// File name does not follow `<name>-<version>`
  InvalidFileName { name: String },

  /// Package error with operation context
  Context { context: String, source: Box<PackageError> },
}

impl PackageError {
  fn help_message(&self) -> Option<String> {
    match self {
      PackageError::NoPackagesFound { .. } => {
        Some("Run `cr package <chart-dir>` first, or point --package-path at the packaged charts.".to_string())
      }
      PackageError::Template { .. } => Some(
        "Templates may reference {{ .Name }}, {{ .Version }}, {{ .AppVersion }} and {{ .Description }}.".to_string(),
      ),
      PackageError::Context { source, .. } => source.help_message(),
      _ => None,
    }
  }
}

impl fmt::Display for PackageError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PackageError::NoPackagesFound { path } => write!(f, "no charts found at {}", path.display()),
      PackageError::InvalidChart { path, reason } => {
        write!(f, "{} is not a valid chart package: {}", path.display(), reason)
      }
      PackageError::Template { template, reason } => {
        write!(f, "failed to render release name template '{}': {}", template, reason)
      }
      PackageError::InvalidFileName { name } => {
        write!(f, "'{}' does not match <name>-<version>", name)
      }
      PackageError::Context { context, source } => write!(f, "{}: {}", context, source),
    }
  }
}

/// Result type alias for chart-releaser
pub type ReleaseResult<T> = Result<T, ReleaseError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ReleaseError>,
{
  fn context(self, ctx: impl Into<String>) -> ReleaseResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ReleaseResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ReleaseError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
