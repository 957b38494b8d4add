//! Core building blocks shared by every command
//!
//! - **config**: Layered options (flags, `CR_*` environment, config file, defaults)
//! - **error**: Error types with exit codes and contextual help messages
//! - **retry**: Fixed-delay retry for remote calls
//! - **vcs**: Git operations abstraction (SystemGit) and scratch worktrees

pub mod config;
pub mod error;
pub mod retry;
pub mod vcs;
