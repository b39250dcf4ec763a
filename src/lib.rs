//! # VCS Workspace Library
//!
//! This library provides the core functionality for managing a workspace made
//! of many independently version-controlled source trees. It is designed to
//! be used by the `vws` command-line tool but can also be embedded in other
//! applications that need to check out, update or inspect such workspaces.
//!
//! ## Quick Example
//!
//! ```
//! use vcs_workspace::config::WorkspaceConfig;
//! use vcs_workspace::persist;
//! use vcs_workspace::vcs::Backends;
//!
//! let yaml = r#"
//! - git:
//!     local-name: core
//!     uri: https://example.com/core.git
//!     version: main
//! - other:
//!     local-name: notes
//! "#;
//!
//! let specs = persist::parse(yaml).unwrap();
//! let config = WorkspaceConfig::from_specs("/ws", Backends::system(), specs).unwrap();
//!
//! assert_eq!(config.len(), 2);
//! assert_eq!(config.get("core").unwrap().abs_path().to_str(), Some("/ws/core"));
//! assert!(config.validate_vcs_only().is_err());
//! ```
//!
//! ## Core Concepts
//!
//! - **Declarations (`spec`)**: a `VersionedPathSpec` names one element of the
//!   workspace, where it lives, which VCS manages it and at which version.
//! - **Configuration (`config`)**: the ordered, validated element list with
//!   its merge rules. Local names and paths are unique.
//! - **Backends (`vcs`)**: the `VcsCapability` trait and the command-line
//!   adapters for git, svn, hg and bzr.
//! - **Persistence (`persist`, `workspace`)**: the `.vws.yaml` file format and
//!   finding the workspace a command applies to.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: the configuration file is read and every element is bound to
//!     its absolute path and backend.
//! 2.  **Reconcile** (`reconcile`): missing elements are checked out and
//!     existing ones updated, in parallel on a bounded `pool`.
//! 3.  **Inspect** (`status`): elements are classified against their
//!     declaration, projected into fields, snapshotted or diffed.
//!
//! `init` combines loading a seed, writing the configuration and reconciling
//! into a single operation.

pub mod config;
pub mod defaults;
pub mod error;
pub mod init;
pub mod output;
pub mod persist;
pub mod pool;
pub mod reconcile;
pub mod spec;
pub mod status;
pub mod suggestions;
pub mod vcs;
pub mod workspace;

#[cfg(test)]
mod config_proptest;
#[cfg(test)]
mod test_support;
