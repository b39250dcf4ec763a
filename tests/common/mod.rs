//! Shared test utilities for E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::TWO_GIT);
//!     fixture.command().arg("status").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;

/// Re-export commonly used test dependencies for convenience. Not every
/// test target uses every item.
#[allow(unused_imports)]
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::configs;
    pub use super::{git_available, init_git_repo};
    pub use super::TestFixture;
}

/// Name of the workspace file.
pub const CONFIG_FILE: &str = ".vws.yaml";

/// Common workspace files for testing.
#[allow(dead_code)]
pub mod configs {
    /// Two git elements, neither checked out.
    pub const TWO_GIT: &str = r#"
- git:
    local-name: core
    uri: https://example.com/core.git
    version: main
- git:
    local-name: tools
    path: src/tools
    uri: https://example.com/tools.git
"#;

    /// A git element, an svn element pinned to a revision, and a plain
    /// directory.
    pub const MIXED: &str = r#"
- git: {local-name: core, uri: https://example.com/core.git, version: main}
- svn: {local-name: legacy, uri: https://svn.example.com/legacy/trunk, version: "1234"}
- other: {local-name: notes}
"#;

    /// A workspace without elements.
    pub const EMPTY: &str = "# vws workspace\n[]\n";

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "- git: {local-name: [unclosed";
}

/// Whether a `git` executable is available.
#[allow(dead_code)]
pub fn git_available() -> bool {
    StdCommand::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Creates a git repository at `path` with one commit and returns the hash
/// of that commit.
#[allow(dead_code)]
pub fn init_git_repo(path: &Path) -> String {
    std::fs::create_dir_all(path).expect("Failed to create repository directory");
    let git = |args: &[&str]| {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(path)
            .env("GIT_AUTHOR_NAME", "vws")
            .env("GIT_AUTHOR_EMAIL", "vws@example.com")
            .env("GIT_COMMITTER_NAME", "vws")
            .env("GIT_COMMITTER_EMAIL", "vws@example.com")
            .output()
            .expect("Failed to run git");
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };
    git(&["init", "-q", "-b", "main"]);
    std::fs::write(path.join("README.md"), "hello\n").expect("Failed to write file");
    git(&["add", "README.md"]);
    git(&["commit", "-q", "-m", "initial"]);
    git(&["rev-parse", "HEAD"])
}

/// A test fixture that provides a temporary workspace directory.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().with_config(configs::TWO_GIT);
///
/// fixture.command().arg("info").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.vws.yaml` workspace file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child(CONFIG_FILE)
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Add a file with the given path and content.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an empty directory.
    #[allow(dead_code)]
    pub fn with_dir(self, path: &str) -> Self {
        self.temp_dir
            .child(path)
            .create_dir_all()
            .expect("Failed to create directory");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the workspace file.
    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join(CONFIG_FILE)
    }

    /// The current content of the workspace file.
    #[allow(dead_code)]
    pub fn config_content(&self) -> String {
        std::fs::read_to_string(self.config_path()).expect("Failed to read config file")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command running in this fixture's directory, without color
    /// and unaffected by the caller's `VWS_WORKSPACE`.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vws");
        cmd.current_dir(self.path())
            .env_remove("VWS_WORKSPACE")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_config() {
        let fixture = TestFixture::new().with_config(configs::EMPTY);
        assert!(fixture.config_path().exists());
    }

    #[test]
    fn test_configs_are_valid_yaml() {
        for config in [configs::TWO_GIT, configs::MIXED, configs::EMPTY] {
            serde_yaml::from_str::<serde_yaml::Value>(config).expect("Config should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(configs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
