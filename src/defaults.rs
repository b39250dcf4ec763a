//! Default values for vcs-workspace.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the workspace configuration file at the workspace root.
pub const CONFIG_FILENAME: &str = ".vws.yaml";

/// Environment variable naming the workspace to operate on when `-t` is not
/// given.
pub const WORKSPACE_ENV: &str = "VWS_WORKSPACE";

/// Name of the command-line program, used in messages and the file header.
pub const PROGRAM_NAME: &str = "vws";

/// Parallel VCS operations when `-j` is not given (strictly sequential).
pub const DEFAULT_JOBS: usize = 1;

/// Comment block written at the top of every generated configuration file.
pub fn config_header() -> String {
    format!(
        "This file is maintained by {prog}.\n\
         Changes made with a text editor are kept, but comments are not.\n\
         Use '{prog} merge', '{prog} set' and '{prog} remove' to change it.",
        prog = PROGRAM_NAME
    )
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a tilde, or when the home directory cannot be determined,
/// are returned unchanged.
pub fn expand_home(path: PathBuf) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path;
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path,
    }
}
