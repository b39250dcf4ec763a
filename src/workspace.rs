//! Locating the workspace a command operates on.

use std::path::{Path, PathBuf};

use log::debug;

use crate::defaults::{expand_home, CONFIG_FILENAME, PROGRAM_NAME};
use crate::error::{Error, Result};

/// Walks up from `start` to the nearest directory holding a workspace file.
pub fn discover(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILENAME).is_file())
        .map(Path::to_path_buf)
}

/// Resolves the workspace root.
///
/// An explicit target (from `-t` or the environment) wins and must exist;
/// otherwise the workspace is discovered from `cwd`.
pub fn locate(explicit: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    if let Some(target) = explicit {
        let target = cwd.join(expand_home(target.to_path_buf()));
        if !target.join(CONFIG_FILENAME).is_file() {
            return Err(Error::Config {
                message: format!("{} is not a workspace", target.display()),
                hint: Some(format!("No {} found in that directory", CONFIG_FILENAME)),
            });
        }
        debug!("using workspace {}", target.display());
        return Ok(target);
    }
    match discover(cwd) {
        Some(root) => {
            debug!("discovered workspace {}", root.display());
            Ok(root)
        }
        None => Err(Error::Config {
            message: format!(
                "no {} found in {} or any parent directory",
                CONFIG_FILENAME,
                cwd.display()
            ),
            hint: Some(format!(
                "Pass -t <workspace> or run '{} init' first",
                PROGRAM_NAME
            )),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_nearest_ancestor() {
        let temp = TempDir::new().unwrap();
        let outer = temp.path();
        let inner = outer.join("a");
        let deep = inner.join("b/c");
        fs::create_dir_all(&deep).unwrap();
        fs::write(outer.join(CONFIG_FILENAME), "[]").unwrap();
        fs::write(inner.join(CONFIG_FILENAME), "[]").unwrap();

        assert_eq!(discover(&deep), Some(inner.clone()));
        assert_eq!(discover(outer), Some(outer.to_path_buf()));
    }

    #[test]
    fn test_locate_explicit_target() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("ws")).unwrap();
        fs::write(temp.path().join("ws").join(CONFIG_FILENAME), "[]").unwrap();

        let root = locate(Some(Path::new("ws")), temp.path()).unwrap();
        assert_eq!(root, temp.path().join("ws"));

        let err = locate(Some(Path::new("nope")), temp.path()).unwrap_err();
        assert!(err.to_string().contains("is not a workspace"));
    }

    #[test]
    fn test_locate_without_workspace() {
        let temp = TempDir::new().unwrap();
        let err = locate(None, temp.path()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
