use std::path::Path;

use log::info;

use super::{command, ensure_parent, query, run, run_accepting, VcsCapability};
use crate::error::Result;
use crate::spec::ScmType;

/// Bazaar branches, driven through the system `bzr` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct BzrBackend;

const SCM: ScmType = ScmType::Bzr;

impl VcsCapability for BzrBackend {
    fn scm_type(&self) -> ScmType {
        SCM
    }

    fn is_present(&self, path: &Path) -> bool {
        path.join(".bzr").is_dir()
    }

    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()> {
        ensure_parent(path)?;
        info!("bzr branch {} {}", uri, path.display());
        let mut cmd = command(SCM, None);
        cmd.args(["branch", "--quiet"]);
        if let Some(version) = version {
            cmd.args(["-r", version]);
        }
        cmd.arg(uri).arg(path);
        run(SCM, &mut cmd, "branch", path).map(|_| ())
    }

    fn update(&self, path: &Path, version: Option<&str>) -> Result<()> {
        let mut cmd = command(SCM, Some(path));
        cmd.args(["pull", "--quiet"]);
        if let Some(version) = version {
            cmd.args(["-r", version]);
        }
        run(SCM, &mut cmd, "pull", path).map(|_| ())
    }

    fn current_uri(&self, path: &Path) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["config", "parent_location"]),
            path,
        )
    }

    fn current_revision(&self, path: &Path) -> Option<String> {
        query(SCM, command(SCM, Some(path)).arg("revno"), path)
    }

    fn has_local_modifications(&self, path: &Path) -> bool {
        query(
            SCM,
            command(SCM, Some(path)).args(["status", "--short", "--versioned"]),
            path,
        )
        .is_some()
    }

    fn diff(&self, path: &Path) -> Result<String> {
        // exit code 1 means "differences found"
        run_accepting(SCM, command(SCM, Some(path)).arg("diff"), "diff", path, &[0, 1])
    }

    fn resolve_revision(&self, path: &Path, version: &str) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["revno", "-r", version]),
            path,
        )
    }
}
