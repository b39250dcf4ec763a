use std::path::Path;

use log::info;

use super::{command, ensure_parent, query, run, VcsCapability};
use crate::error::Result;
use crate::spec::ScmType;

/// Mercurial working copies, driven through the system `hg` command.
#[derive(Debug, Default, Clone, Copy)]
pub struct HgBackend;

const SCM: ScmType = ScmType::Hg;

impl VcsCapability for HgBackend {
    fn scm_type(&self) -> ScmType {
        SCM
    }

    fn is_present(&self, path: &Path) -> bool {
        path.join(".hg").is_dir()
    }

    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()> {
        ensure_parent(path)?;
        info!("hg clone {} {}", uri, path.display());
        let mut cmd = command(SCM, None);
        cmd.args(["clone", "--quiet", "--noninteractive"]);
        if let Some(version) = version {
            cmd.args(["--updaterev", version]);
        }
        cmd.arg(uri).arg(path);
        run(SCM, &mut cmd, "clone", path).map(|_| ())
    }

    fn update(&self, path: &Path, version: Option<&str>) -> Result<()> {
        run(
            SCM,
            command(SCM, Some(path)).args(["pull", "--quiet", "--noninteractive"]),
            "pull",
            path,
        )?;
        let mut cmd = command(SCM, Some(path));
        cmd.args(["update", "--quiet", "--noninteractive"]);
        if let Some(version) = version {
            cmd.arg(version);
        }
        run(SCM, &mut cmd, "update", path).map(|_| ())
    }

    fn current_uri(&self, path: &Path) -> Option<String> {
        query(SCM, command(SCM, Some(path)).args(["paths", "default"]), path)
    }

    fn current_revision(&self, path: &Path) -> Option<String> {
        // `+` marks a dirty working directory
        query(
            SCM,
            command(SCM, Some(path)).args(["identify", "--id", "--debug"]),
            path,
        )
        .map(|id| id.trim_end_matches('+').to_string())
    }

    fn has_local_modifications(&self, path: &Path) -> bool {
        query(SCM, command(SCM, Some(path)).args(["status", "--quiet"]), path).is_some()
    }

    fn diff(&self, path: &Path) -> Result<String> {
        run(SCM, command(SCM, Some(path)).arg("diff"), "diff", path)
    }

    fn resolve_revision(&self, path: &Path, version: &str) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["log", "--rev", version, "--template", "{node}"]),
            path,
        )
    }
}
