use std::path::Path;

use log::info;

use super::{command, ensure_parent, query, run, VcsCapability};
use crate::error::Result;
use crate::spec::ScmType;

/// Git working copies, driven through the system `git` command.
///
/// Using the executable means SSH keys, credential helpers and anything
/// else configured in `~/.gitconfig` apply unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

const SCM: ScmType = ScmType::Git;

impl GitBackend {
    fn on_branch_with_upstream(&self, path: &Path) -> bool {
        query(
            SCM,
            command(SCM, Some(path)).args(["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"]),
            path,
        )
        .is_some()
    }
}

impl VcsCapability for GitBackend {
    fn scm_type(&self) -> ScmType {
        SCM
    }

    fn is_present(&self, path: &Path) -> bool {
        // `.git` is a file for worktrees and submodules
        path.join(".git").exists()
    }

    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()> {
        ensure_parent(path)?;
        info!("git clone {} {}", uri, path.display());
        run(
            SCM,
            command(SCM, None).args(["clone", "--quiet", uri]).arg(path),
            "clone",
            path,
        )?;
        if let Some(version) = version {
            run(
                SCM,
                command(SCM, Some(path)).args(["checkout", "--quiet", version]),
                "checkout",
                path,
            )?;
        }
        Ok(())
    }

    fn update(&self, path: &Path, version: Option<&str>) -> Result<()> {
        run(
            SCM,
            command(SCM, Some(path)).args(["fetch", "--quiet", "--tags", "origin"]),
            "fetch",
            path,
        )?;
        if let Some(version) = version {
            run(
                SCM,
                command(SCM, Some(path)).args(["checkout", "--quiet", version]),
                "checkout",
                path,
            )?;
        }
        // detached heads (tags, hashes) have nothing to fast-forward to
        if self.on_branch_with_upstream(path) {
            run(
                SCM,
                command(SCM, Some(path)).args(["merge", "--quiet", "--ff-only", "@{u}"]),
                "merge",
                path,
            )?;
        }
        Ok(())
    }

    fn current_uri(&self, path: &Path) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["config", "--get", "remote.origin.url"]),
            path,
        )
    }

    fn current_revision(&self, path: &Path) -> Option<String> {
        query(SCM, command(SCM, Some(path)).args(["rev-parse", "HEAD"]), path)
    }

    fn has_local_modifications(&self, path: &Path) -> bool {
        query(
            SCM,
            command(SCM, Some(path)).args(["status", "--porcelain", "--untracked-files=no"]),
            path,
        )
        .is_some()
    }

    fn diff(&self, path: &Path) -> Result<String> {
        run(
            SCM,
            command(SCM, Some(path)).args(["diff", "--no-color", "HEAD"]),
            "diff",
            path,
        )
    }

    fn resolve_revision(&self, path: &Path, version: &str) -> Option<String> {
        // a branch name means the last fetched remote tip; tags and hashes
        // resolve directly
        [format!("origin/{}^{{commit}}", version), format!("{}^{{commit}}", version)]
            .iter()
            .find_map(|rev| {
                query(
                    SCM,
                    command(SCM, Some(path)).args(["rev-parse", "--verify", "--quiet", rev]),
                    path,
                )
            })
    }
}
