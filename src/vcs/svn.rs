use std::path::Path;

use log::info;

use super::{command, ensure_parent, query, run, VcsCapability};
use crate::error::Result;
use crate::spec::ScmType;

/// Subversion working copies, driven through the system `svn` command.
///
/// A version is only meaningful to svn when it names a revision number
/// (`1234`, `r1234` or `-r1234`); any other version string is left to the
/// URI, which for standard layouts already names the trunk, branch or tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvnBackend;

const SCM: ScmType = ScmType::Svn;

/// Extracts the revision number from a version spec, if it is one.
pub fn revision_number(version: &str) -> Option<&str> {
    let version = version.trim();
    let digits = version
        .strip_prefix("-r")
        .or_else(|| version.strip_prefix('r'))
        .unwrap_or(version);
    (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())).then_some(digits)
}

impl VcsCapability for SvnBackend {
    fn scm_type(&self) -> ScmType {
        SCM
    }

    fn is_present(&self, path: &Path) -> bool {
        path.join(".svn").is_dir()
    }

    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()> {
        ensure_parent(path)?;
        info!("svn checkout {} {}", uri, path.display());
        let mut cmd = command(SCM, None);
        cmd.args(["checkout", "--quiet", "--non-interactive"]);
        if let Some(rev) = version.and_then(revision_number) {
            cmd.args(["-r", rev]);
        }
        cmd.arg(uri).arg(path);
        run(SCM, &mut cmd, "checkout", path).map(|_| ())
    }

    fn update(&self, path: &Path, version: Option<&str>) -> Result<()> {
        let mut cmd = command(SCM, Some(path));
        cmd.args(["update", "--quiet", "--non-interactive"]);
        if let Some(rev) = version.and_then(revision_number) {
            cmd.args(["-r", rev]);
        }
        run(SCM, &mut cmd, "update", path).map(|_| ())
    }

    fn current_uri(&self, path: &Path) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["info", "--show-item", "url"]),
            path,
        )
    }

    fn current_revision(&self, path: &Path) -> Option<String> {
        query(
            SCM,
            command(SCM, Some(path)).args(["info", "--show-item", "revision"]),
            path,
        )
    }

    fn has_local_modifications(&self, path: &Path) -> bool {
        query(SCM, command(SCM, Some(path)).args(["status", "--quiet"]), path).is_some()
    }

    fn diff(&self, path: &Path) -> Result<String> {
        run(SCM, command(SCM, Some(path)).arg("diff"), "diff", path)
    }

    fn resolve_revision(&self, _path: &Path, version: &str) -> Option<String> {
        revision_number(version).map(str::to_string)
    }
}
