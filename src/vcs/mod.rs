//! # Version Control Backends
//!
//! The reconciliation engine never talks to a version-control system
//! directly. Every element is bound to a `VcsCapability`, a stateless strategy
//! object that knows how to check out, update and inspect one kind of
//! working copy. This keeps the engine independent of protocol details and
//! lets tests substitute mock capabilities.
//!
//! ## Design
//!
//! - **`VcsCapability`**: the operation set the engine needs from a backend.
//! - **`Backends`**: a registry mapping each `ScmType` to a shared capability.
//!   `Backends::system()` wires up the command-line backends shipped with this
//!   crate (`git`, `svn`, `hg`, `bzr`), which use the system executables and
//!   therefore whatever authentication the user has configured for them.
//!
//! Queries (`current_uri`, `current_revision`, ...) return `None`/`false`
//! when the working copy cannot be inspected; only `checkout`, `update` and
//! `diff` report errors, since those are the operations whose failure must be
//! attached to an element's result.

mod bzr;
mod git;
mod hg;
mod svn;

pub use bzr::BzrBackend;
pub use git::GitBackend;
pub use hg::HgBackend;
pub use svn::SvnBackend;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use log::debug;

use crate::error::{Error, Result};
use crate::spec::ScmType;

/// Operations a version-control backend provides to the workspace engine.
///
/// Implementations must be stateless with respect to individual elements:
/// one instance is shared by every element of its type and may be called
/// from several worker threads at once, each time for a different path.
pub trait VcsCapability: Send + Sync {
    /// The backend type this capability handles.
    fn scm_type(&self) -> ScmType;

    /// Whether `path` holds a working copy managed by this backend.
    fn is_present(&self, path: &Path) -> bool;

    /// Creates a new working copy of `uri` at `path`, at `version` if given.
    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()>;

    /// Brings the existing working copy at `path` to `version`, or to the
    /// latest state of its tracked branch when `version` is `None`.
    fn update(&self, path: &Path, version: Option<&str>) -> Result<()>;

    /// The remote location the working copy was checked out from.
    fn current_uri(&self, path: &Path) -> Option<String>;

    /// The revision currently checked out.
    fn current_revision(&self, path: &Path) -> Option<String>;

    /// Whether the working copy has uncommitted changes to tracked files.
    fn has_local_modifications(&self, path: &Path) -> bool;

    /// The textual diff of local changes. Opaque to the engine.
    fn diff(&self, path: &Path) -> Result<String>;

    /// The revision a declared `version` refers to in the working copy at
    /// `path`, if the backend can tell without contacting the remote.
    fn resolve_revision(&self, _path: &Path, _version: &str) -> Option<String> {
        None
    }
}

/// Registry of the capability bound to each backend type.
#[derive(Clone, Default)]
pub struct Backends {
    capabilities: HashMap<ScmType, Arc<dyn VcsCapability>>,
}

impl Backends {
    /// A registry with no backends. Elements of any VCS type will fail to
    /// bind until a capability is registered with [`Backends::with`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// The command-line backends for git, svn, hg and bzr.
    pub fn system() -> Self {
        Self::empty()
            .with(Arc::new(GitBackend))
            .with(Arc::new(SvnBackend))
            .with(Arc::new(HgBackend))
            .with(Arc::new(BzrBackend))
    }

    /// Registers `capability` for its own `scm_type`, replacing any previous
    /// registration.
    pub fn with(mut self, capability: Arc<dyn VcsCapability>) -> Self {
        self.capabilities.insert(capability.scm_type(), capability);
        self
    }

    /// The capability for `scm`, `None` for `other` or unregistered types.
    pub fn get(&self, scm: ScmType) -> Option<Arc<dyn VcsCapability>> {
        if !scm.is_vcs() {
            return None;
        }
        self.capabilities.get(&scm).cloned()
    }

    /// Detects which registered backend manages the working copy at `path`.
    pub fn detect(&self, path: &Path) -> Option<ScmType> {
        ScmType::VCS.into_iter().find(|scm| {
            self.capabilities
                .get(scm)
                .is_some_and(|capability| capability.is_present(path))
        })
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.capabilities.keys().collect();
        types.sort();
        f.debug_struct("Backends").field("types", &types).finish()
    }
}

/// Compares two repository URIs, ignoring a trailing slash and `.git`
/// suffix.
pub fn uris_match(a: &str, b: &str) -> bool {
    fn normalize(uri: &str) -> &str {
        let uri = uri.trim().trim_end_matches('/');
        uri.strip_suffix(".git").unwrap_or(uri)
    }
    normalize(a) == normalize(b)
}

/// Compares two revision identifiers. An abbreviated hash matches its full
/// form; empty identifiers never match.
pub fn revisions_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.starts_with(short)
}

/// True if `path` is an existing directory without entries.
pub fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none())
}

/// Builds a command for `scm`'s executable with a stable, non-interactive
/// environment, optionally running inside `cwd`.
pub(crate) fn command(scm: ScmType, cwd: Option<&Path>) -> Command {
    let mut cmd = Command::new(scm.as_str());
    cmd.env("LC_ALL", "C").env("GIT_TERMINAL_PROMPT", "0");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd
}

fn spawn(scm: ScmType, cmd: &mut Command, label: &str, path: &Path) -> Result<Output> {
    debug!("running {:?} in {}", cmd, path.display());
    cmd.output().map_err(|e| Error::Vcs {
        scm: scm.to_string(),
        path: path.display().to_string(),
        command: label.to_string(),
        message: format!("could not run `{}`: {}", scm, e),
    })
}

/// Runs a mutating command and returns its stdout, mapping a non-zero exit
/// status to `Error::Vcs`.
pub(crate) fn run(scm: ScmType, cmd: &mut Command, label: &str, path: &Path) -> Result<String> {
    run_accepting(scm, cmd, label, path, &[0])
}

/// Like [`run`] but treats every exit code in `ok_codes` as success.
pub(crate) fn run_accepting(
    scm: ScmType,
    cmd: &mut Command,
    label: &str,
    path: &Path,
    ok_codes: &[i32],
) -> Result<String> {
    let output = spawn(scm, cmd, label, path)?;
    let accepted = output
        .status
        .code()
        .is_some_and(|code| ok_codes.contains(&code));
    if !accepted {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Vcs {
            scm: scm.to_string(),
            path: path.display().to_string(),
            command: label.to_string(),
            message: explain_failure(stderr.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs a read-only query, returning trimmed stdout when the command
/// succeeded and printed something.
pub(crate) fn query(scm: ScmType, cmd: &mut Command, path: &Path) -> Option<String> {
    match spawn(scm, cmd, "query", path) {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!stdout.is_empty()).then_some(stdout)
        }
        Ok(output) => {
            debug!(
                "{} query in {} exited with {}: {}",
                scm,
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

fn explain_failure(stderr: &str) -> String {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("authorization failed")
    {
        format!(
            "Authentication failed. Make sure you have access to the repository.\n\
            For private repos, ensure you have:\n\
            - SSH key added to ssh-agent\n\
            - credentials configured for the VCS client\n\
            Error: {}",
            stderr
        )
    } else if stderr.is_empty() {
        "command exited unsuccessfully".to_string()
    } else {
        stderr.to_string()
    }
}

/// Creates the parent directory of a checkout target.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FixedCapability(ScmType);

    impl VcsCapability for FixedCapability {
        fn scm_type(&self) -> ScmType {
            self.0
        }
        fn is_present(&self, path: &Path) -> bool {
            path.join(format!(".{}", self.0)).exists()
        }
        fn checkout(&self, _: &Path, _: &str, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        fn update(&self, _: &Path, _: Option<&str>) -> Result<()> {
            Ok(())
        }
        fn current_uri(&self, _: &Path) -> Option<String> {
            None
        }
        fn current_revision(&self, _: &Path) -> Option<String> {
            None
        }
        fn has_local_modifications(&self, _: &Path) -> bool {
            false
        }
        fn diff(&self, _: &Path) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_uris_match_normalizes_suffixes() {
        assert!(uris_match(
            "https://example.com/core.git",
            "https://example.com/core"
        ));
        assert!(uris_match("https://example.com/core/", "https://example.com/core"));
        assert!(!uris_match("https://example.com/core", "https://example.com/other"));
    }

    #[test]
    fn test_revisions_match_prefix() {
        assert!(revisions_match("a1b2c3d", "a1b2c3d4e5f60718293a"));
        assert!(revisions_match("1234", "1234"));
        assert!(!revisions_match("a1b2c3d", "ffff"));
        assert!(!revisions_match("", "a1b2"));
    }

    #[test]
    fn test_is_empty_dir() {
        let temp = TempDir::new().unwrap();
        assert!(is_empty_dir(temp.path()));
        fs::write(temp.path().join("file"), "x").unwrap();
        assert!(!is_empty_dir(temp.path()));
        assert!(!is_empty_dir(&temp.path().join("missing")));
    }

    #[test]
    fn test_backends_get_and_detect() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".hg")).unwrap();

        let backends = Backends::empty()
            .with(Arc::new(FixedCapability(ScmType::Git)))
            .with(Arc::new(FixedCapability(ScmType::Hg)));

        assert!(backends.get(ScmType::Git).is_some());
        assert!(backends.get(ScmType::Svn).is_none());
        assert!(backends.get(ScmType::Other).is_none());
        assert_eq!(backends.detect(temp.path()), Some(ScmType::Hg));
    }

    #[test]
    fn test_system_backends_cover_all_vcs() {
        let backends = Backends::system();
        for scm in ScmType::VCS {
            assert_eq!(backends.get(scm).unwrap().scm_type(), scm);
        }
    }

    #[test]
    fn test_explain_failure_adds_auth_hint() {
        let message = explain_failure("fatal: Authentication failed for 'https://x'");
        assert!(message.contains("SSH key"));
        assert_eq!(explain_failure(""), "command exited unsuccessfully");
    }
}
