//! Test doubles shared by the unit tests of the engine modules.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::spec::{ScmType, VersionedPathSpec};
use crate::vcs::{Backends, VcsCapability};

pub(crate) fn git(name: &str, uri: &str) -> VersionedPathSpec {
    VersionedPathSpec::vcs(name, ScmType::Git, uri)
}

pub(crate) fn svn(name: &str, uri: &str) -> VersionedPathSpec {
    VersionedPathSpec::vcs(name, ScmType::Svn, uri)
}

/// Backends where every VCS type is served by a mock. The git and svn mocks
/// are returned for inspection.
pub(crate) fn mock_backends() -> (Backends, Arc<MockVcs>, Arc<MockVcs>) {
    let git = Arc::new(MockVcs::new(ScmType::Git));
    let svn = Arc::new(MockVcs::new(ScmType::Svn));
    let backends = Backends::empty()
        .with(git.clone())
        .with(svn.clone())
        .with(Arc::new(MockVcs::new(ScmType::Hg)))
        .with(Arc::new(MockVcs::new(ScmType::Bzr)));
    (backends, git, svn)
}

/// Metadata file dropped into every mock working copy, so that it is not
/// mistaken for an empty directory.
pub(crate) const MOCK_METADATA: &str = ".mockvcs";

fn materialize(path: &Path) {
    fs::create_dir_all(path).unwrap();
    fs::write(path.join(MOCK_METADATA), "").unwrap();
}

/// The revision a mock checkout of `version` ends up at.
pub(crate) fn mock_revision(version: Option<&str>) -> String {
    format!("rev-{}", version.unwrap_or("head"))
}

#[derive(Debug, Clone)]
pub(crate) struct MockCheckout {
    pub uri: String,
    pub revision: String,
    pub modified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockCall {
    pub op: &'static str,
    pub name: String,
}

/// A capability that keeps working copies in memory (creating the directory
/// on disk) and records every call.
pub(crate) struct MockVcs {
    scm: ScmType,
    checkouts: Mutex<HashMap<PathBuf, MockCheckout>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<MockCall>>,
    active: Mutex<HashSet<PathBuf>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockVcs {
    pub fn new(scm: ScmType) -> Self {
        Self {
            scm,
            checkouts: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            active: Mutex::new(HashSet::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Makes checkout and update fail for the element whose directory is
    /// named `name`.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(name.to_string(), delay);
    }

    /// Pretends `path` already holds a working copy.
    pub fn seed(&self, path: &Path, uri: &str, revision: &str, modified: bool) {
        materialize(path);
        self.checkouts.lock().unwrap().insert(
            path.to_path_buf(),
            MockCheckout {
                uri: uri.to_string(),
                revision: revision.to_string(),
                modified,
            },
        );
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op)
            .map(|c| c.name)
            .collect()
    }

    /// The highest number of checkout/update calls observed at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// What `version` resolves to: itself when it already names a revision
    /// some working copy is at, otherwise `mock_revision(version)`.
    fn resolve(&self, version: Option<&str>) -> String {
        match version {
            Some(v) if self.checkouts.lock().unwrap().values().any(|c| c.revision == v) => {
                v.to_string()
            }
            other => mock_revision(other),
        }
    }

    fn record(&self, op: &'static str, path: &Path) {
        self.calls.lock().unwrap().push(MockCall {
            op,
            name: name_of(path),
        });
    }

    /// Runs a mutating operation, asserting no other call is touching the
    /// same path and applying the configured delay and failure.
    fn mutate(&self, op: &'static str, path: &Path, apply: impl FnOnce()) -> Result<()> {
        self.record(op, path);
        assert!(
            self.active.lock().unwrap().insert(path.to_path_buf()),
            "two operations on {} at once",
            path.display()
        );
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let name = name_of(path);
        let delay = self.delays.lock().unwrap().get(&name).copied();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let fails = self.failing.lock().unwrap().contains(&name);
        if !fails {
            apply();
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.active.lock().unwrap().remove(path);
        if fails {
            Err(Error::Vcs {
                scm: self.scm.to_string(),
                path: path.display().to_string(),
                command: op.to_string(),
                message: "simulated failure".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl VcsCapability for MockVcs {
    fn scm_type(&self) -> ScmType {
        self.scm
    }

    fn is_present(&self, path: &Path) -> bool {
        self.checkouts.lock().unwrap().contains_key(path)
    }

    fn checkout(&self, path: &Path, uri: &str, version: Option<&str>) -> Result<()> {
        let revision = self.resolve(version);
        self.mutate("checkout", path, || {
            materialize(path);
            self.checkouts.lock().unwrap().insert(
                path.to_path_buf(),
                MockCheckout {
                    uri: uri.to_string(),
                    revision,
                    modified: false,
                },
            );
        })
    }

    fn update(&self, path: &Path, version: Option<&str>) -> Result<()> {
        let revision = self.resolve(version);
        self.mutate("update", path, || {
            if let Some(checkout) = self.checkouts.lock().unwrap().get_mut(path) {
                checkout.revision = revision;
            }
        })
    }

    fn current_uri(&self, path: &Path) -> Option<String> {
        self.record("current_uri", path);
        self.checkouts.lock().unwrap().get(path).map(|c| c.uri.clone())
    }

    fn current_revision(&self, path: &Path) -> Option<String> {
        self.record("current_revision", path);
        self.checkouts
            .lock()
            .unwrap()
            .get(path)
            .map(|c| c.revision.clone())
    }

    fn has_local_modifications(&self, path: &Path) -> bool {
        self.record("has_local_modifications", path);
        self.checkouts
            .lock()
            .unwrap()
            .get(path)
            .is_some_and(|c| c.modified)
    }

    fn diff(&self, path: &Path) -> Result<String> {
        self.record("diff", path);
        let modified = self.has_local_modifications(path);
        Ok(if modified {
            "--- a/file\n+++ b/file\n@@ -1 +1 @@\n-old\n+new\n".to_string()
        } else {
            String::new()
        })
    }

    fn resolve_revision(&self, path: &Path, version: &str) -> Option<String> {
        self.record("resolve_revision", path);
        Some(self.resolve(Some(version)))
    }
}
