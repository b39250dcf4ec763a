//! # Workspace Configuration Model
//!
//! This module holds the in-memory model of a workspace: an ordered list of
//! elements rooted at a base path. It is deliberately independent of the
//! on-disk format (see `persist`) so that configurations can be built from
//! files, command-line arguments or tests alike.
//!
//! ## Key Components
//!
//! - **`ConfigElement`**: a `VersionedPathSpec` bound to its absolute path
//!   and, for version-controlled elements, to the `VcsCapability` that
//!   manages it.
//! - **`WorkspaceConfig`**: the ordered element list. It enforces two
//!   invariants at all times: local names are unique, and no two elements
//!   resolve to the same filesystem path.
//! - **`MergeStrategy`**: how an incoming declaration interacts with an
//!   existing element of the same local name.
//!
//! The configuration is only mutated while it is being assembled or merged.
//! The reconciliation and status engines borrow it immutably.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::spec::{ScmType, VersionedPathSpec};
use crate::vcs::{Backends, VcsCapability};

/// One element of a workspace, bound to its location and backend.
#[derive(Clone)]
pub struct ConfigElement {
    spec: VersionedPathSpec,
    abs_path: PathBuf,
    capability: Option<Arc<dyn VcsCapability>>,
}

impl ConfigElement {
    /// Binds `spec` below `base_path`, resolving its backend from `backends`.
    pub fn new(spec: VersionedPathSpec, base_path: &Path, backends: &Backends) -> Result<Self> {
        spec.validate()?;
        let capability = if spec.is_vcs() {
            Some(backends.get(spec.scm_type()).ok_or_else(|| {
                Error::config(format!(
                    "no backend available for {} element '{}'",
                    spec.scm_type(),
                    spec.local_name()
                ))
            })?)
        } else {
            None
        };
        let abs_path = resolve_path(base_path, spec.path());
        Ok(Self {
            spec,
            abs_path,
            capability,
        })
    }

    pub fn spec(&self) -> &VersionedPathSpec {
        &self.spec
    }

    pub fn local_name(&self) -> &str {
        self.spec.local_name()
    }

    pub fn scm_type(&self) -> ScmType {
        self.spec.scm_type()
    }

    /// The absolute filesystem path of the element.
    pub fn abs_path(&self) -> &Path {
        &self.abs_path
    }

    /// The backend managing this element; `None` for `other` elements.
    pub fn capability(&self) -> Option<&dyn VcsCapability> {
        self.capability.as_deref()
    }

    pub fn is_vcs(&self) -> bool {
        self.capability.is_some()
    }
}

impl fmt::Debug for ConfigElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigElement")
            .field("spec", &self.spec)
            .field("abs_path", &self.abs_path)
            .field("vcs", &self.is_vcs())
            .finish()
    }
}

/// How an incoming spec is combined with an existing element of the same
/// local name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Replace in place; move to the end if the path changed.
    #[default]
    Replace,
    /// Keep the existing element and drop the incoming one.
    KeepExisting,
    /// Drop the existing element and append the incoming one.
    KillAppend,
}

/// What happened to one incoming spec during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    Added,
    Replaced,
    /// Replaced and moved to the end of the list.
    Moved,
    /// An existing element with the same name was kept.
    Kept,
}

impl fmt::Display for MergeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeAction::Added => "added",
            MergeAction::Replaced => "replaced",
            MergeAction::Moved => "replaced (moved to end)",
            MergeAction::Kept => "kept existing",
        })
    }
}

/// The ordered set of elements making up a workspace.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    base_path: PathBuf,
    backends: Backends,
    elements: Vec<ConfigElement>,
}

impl WorkspaceConfig {
    /// An empty workspace rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>, backends: Backends) -> Self {
        Self {
            base_path: normalize(&base_path.into()),
            backends,
            elements: Vec::new(),
        }
    }

    /// Builds a workspace from specs in declaration order. Repeated local
    /// names follow `add_or_override` semantics.
    pub fn from_specs(
        base_path: impl Into<PathBuf>,
        backends: Backends,
        specs: impl IntoIterator<Item = VersionedPathSpec>,
    ) -> Result<Self> {
        let mut config = Self::new(base_path, backends);
        for spec in specs {
            config.add_or_override(spec)?;
        }
        Ok(config)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn elements(&self) -> &[ConfigElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The declarations of all elements, in order.
    pub fn specs(&self) -> impl Iterator<Item = &VersionedPathSpec> {
        self.elements.iter().map(ConfigElement::spec)
    }

    pub fn get(&self, local_name: &str) -> Option<&ConfigElement> {
        self.elements.iter().find(|e| e.local_name() == local_name)
    }

    fn position(&self, local_name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.local_name() == local_name)
    }

    fn ensure_path_free(&self, element: &ConfigElement, skip: Option<usize>) -> Result<()> {
        let clash = self
            .elements
            .iter()
            .enumerate()
            .find(|(i, e)| Some(*i) != skip && e.abs_path() == element.abs_path());
        match clash {
            Some((_, other)) => Err(Error::Config {
                message: format!(
                    "elements '{}' and '{}' both use path {}",
                    other.local_name(),
                    element.local_name(),
                    element.abs_path().display()
                ),
                hint: Some("Give one of the elements a different local-name or path".to_string()),
            }),
            None => Ok(()),
        }
    }

    /// Version-controlled elements must live strictly below the workspace
    /// root, since reconciling may delete or move their directory.
    fn ensure_below_base(&self, element: &ConfigElement) -> Result<()> {
        let path = element.abs_path();
        if !element.is_vcs() || (path.starts_with(&self.base_path) && path != self.base_path) {
            return Ok(());
        }
        Err(Error::Config {
            message: format!(
                "element '{}' uses path {}, which is not inside the workspace {}",
                element.local_name(),
                path.display(),
                self.base_path.display()
            ),
            hint: Some(
                "Use a relative path below the workspace root, or declare it as 'other'"
                    .to_string(),
            ),
        })
    }

    /// Adds `spec`, or overrides the element with the same local name.
    ///
    /// An override keeps the element's position unless the path changed, in
    /// which case the old element is dropped and the new one appended. Fails
    /// without modifying the configuration if the result would contain two
    /// elements with the same path.
    pub fn add_or_override(&mut self, spec: VersionedPathSpec) -> Result<MergeAction> {
        let element = ConfigElement::new(spec, &self.base_path, &self.backends)?;
        self.ensure_below_base(&element)?;
        match self.position(element.local_name()) {
            Some(i) if self.elements[i].abs_path() == element.abs_path() => {
                self.ensure_path_free(&element, Some(i))?;
                self.elements[i] = element;
                Ok(MergeAction::Replaced)
            }
            Some(i) => {
                self.ensure_path_free(&element, Some(i))?;
                self.elements.remove(i);
                self.elements.push(element);
                Ok(MergeAction::Moved)
            }
            None => {
                self.ensure_path_free(&element, None)?;
                self.elements.push(element);
                Ok(MergeAction::Added)
            }
        }
    }

    /// Merges `specs` in order using `strategy`.
    ///
    /// Either every spec is merged or, on the first error, the configuration
    /// is left exactly as it was.
    pub fn merge(
        &mut self,
        specs: impl IntoIterator<Item = VersionedPathSpec>,
        strategy: MergeStrategy,
    ) -> Result<Vec<(String, MergeAction)>> {
        let mut staged = self.clone();
        let mut actions = Vec::new();
        for spec in specs {
            let name = spec.local_name().to_string();
            let action = match (strategy, staged.position(&name)) {
                (MergeStrategy::KeepExisting, Some(_)) => MergeAction::Kept,
                (MergeStrategy::KillAppend, Some(i)) => {
                    staged.elements.remove(i);
                    staged.add_or_override(spec)?;
                    MergeAction::Moved
                }
                _ => staged.add_or_override(spec)?,
            };
            actions.push((name, action));
        }
        *self = staged;
        Ok(actions)
    }

    fn find_index(&self, name: &str) -> Option<usize> {
        self.position(name).or_else(|| {
            let wanted = normalize_name(name);
            self.elements.iter().position(|e| {
                normalize_name(e.spec().path()) == wanted
                    || (Path::new(name).is_absolute() && e.abs_path() == normalize(Path::new(name)))
            })
        })
    }

    /// Selects elements by local name (or workspace-relative path), in the
    /// order requested. `None` selects every element in stored order.
    pub fn select(&self, names: Option<&[String]>) -> Result<Vec<&ConfigElement>> {
        match names {
            None => Ok(self.elements.iter().collect()),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.find_index(name)
                        .map(|i| &self.elements[i])
                        .ok_or_else(|| Error::Lookup { name: name.clone() })
                })
                .collect(),
        }
    }

    /// A configuration containing only the named elements, in stored order.
    pub fn subset(&self, names: Option<&[String]>) -> Result<WorkspaceConfig> {
        let selected = self.select(names)?;
        let elements = self
            .elements
            .iter()
            .filter(|e| selected.iter().any(|s| s.local_name() == e.local_name()))
            .cloned()
            .collect();
        Ok(Self {
            base_path: self.base_path.clone(),
            backends: self.backends.clone(),
            elements,
        })
    }

    /// Fails if any element is not under version control.
    pub fn validate_vcs_only(&self) -> Result<()> {
        match self.elements.iter().find(|e| !e.is_vcs()) {
            Some(element) => Err(Error::Config {
                message: format!(
                    "element '{}' has no version control information",
                    element.local_name()
                ),
                hint: Some("Only git, svn, hg and bzr entries can be checked out".to_string()),
            }),
            None => Ok(()),
        }
    }

    /// Removes the named elements. Nothing is removed if any name is unknown.
    pub fn remove(&mut self, names: &[String]) -> Result<Vec<ConfigElement>> {
        let mut indices = names
            .iter()
            .map(|name| {
                self.find_index(name)
                    .ok_or_else(|| Error::Lookup { name: name.clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        indices.sort_unstable();
        indices.dedup();
        let mut removed = Vec::with_capacity(indices.len());
        for i in indices.into_iter().rev() {
            removed.push(self.elements.remove(i));
        }
        removed.reverse();
        Ok(removed)
    }
}

/// Resolves an element path against the workspace root.
pub fn resolve_path(base_path: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base_path.join(path))
    }
}

/// Lexically normalizes `path`, dropping `.` and folding `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn normalize_name(name: &str) -> PathBuf {
    normalize(Path::new(name.trim_end_matches('/')))
}
