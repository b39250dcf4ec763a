//! # Element Declarations
//!
//! A workspace is declared as an ordered list of `VersionedPathSpec` values.
//! Each one names a local directory, the kind of version control behind it,
//! and what it should be checked out from. Specs are plain values: the
//! configuration model binds them to filesystem paths and VCS backends.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of source tree an element refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmType {
    Git,
    Svn,
    Hg,
    Bzr,
    /// A plain path that is not under version control managed by the
    /// workspace. Never checked out or updated.
    Other,
}

impl ScmType {
    /// All version-control backends, in the order they are probed.
    pub const VCS: [ScmType; 4] = [ScmType::Git, ScmType::Svn, ScmType::Hg, ScmType::Bzr];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScmType::Git => "git",
            ScmType::Svn => "svn",
            ScmType::Hg => "hg",
            ScmType::Bzr => "bzr",
            ScmType::Other => "other",
        }
    }

    pub fn is_vcs(&self) -> bool {
        !matches!(self, ScmType::Other)
    }
}

impl fmt::Display for ScmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScmType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(ScmType::Git),
            "svn" => Ok(ScmType::Svn),
            "hg" | "mercurial" => Ok(ScmType::Hg),
            "bzr" | "bazaar" => Ok(ScmType::Bzr),
            "other" => Ok(ScmType::Other),
            _ => Err(Error::Config {
                message: format!("unknown scm type '{}'", s),
                hint: Some("Use one of: git, svn, hg, bzr, other".to_string()),
            }),
        }
    }
}

/// The declaration of one workspace element.
///
/// `path` is relative to the workspace root unless it is absolute (which is
/// only meaningful for `other` entries). `version` is a tag, branch or other
/// backend-specific spec; `revision` optionally pins an exact revision on top
/// of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPathSpec {
    local_name: String,
    path: String,
    scm_type: ScmType,
    uri: Option<String>,
    version: Option<String>,
    revision: Option<String>,
}

impl VersionedPathSpec {
    /// Creates a spec whose path equals its local name.
    pub fn new(local_name: impl Into<String>, scm_type: ScmType, uri: Option<String>) -> Self {
        let local_name = local_name.into();
        Self {
            path: local_name.clone(),
            local_name,
            scm_type,
            uri,
            version: None,
            revision: None,
        }
    }

    /// Shorthand for a VCS element.
    pub fn vcs(local_name: impl Into<String>, scm_type: ScmType, uri: impl Into<String>) -> Self {
        Self::new(local_name, scm_type, Some(uri.into()))
    }

    /// Shorthand for a non-VCS element.
    pub fn other(local_name: impl Into<String>) -> Self {
        Self::new(local_name, ScmType::Other, None)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_optional_version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    pub fn with_optional_revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn scm_type(&self) -> ScmType {
        self.scm_type
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn is_vcs(&self) -> bool {
        self.scm_type.is_vcs()
    }

    /// Checks the field-level rules that do not depend on other elements.
    pub fn validate(&self) -> Result<()> {
        if self.local_name.trim().is_empty() {
            return Err(Error::config("element with empty local-name"));
        }
        if self.path.trim().is_empty() {
            return Err(Error::config(format!(
                "element '{}' has an empty path",
                self.local_name
            )));
        }
        if self.is_vcs() && self.uri.as_deref().map_or(true, |u| u.trim().is_empty()) {
            return Err(Error::Config {
                message: format!(
                    "{} element '{}' has no uri",
                    self.scm_type, self.local_name
                ),
                hint: Some("Add 'uri:' to the entry".to_string()),
            });
        }
        Ok(())
    }
}

impl fmt::Display for VersionedPathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.local_name, self.scm_type)?;
        if let Some(uri) = &self.uri {
            write!(f, " {}", uri)?;
        }
        if let Some(version) = &self.version {
            write!(f, " @ {}", version)?;
        }
        Ok(())
    }
}
