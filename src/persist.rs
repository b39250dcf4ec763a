//! # Configuration Files
//!
//! Reading and writing the declarative workspace file. The file is a YAML
//! sequence in which every item is a single-key map naming the element type:
//!
//! ```yaml
//! - git:
//!     local-name: core
//!     uri: https://example.com/core.git
//!     version: master
//! - svn:
//!     local-name: tools
//!     uri: https://svn.example.com/tools/trunk
//! - other:
//!     local-name: /opt/sdk/setup
//! ```
//!
//! `path` is only written when it differs from `local-name`. The `uri`,
//! `version` and `revision` strings are read and written verbatim so that a
//! configuration survives a write/read cycle unchanged.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::WorkspaceConfig;
use crate::defaults::CONFIG_FILENAME;
use crate::error::{Error, Result};
use crate::spec::{ScmType, VersionedPathSpec};
use crate::vcs::Backends;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Entry {
    #[serde(rename = "local-name")]
    local_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revision: Option<String>,
}

type Document = Vec<BTreeMap<String, Entry>>;

impl Entry {
    fn into_spec(self, scm: ScmType) -> VersionedPathSpec {
        let spec = VersionedPathSpec::new(self.local_name, scm, self.uri)
            .with_optional_version(self.version)
            .with_optional_revision(self.revision);
        match self.path {
            Some(path) => spec.with_path(path),
            None => spec,
        }
    }

    fn from_spec(spec: &VersionedPathSpec) -> Self {
        Self {
            local_name: spec.local_name().to_string(),
            path: (spec.path() != spec.local_name()).then(|| spec.path().to_string()),
            uri: spec.uri().map(str::to_string),
            version: spec.version().map(str::to_string),
            revision: spec.revision().map(str::to_string),
        }
    }
}

fn is_blank(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Parses the declarative form into specs, in file order.
pub fn parse(yaml: &str) -> Result<Vec<VersionedPathSpec>> {
    if is_blank(yaml) {
        return Ok(Vec::new());
    }
    let document: Document = serde_yaml::from_str(yaml).map_err(|e| Error::Config {
        message: format!("invalid workspace file: {}", e),
        hint: Some("Each entry must look like '- git: {local-name: x, uri: y}'".to_string()),
    })?;
    document
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut entries = item.into_iter();
            match (entries.next(), entries.next()) {
                (Some((scm, entry)), None) => Ok(entry.into_spec(scm.parse()?)),
                _ => Err(Error::config(format!(
                    "entry {} must have exactly one element type key",
                    index + 1
                ))),
            }
        })
        .collect()
}

/// Serializes specs into the declarative form, preceded by `header` as a
/// comment block.
pub fn to_yaml<'a>(
    specs: impl IntoIterator<Item = &'a VersionedPathSpec>,
    header: &str,
) -> Result<String> {
    let document: Document = specs
        .into_iter()
        .map(|spec| BTreeMap::from([(spec.scm_type().to_string(), Entry::from_spec(spec))]))
        .collect();
    let mut out = String::new();
    for line in header.lines() {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    if !header.is_empty() {
        out.push('\n');
    }
    if document.is_empty() {
        out.push_str("[]\n");
    } else {
        out.push_str(&serde_yaml::to_string(&document)?);
    }
    Ok(out)
}

/// Reads the specs declared in the file at `path`.
pub fn read(path: &Path) -> Result<Vec<VersionedPathSpec>> {
    debug!("reading workspace file {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    parse(&content)
}

/// Writes `config` to `filename` inside its base path and returns the path
/// written. The file is replaced atomically.
pub fn write(config: &WorkspaceConfig, filename: &str, header: &str) -> Result<PathBuf> {
    let target = config.base_path().join(filename);
    let staging = config.base_path().join(format!("{}.tmp", filename));
    fs::write(&staging, to_yaml(config.specs(), header)?)?;
    fs::rename(&staging, &target)?;
    debug!("wrote {} elements to {}", config.len(), target.display());
    Ok(target)
}

/// Resolves a seed source to a workspace file.
///
/// Accepts a file, a directory holding a workspace file, or a `file://` URL.
/// Relative paths are taken relative to `cwd`.
pub fn resolve_source(source: &str, cwd: &Path) -> Result<PathBuf> {
    let path = if source.contains("://") {
        let url = Url::parse(source)?;
        if url.scheme() != "file" {
            return Err(Error::usage(format!(
                "unsupported source '{}': only local files and file:// URLs can be read",
                source
            )));
        }
        url.to_file_path()
            .map_err(|_| Error::usage(format!("invalid file URL '{}'", source)))?
    } else {
        cwd.join(source)
    };
    if path.is_dir() {
        let candidate = path.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(Error::usage(format!(
            "directory {} does not contain a {} file",
            path.display(),
            CONFIG_FILENAME
        )));
    }
    if !path.is_file() {
        return Err(Error::usage(format!("source {} does not exist", path.display())));
    }
    Ok(path)
}

/// Reads the specs of a seed source (see [`resolve_source`]).
pub fn read_source(source: &str, cwd: &Path) -> Result<Vec<VersionedPathSpec>> {
    read(&resolve_source(source, cwd)?)
}

/// Reads every source in order and concatenates their specs.
pub fn load_sources<S: AsRef<str>>(cwd: &Path, sources: &[S]) -> Result<Vec<VersionedPathSpec>> {
    let mut specs = Vec::new();
    for source in sources {
        specs.extend(read_source(source.as_ref(), cwd)?);
    }
    Ok(specs)
}

/// Loads the workspace rooted at `base_path` from its configuration file.
pub fn load(base_path: &Path, filename: &str, backends: Backends) -> Result<WorkspaceConfig> {
    let file = base_path.join(filename);
    if !file.is_file() {
        return Err(Error::Config {
            message: format!("no workspace file {}", file.display()),
            hint: Some(format!(
                "Run '{} init {}' to create a workspace",
                crate::defaults::PROGRAM_NAME,
                base_path.display()
            )),
        });
    }
    WorkspaceConfig::from_specs(base_path, backends, read(&file)?)
}
