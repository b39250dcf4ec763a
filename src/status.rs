//! # Status
//!
//! Compares the declared state of a workspace with what is on disk.
//!
//! Every selected element is inspected through its capability and
//! classified, in priority order, as missing, locally modified, at a
//! different version than declared, or clean. The module also provides the
//! field projection used by `info --only`, which only talks to the VCS when a
//! dynamic field is requested, the snapshot transform that freezes an
//! element at its current revision, and concurrent diff collection.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::config::{ConfigElement, WorkspaceConfig};
use crate::error::{Error, Result};
use crate::pool::WorkerPool;
use crate::spec::VersionedPathSpec;
use crate::vcs::{revisions_match, uris_match};

/// How an element's actual state relates to its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Missing,
    LocallyModified,
    VersionMismatch,
    Clean,
}

impl Classification {
    /// The one-letter code used in status listings.
    pub fn letter(self) -> char {
        match self {
            Classification::Missing => 'x',
            Classification::LocallyModified => 'L',
            Classification::VersionMismatch => 'V',
            Classification::Clean => ' ',
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::Missing => "missing",
            Classification::LocallyModified => "modified",
            Classification::VersionMismatch => "version mismatch",
            Classification::Clean => "clean",
        })
    }
}

/// The observed state of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResult {
    pub local_name: String,
    pub is_missing: bool,
    /// The path exists but is not a working copy of the declared type.
    pub is_foreign: bool,
    pub has_local_modifications: bool,
    pub current_uri: Option<String>,
    pub current_revision: Option<String>,
    /// The pinned revision, or the revision the declared version resolves to.
    pub specified_revision: Option<String>,
    pub uri_mismatch: bool,
    pub revision_mismatch: bool,
    pub classification: Classification,
}

impl StatusResult {
    fn classify(&mut self) {
        self.classification = if self.is_missing {
            Classification::Missing
        } else if self.has_local_modifications {
            Classification::LocallyModified
        } else if self.is_foreign || self.uri_mismatch || self.revision_mismatch {
            Classification::VersionMismatch
        } else {
            Classification::Clean
        };
    }
}

/// The revision `element` is expected to be at: the pin if there is one,
/// otherwise whatever the declared version resolves to.
fn specified_revision(element: &ConfigElement) -> Option<String> {
    if let Some(pin) = element.spec().revision() {
        return Some(pin.to_string());
    }
    let vcs = element.capability()?;
    let version = element.spec().version()?;
    if !element.abs_path().exists() {
        return None;
    }
    vcs.resolve_revision(element.abs_path(), version)
}

/// Inspects a single element.
pub fn element_status(element: &ConfigElement) -> StatusResult {
    let path = element.abs_path();
    let mut result = StatusResult {
        local_name: element.local_name().to_string(),
        is_missing: !path.exists(),
        is_foreign: false,
        has_local_modifications: false,
        current_uri: None,
        current_revision: None,
        specified_revision: None,
        uri_mismatch: false,
        revision_mismatch: false,
        classification: Classification::Clean,
    };

    if let (Some(vcs), false) = (element.capability(), result.is_missing) {
        if vcs.is_present(path) {
            result.current_uri = vcs.current_uri(path);
            result.current_revision = vcs.current_revision(path);
            result.has_local_modifications = vcs.has_local_modifications(path);
            result.specified_revision = specified_revision(element);

            result.uri_mismatch = match (&result.current_uri, element.spec().uri()) {
                (Some(current), Some(declared)) => !uris_match(current, declared),
                _ => false,
            };
            result.revision_mismatch =
                match (&result.specified_revision, &result.current_revision) {
                    (Some(specified), Some(current)) => !revisions_match(specified, current),
                    _ => false,
                };
        } else {
            result.is_foreign = true;
        }
    }

    result.classify();
    debug!("{}: {}", result.local_name, result.classification);
    result
}

/// Computes the status of the selected elements (all when `names` is
/// `None`), in selection order. Elements are queried concurrently on `pool`.
pub fn compute_status(
    config: &WorkspaceConfig,
    names: Option<&[String]>,
    pool: &WorkerPool,
) -> Result<Vec<StatusResult>> {
    let selected = config.select(names)?;
    let results = pool.run(&selected, |e| element_status(e), |_| false, |_, _| {})?;
    Ok(results.into_iter().map(|(_, status)| status).collect())
}

/// A field that can be requested from `info --only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    LocalName,
    Path,
    ScmType,
    Uri,
    Version,
    Revision,
    CurRevision,
    CurUri,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::LocalName,
        Field::Path,
        Field::ScmType,
        Field::Uri,
        Field::Version,
        Field::Revision,
        Field::CurRevision,
        Field::CurUri,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::LocalName => "localname",
            Field::Path => "path",
            Field::ScmType => "scmtype",
            Field::Uri => "uri",
            Field::Version => "version",
            Field::Revision => "revision",
            Field::CurRevision => "cur_revision",
            Field::CurUri => "cur_uri",
        }
    }

    /// Whether computing the field needs the version-control system.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Field::Revision | Field::CurRevision | Field::CurUri)
    }

    fn value(self, element: &ConfigElement) -> Option<String> {
        let spec = element.spec();
        let path = element.abs_path();
        let vcs = || element.capability().filter(|_| path.exists());
        match self {
            Field::LocalName => Some(spec.local_name().to_string()),
            Field::Path => Some(path.display().to_string()),
            Field::ScmType => Some(spec.scm_type().to_string()),
            Field::Uri => spec.uri().map(str::to_string),
            Field::Version => spec.version().map(str::to_string),
            Field::Revision => specified_revision(element),
            Field::CurRevision => vcs().and_then(|v| v.current_revision(path)),
            Field::CurUri => vcs().and_then(|v| v.current_uri(path)),
        }
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Field::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::usage(format!("unknown field '{}'", s)))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses a comma-separated field list such as `localname,cur_revision`.
pub fn parse_fields(list: &str) -> Result<Vec<Field>> {
    let fields = list
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Field>>>()?;
    if fields.is_empty() {
        return Err(Error::usage("no fields requested"));
    }
    Ok(fields)
}

/// Projects the requested fields of the selected elements.
///
/// Rows follow selection order, values follow `fields` order. When only
/// declared fields are requested the VCS is never consulted and `pool` is
/// not used.
pub fn project(
    config: &WorkspaceConfig,
    names: Option<&[String]>,
    fields: &[Field],
    pool: &WorkerPool,
) -> Result<Vec<Vec<Option<String>>>> {
    let selected = config.select(names)?;
    let row = |element: &&ConfigElement| -> Vec<Option<String>> {
        fields.iter().map(|f| f.value(element)).collect()
    };
    if !fields.iter().any(|f| f.is_dynamic()) {
        return Ok(selected.iter().map(row).collect());
    }
    let rows = pool.run(&selected, row, |_| false, |_, _| {})?;
    Ok(rows.into_iter().map(|(_, row)| row).collect())
}

/// Formats a projected row as comma-separated values.
pub fn format_row(row: &[Option<String>]) -> String {
    row.iter()
        .map(|v| v.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",")
}

/// Re-describes `spec` at its observed state: the current URI and the
/// current revision as its version. Missing and unversioned elements are
/// returned unchanged.
pub fn snapshot(status: &StatusResult, spec: &VersionedPathSpec) -> VersionedPathSpec {
    if status.is_missing || status.is_foreign || !spec.is_vcs() {
        return spec.clone();
    }
    let uri = status
        .current_uri
        .clone()
        .or_else(|| spec.uri().map(str::to_string));
    let version = status
        .current_revision
        .clone()
        .or_else(|| spec.version().map(str::to_string));
    VersionedPathSpec::new(spec.local_name(), spec.scm_type(), uri)
        .with_path(spec.path())
        .with_optional_version(version)
}

/// The local diff of one element.
#[derive(Debug)]
pub struct ElementDiff {
    pub local_name: String,
    pub diff: Result<String>,
}

/// Collects the diffs of the selected elements that are checked out, in
/// selection order. File names in diff headers are prefixed with the
/// element's path so the concatenated output applies from the workspace
/// root.
pub fn collect_diffs(
    config: &WorkspaceConfig,
    names: Option<&[String]>,
    pool: &WorkerPool,
) -> Result<Vec<ElementDiff>> {
    let selected: Vec<_> = config
        .select(names)?
        .into_iter()
        .filter(|e| {
            e.capability()
                .is_some_and(|vcs| e.abs_path().exists() && vcs.is_present(e.abs_path()))
        })
        .collect();
    let diffs = pool.run(
        &selected,
        |element| {
            let diff = element
                .capability()
                .map(|vcs| vcs.diff(element.abs_path()))
                .unwrap_or_else(|| Ok(String::new()));
            ElementDiff {
                local_name: element.local_name().to_string(),
                diff: diff.map(|d| prefix_paths(&d, element.spec().path())),
            }
        },
        |_| false,
        |_, _| {},
    )?;
    Ok(diffs.into_iter().map(|(_, diff)| diff).collect())
}

fn prefix_paths(diff: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let side = |rest: &str| -> String {
        if rest.starts_with("/dev/null") {
            return rest.to_string();
        }
        match rest.split_once('/') {
            Some((side @ ("a" | "b"), file)) => format!("{}/{}/{}", side, prefix, file),
            _ => format!("{}/{}", prefix, rest),
        }
    };
    let mut out = String::with_capacity(diff.len());
    for line in diff.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            let sides: Vec<_> = rest.splitn(2, ' ').map(side).collect();
            out.push_str("diff --git ");
            out.push_str(&sides.join(" "));
        } else if let Some(rest) = line.strip_prefix("--- ") {
            out.push_str("--- ");
            out.push_str(&side(rest));
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            out.push_str("+++ ");
            out.push_str(&side(rest));
        } else if let Some(rest) = line.strip_prefix("Index: ") {
            out.push_str("Index: ");
            out.push_str(&format!("{}/{}", prefix, rest));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}
