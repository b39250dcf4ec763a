//! # Reconciliation
//!
//! Brings the filesystem to the declared state of a workspace: every element
//! whose path is missing (or an empty directory) is checked out, every
//! existing checkout is updated to its declared version.
//!
//! Elements are processed by a [`WorkerPool`]. In the default fail-fast mode
//! the first failure stops further dispatch while work already in flight is
//! allowed to finish; in robust mode every element is attempted. Either way
//! per-element VCS failures end up in the report instead of aborting the
//! call.
//!
//! A path that exists but is not a checkout of the declared repository is
//! handled according to a [`ChangedUriPolicy`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::{ConfigElement, WorkspaceConfig};
use crate::error::Result;
use crate::pool::WorkerPool;
use crate::vcs::{is_empty_dir, uris_match, VcsCapability};

/// What to do with an element whose path exists but does not hold a
/// checkout of the declared repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChangedUriPolicy {
    /// Fail the element and leave the directory alone.
    #[default]
    Abort,
    /// Remove the directory, then check out.
    Delete,
    /// Move the directory into the given backup directory, then check out.
    Backup(PathBuf),
    /// Leave the directory alone and report the element as skipped.
    Skip,
}

/// The result of reconciling one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CheckedOut,
    Updated,
    Skipped(String),
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::CheckedOut => f.write_str("checked out"),
            Outcome::Updated => f.write_str("updated"),
            Outcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            Outcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Per-element outcomes of one reconciliation, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// True iff every element was attempted and none failed.
    pub success: bool,
    pub outcomes: Vec<(String, Outcome)>,
}

impl ReconcileReport {
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            Outcome::Failed(reason) => Some((name.as_str(), reason.as_str())),
            _ => None,
        })
    }
}

/// Settings for [`install_or_update`].
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub num_threads: usize,
    pub robust: bool,
    pub changed_uri_policy: ChangedUriPolicy,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            num_threads: crate::defaults::DEFAULT_JOBS,
            robust: false,
            changed_uri_policy: ChangedUriPolicy::default(),
            interrupt: None,
        }
    }
}

/// Checks out or updates every element of `config`.
///
/// Fails without touching the filesystem if `config` contains elements that
/// are not under version control. `observer` is called on the calling thread
/// for every finished element.
pub fn install_or_update<O>(
    config: &WorkspaceConfig,
    options: &ReconcileOptions,
    mut observer: O,
) -> Result<ReconcileReport>
where
    O: FnMut(&str, &Outcome),
{
    config.validate_vcs_only()?;
    let mut pool = WorkerPool::new(options.num_threads)?.robust(options.robust);
    if let Some(flag) = &options.interrupt {
        pool = pool.interrupt(flag.clone());
    }

    let elements = config.elements();
    let policy = &options.changed_uri_policy;
    let results = pool.run(
        elements,
        |element| reconcile_element(element, policy),
        Outcome::is_failure,
        |index, outcome| observer(elements[index].local_name(), outcome),
    )?;

    let attempted_all = results.len() == elements.len();
    let outcomes: Vec<_> = results
        .into_iter()
        .map(|(index, outcome)| (elements[index].local_name().to_string(), outcome))
        .collect();
    let success = attempted_all && !outcomes.iter().any(|(_, o)| o.is_failure());
    Ok(ReconcileReport { success, outcomes })
}

fn reconcile_element(element: &ConfigElement, policy: &ChangedUriPolicy) -> Outcome {
    let outcome = match element.capability() {
        Some(vcs) => reconcile_vcs(element, vcs, policy),
        None => Outcome::Skipped("not under version control".to_string()),
    };
    match &outcome {
        Outcome::Failed(reason) => warn!("{}: {}", element.local_name(), reason),
        other => info!("{}: {}", element.local_name(), other),
    }
    outcome
}

fn reconcile_vcs(element: &ConfigElement, vcs: &dyn VcsCapability, policy: &ChangedUriPolicy) -> Outcome {
    let spec = element.spec();
    let path = element.abs_path();
    let uri = spec.uri().unwrap_or_default();
    let version = spec.revision().or(spec.version());

    let checkout = || match vcs.checkout(path, uri, version) {
        Ok(()) => Outcome::CheckedOut,
        Err(e) => Outcome::Failed(e.to_string()),
    };

    if !path.exists() || is_empty_dir(path) {
        debug!("{}: checking out {} into {}", element.local_name(), uri, path.display());
        return checkout();
    }

    let changed = if vcs.is_present(path) {
        match vcs.current_uri(path) {
            Some(current) if !uris_match(&current, uri) => {
                Some(format!("{} is a checkout of {} instead of {}", path.display(), current, uri))
            }
            _ => None,
        }
    } else {
        Some(format!("{} exists but is not a {} checkout", path.display(), vcs.scm_type()))
    };

    let Some(reason) = changed else {
        debug!("{}: updating {}", element.local_name(), path.display());
        return match vcs.update(path, version) {
            Ok(()) => Outcome::Updated,
            Err(e) => Outcome::Failed(e.to_string()),
        };
    };

    match policy {
        ChangedUriPolicy::Abort => Outcome::Failed(format!(
            "{}\n  hint: use --delete-changed-uris, --backup-changed-uris DIR or --skip-changed-uris",
            reason
        )),
        ChangedUriPolicy::Skip => Outcome::Skipped(reason),
        ChangedUriPolicy::Delete => match remove_path(path) {
            Ok(()) => checkout(),
            Err(e) => Outcome::Failed(format!("cannot delete {}: {}", path.display(), e)),
        },
        ChangedUriPolicy::Backup(dir) => match backup(path, dir, element.local_name()) {
            Ok(target) => {
                info!("{}: moved {} to {}", element.local_name(), path.display(), target.display());
                checkout()
            }
            Err(e) => Outcome::Failed(format!("cannot back up {}: {}", path.display(), e)),
        },
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Moves `path` to the first free `<dir>/<local_name>-<n>`.
fn backup(path: &Path, dir: &Path, local_name: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let stem = local_name.replace(['/', '\\'], "_");
    let target = (0..)
        .map(|n| dir.join(format!("{}-{}", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(&stem));
    fs::rename(path, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::spec::VersionedPathSpec;
    use crate::status::{compute_status, Classification};
    use crate::test_support::{git, mock_backends, mock_revision, svn};
    use std::time::Duration;
    use tempfile::TempDir;

    fn options(num_threads: usize, robust: bool) -> ReconcileOptions {
        ReconcileOptions {
            num_threads,
            robust,
            ..ReconcileOptions::default()
        }
    }

    fn names(report: &ReconcileReport) -> Vec<&str> {
        report.outcomes.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_missing_element_is_checked_out_then_clean() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let config = WorkspaceConfig::from_specs(
            temp.path(),
            backends,
            vec![git("a", "u1").with_version("v1")],
        )
        .unwrap();

        let report = install_or_update(&config, &options(1, false), |_, _| {}).unwrap();
        assert!(report.success);
        assert_eq!(report.outcomes, vec![("a".to_string(), Outcome::CheckedOut)]);
        assert_eq!(git_vcs.calls_for("checkout"), vec!["a"]);

        let status = compute_status(&config, None, &WorkerPool::new(1).unwrap()).unwrap();
        assert_eq!(status[0].classification, Classification::Clean);
        assert_eq!(status[0].current_revision, Some(mock_revision(Some("v1"))));
    }

    #[test]
    fn test_present_element_is_updated() {
        let temp = TempDir::new().unwrap();
        let (backends, _, svn_vcs) = mock_backends();
        svn_vcs.seed(&temp.path().join("b"), "u2", "rev-old", true);
        let config =
            WorkspaceConfig::from_specs(temp.path(), backends, vec![svn("b", "u2")]).unwrap();

        let report = install_or_update(&config, &options(1, false), |_, _| {}).unwrap();
        assert_eq!(report.outcomes, vec![("b".to_string(), Outcome::Updated)]);
        assert_eq!(svn_vcs.calls_for("update"), vec!["b"]);
        assert!(svn_vcs.calls_for("checkout").is_empty());
    }

    #[test]
    fn test_missing_and_modified_elements_reconcile_cleanly() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, svn_vcs) = mock_backends();
        svn_vcs.seed(&temp.path().join("b"), "u2", "rev-old", true);
        let config = WorkspaceConfig::from_specs(
            temp.path(),
            backends,
            vec![git("a", "u1"), svn("b", "u2")],
        )
        .unwrap();

        let pool = WorkerPool::new(2).unwrap();
        let status = compute_status(&config, None, &pool).unwrap();
        let letters: Vec<char> = status.iter().map(|s| s.classification.letter()).collect();
        assert_eq!(letters, vec!['x', 'L']);

        let report = install_or_update(&config, &options(2, false), |_, _| {}).unwrap();
        assert!(report.success);
        assert_eq!(report.failures().count(), 0);
        assert_eq!(
            report.outcomes,
            vec![
                ("a".to_string(), Outcome::CheckedOut),
                ("b".to_string(), Outcome::Updated),
            ]
        );
        assert_eq!(git_vcs.calls_for("checkout"), vec!["a"]);
        assert_eq!(svn_vcs.calls_for("update"), vec!["b"]);
        assert!(svn_vcs.calls_for("checkout").is_empty());
    }

    #[test]
    fn test_empty_directory_is_checked_out() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("a")).unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let config =
            WorkspaceConfig::from_specs(temp.path(), backends, vec![git("a", "u1")]).unwrap();

        install_or_update(&config, &options(1, false), |_, _| {}).unwrap();
        assert_eq!(git_vcs.calls_for("checkout"), vec!["a"]);
    }

    #[test]
    fn test_pinned_revision_wins_over_version() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let config = WorkspaceConfig::from_specs(
            temp.path(),
            backends,
            vec![git("a", "u1").with_version("main").with_revision("abc123")],
        )
        .unwrap();

        install_or_update(&config, &options(1, false), |_, _| {}).unwrap();
        assert_eq!(
            git_vcs.current_revision(&temp.path().join("a")),
            Some(mock_revision(Some("abc123")))
        );
    }

    #[test]
    fn test_sequential_failure_stops_dispatch() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        git_vcs.fail("c");
        let specs = ["a", "b", "c", "d", "e"].map(|n| git(n, &format!("u-{}", n)));
        let config = WorkspaceConfig::from_specs(temp.path(), backends, specs).unwrap();

        let report = install_or_update(&config, &options(1, false), |_, _| {}).unwrap();
        assert!(!report.success);
        assert_eq!(names(&report), vec!["a", "b", "c"]);
        assert!(report.outcomes[2].1.is_failure());
        assert_eq!(git_vcs.calls_for("checkout"), vec!["a", "b", "c"]);
        assert!(!temp.path().join("d").exists());
    }

    #[test]
    fn test_robust_attempts_every_element() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        git_vcs.fail("b");
        let specs = ["a", "b", "c"].map(|n| git(n, &format!("u-{}", n)));
        let config = WorkspaceConfig::from_specs(temp.path(), backends, specs).unwrap();

        let report = install_or_update(&config, &options(2, true), |_, _| {}).unwrap();
        assert!(!report.success);
        assert_eq!(names(&report), vec!["a", "b", "c"]);
        assert_eq!(report.failures().map(|(n, _)| n).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(git_vcs.calls_for("checkout").len(), 3);
    }

    #[test]
    fn test_outcomes_follow_declaration_order_under_latency() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        git_vcs.delay("a", Duration::from_millis(60));
        git_vcs.delay("c", Duration::from_millis(30));
        let specs = ["a", "b", "c", "d", "e", "f"].map(|n| git(n, &format!("u-{}", n)));
        let config = WorkspaceConfig::from_specs(temp.path(), backends, specs).unwrap();

        let mut completed = Vec::new();
        let report = install_or_update(&config, &options(3, false), |name, _| {
            completed.push(name.to_string())
        })
        .unwrap();

        assert!(report.success);
        assert_eq!(names(&report), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(completed.len(), 6);
        assert!(git_vcs.peak_concurrency() <= 3);
    }

    #[test]
    fn test_non_vcs_element_is_rejected_before_work() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let config = WorkspaceConfig::from_specs(
            temp.path(),
            backends,
            vec![git("a", "u1"), VersionedPathSpec::other("notes")],
        )
        .unwrap();

        let err = install_or_update(&config, &options(1, true), |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(git_vcs.calls().is_empty());
    }

    fn changed_uri_setup() -> (TempDir, WorkspaceConfig, Arc<crate::test_support::MockVcs>) {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let path = temp.path().join("a");
        git_vcs.seed(&path, "https://example.com/old.git", "rev-x", false);
        fs::write(path.join("file"), "local").unwrap();
        let config = WorkspaceConfig::from_specs(
            temp.path(),
            backends,
            vec![git("a", "https://example.com/new.git")],
        )
        .unwrap();
        (temp, config, git_vcs)
    }

    fn with_policy(policy: ChangedUriPolicy) -> ReconcileOptions {
        ReconcileOptions {
            changed_uri_policy: policy,
            ..ReconcileOptions::default()
        }
    }

    #[test]
    fn test_changed_uri_abort_fails_element() {
        let (temp, config, git_vcs) = changed_uri_setup();
        let report = install_or_update(&config, &ReconcileOptions::default(), |_, _| {}).unwrap();

        assert!(!report.success);
        let (_, reason) = report.failures().next().unwrap();
        assert!(reason.contains("instead of https://example.com/new.git"));
        assert!(reason.contains("--delete-changed-uris"));
        assert!(git_vcs.calls_for("update").is_empty());
        assert!(temp.path().join("a/file").exists());
    }

    #[test]
    fn test_changed_uri_skip() {
        let (_temp, config, git_vcs) = changed_uri_setup();
        let report =
            install_or_update(&config, &with_policy(ChangedUriPolicy::Skip), |_, _| {}).unwrap();

        assert!(report.success);
        assert!(matches!(report.outcomes[0].1, Outcome::Skipped(_)));
        assert!(git_vcs.calls_for("checkout").is_empty());
    }

    #[test]
    fn test_changed_uri_delete_rechecks_out() {
        let (temp, config, git_vcs) = changed_uri_setup();
        let report =
            install_or_update(&config, &with_policy(ChangedUriPolicy::Delete), |_, _| {}).unwrap();

        assert_eq!(report.outcomes[0].1, Outcome::CheckedOut);
        assert!(!temp.path().join("a/file").exists());
        assert_eq!(
            git_vcs.current_uri(&temp.path().join("a")).as_deref(),
            Some("https://example.com/new.git")
        );
    }

    #[test]
    fn test_changed_uri_backup_moves_directory() {
        let (temp, config, git_vcs) = changed_uri_setup();
        let backups = temp.path().join("backups");
        let report = install_or_update(
            &config,
            &with_policy(ChangedUriPolicy::Backup(backups.clone())),
            |_, _| {},
        )
        .unwrap();

        assert_eq!(report.outcomes[0].1, Outcome::CheckedOut);
        assert_eq!(fs::read_to_string(backups.join("a-0/file")).unwrap(), "local");
        assert_eq!(git_vcs.calls_for("checkout"), vec!["a"]);
    }

    #[test]
    fn test_foreign_directory_counts_as_changed() {
        let temp = TempDir::new().unwrap();
        let (backends, _, _) = mock_backends();
        fs::create_dir(temp.path().join("a")).unwrap();
        fs::write(temp.path().join("a/readme"), "x").unwrap();
        let config =
            WorkspaceConfig::from_specs(temp.path(), backends, vec![git("a", "u1")]).unwrap();

        let report = install_or_update(&config, &ReconcileOptions::default(), |_, _| {}).unwrap();
        let (_, reason) = report.failures().next().unwrap();
        assert!(reason.contains("is not a git checkout"));
    }

    #[test]
    fn test_interrupted_run_returns_error() {
        let temp = TempDir::new().unwrap();
        let (backends, git_vcs, _) = mock_backends();
        let config =
            WorkspaceConfig::from_specs(temp.path(), backends, vec![git("a", "u1")]).unwrap();
        let options = ReconcileOptions {
            interrupt: Some(Arc::new(AtomicBool::new(true))),
            ..ReconcileOptions::default()
        };

        let err = install_or_update(&config, &options, |_, _| {}).unwrap_err();
        assert!(matches!(err, Error::Interrupted));
        assert!(git_vcs.calls().is_empty());
    }
}
