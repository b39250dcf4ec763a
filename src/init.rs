//! Creating a new workspace.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::WorkspaceConfig;
use crate::defaults::{config_header, CONFIG_FILENAME, PROGRAM_NAME};
use crate::error::{Error, Result};
use crate::persist;
use crate::reconcile::{install_or_update, Outcome, ReconcileOptions, ReconcileReport};
use crate::vcs::Backends;

/// The result of a successful `init_workspace`.
#[derive(Debug)]
pub struct InitReport {
    /// The configuration file that was written.
    pub config_file: PathBuf,
    /// Number of elements in the new workspace.
    pub elements: usize,
    pub reconcile: ReconcileReport,
}

/// Creates a workspace at `target`, optionally seeded from `source`, and
/// checks out every element.
///
/// Nothing is written unless the seed is a valid, version-controlled
/// configuration. Once the configuration file exists it is kept even if
/// some checkouts fail; those failures are reported in the returned report.
pub fn init_workspace<O>(
    target: &Path,
    source: Option<&str>,
    cwd: &Path,
    backends: Backends,
    options: &ReconcileOptions,
    observer: O,
) -> Result<InitReport>
where
    O: FnMut(&str, &Outcome),
{
    let config_file = target.join(CONFIG_FILENAME);
    if config_file.exists() {
        return Err(Error::Config {
            message: format!("{} already exists", config_file.display()),
            hint: Some(format!(
                "Use '{} merge <source> -t {}' to add elements to it",
                PROGRAM_NAME,
                target.display()
            )),
        });
    }
    if target.exists() && !target.is_dir() {
        return Err(Error::usage(format!(
            "{} exists and is not a directory",
            target.display()
        )));
    }

    let specs = match source {
        Some(source) => persist::read_source(source, cwd)?,
        None => Vec::new(),
    };
    let config = WorkspaceConfig::from_specs(target, backends, specs)?;
    config.validate_vcs_only()?;

    fs::create_dir_all(target)?;
    let config_file = persist::write(&config, CONFIG_FILENAME, &config_header())?;
    info!(
        "wrote {} with {} elements",
        config_file.display(),
        config.len()
    );

    let reconcile = install_or_update(&config, options, observer)?;
    Ok(InitReport {
        config_file,
        elements: config.len(),
        reconcile,
    })
}
