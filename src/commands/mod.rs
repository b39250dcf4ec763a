//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `vws`
//! command-line tool. Each subcommand is defined in its own file to keep the
//! logic separated and maintainable.
//!
//! ## Structure
//!
//! Each command module typically contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] and performs the command's logic.
//!
//! The helpers below are shared by the commands that load a workspace or run
//! a reconciliation.

pub mod completions;
pub mod diff;
pub mod info;
pub mod init;
pub mod merge;
pub mod remove;
pub mod set;
pub mod status;
pub mod update;

use std::env;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};

use vcs_workspace::config::WorkspaceConfig;
use vcs_workspace::defaults::{CONFIG_FILENAME, DEFAULT_JOBS, WORKSPACE_ENV};
use vcs_workspace::error::Error;
use vcs_workspace::output::{emoji, red, OutputConfig};
use vcs_workspace::persist;
use vcs_workspace::pool::WorkerPool;
use vcs_workspace::reconcile::{install_or_update, Outcome, ReconcileOptions, ReconcileReport};
use vcs_workspace::suggestions;
use vcs_workspace::vcs::Backends;
use vcs_workspace::workspace;

/// State shared by every command invocation.
pub struct Context {
    pub output: OutputConfig,
    /// Raised on SIGINT/SIGTERM.
    pub interrupt: Arc<AtomicBool>,
}

/// Selects the workspace a command operates on.
#[derive(Args, Debug, Clone, Default)]
pub struct WorkspaceArgs {
    /// The workspace to operate on.
    ///
    /// Defaults to the nearest parent of the current directory that contains
    /// a .vws.yaml file.
    #[arg(
        short = 't',
        long = "target-workspace",
        value_name = "DIR",
        env = WORKSPACE_ENV
    )]
    pub target: Option<PathBuf>,
}

impl WorkspaceArgs {
    /// Targets `target`, falling back to the environment like `-t` does.
    pub fn at(target: Option<PathBuf>) -> Self {
        Self {
            target: target.or_else(|| env::var_os(WORKSPACE_ENV).map(PathBuf::from)),
        }
    }

    /// Locates and loads the workspace configuration.
    pub fn load(&self) -> Result<WorkspaceConfig> {
        let cwd = env::current_dir()?;
        let root = workspace::locate(self.target.as_deref(), &cwd)
            .map_err(suggestions::workspace_not_found)?;
        Ok(persist::load(&root, CONFIG_FILENAME, Backends::system())?)
    }
}

/// Options controlling parallel VCS operations.
#[derive(Args, Debug, Clone)]
pub struct JobsArgs {
    /// How many VCS operations to run at once.
    #[arg(
        short = 'j',
        long = "parallel",
        visible_alias = "pool",
        value_name = "N",
        default_value_t = DEFAULT_JOBS
    )]
    pub jobs: usize,
}

impl JobsArgs {
    /// A pool for read-only queries, which never stop early.
    pub fn query_pool(&self, ctx: &Context) -> Result<WorkerPool> {
        Ok(WorkerPool::new(self.jobs)?
            .robust(true)
            .interrupt(Arc::clone(&ctx.interrupt)))
    }
}

/// Turns a lookup failure into an error naming the closest local name.
pub fn explain_lookup(error: Error, config: &WorkspaceConfig) -> anyhow::Error {
    match error {
        Error::Lookup { name } => {
            let known: Vec<&str> = config.elements().iter().map(|e| e.local_name()).collect();
            suggestions::unknown_element(&name, &known)
        }
        other => other.into(),
    }
}

/// `None` when no names were given on the command line.
pub fn name_filter(names: &[String]) -> Option<&[String]> {
    (!names.is_empty()).then_some(names)
}

/// Progress display for a reconciliation.
///
/// On a color terminal a bar is drawn and one line printed per finished
/// element. Otherwise the lines are printed once the run is over.
pub struct Progress<'a> {
    bar: ProgressBar,
    output: &'a OutputConfig,
}

impl<'a> Progress<'a> {
    /// `len` is the number of elements, when known up front.
    pub fn new(len: Option<usize>, output: &'a OutputConfig) -> Result<Self> {
        let bar = match len {
            _ if !output.use_color => ProgressBar::hidden(),
            Some(0) => ProgressBar::hidden(),
            Some(len) => {
                let bar = ProgressBar::new(len as u64);
                bar.set_style(
                    ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(ProgressStyle::with_template("{spinner} {pos} done {msg}")?);
                bar
            }
        };
        Ok(Self { bar, output })
    }

    /// Records one finished element.
    pub fn observe(&self, name: &str, outcome: &Outcome) {
        self.bar.inc(1);
        self.bar.set_message(name.to_string());
        self.bar.println(outcome_line(self.output, name, outcome));
    }

    /// Removes the bar, printing `outcomes` if they were not shown live.
    pub fn finish(self, outcomes: Option<&[(String, Outcome)]>) {
        self.bar.finish_and_clear();
        if !self.bar.is_hidden() {
            return;
        }
        for (name, outcome) in outcomes.unwrap_or_default() {
            println!("{}", outcome_line(self.output, name, outcome));
        }
    }
}

/// Runs a reconciliation with progress display.
pub fn reconcile_with_progress(
    config: &WorkspaceConfig,
    options: &ReconcileOptions,
    output: &OutputConfig,
) -> Result<ReconcileReport> {
    let progress = Progress::new(Some(config.len()), output)?;
    let report = install_or_update(config, options, |name, outcome| {
        progress.observe(name, outcome)
    });
    progress.finish(report.as_ref().ok().map(|r| r.outcomes.as_slice()));
    Ok(report?)
}

fn outcome_line(output: &OutputConfig, name: &str, outcome: &Outcome) -> String {
    match outcome {
        Outcome::CheckedOut => format!("{} {}: checked out", emoji(output, "📥", "[NEW]"), name),
        Outcome::Updated => format!("{} {}: updated", emoji(output, "✅", "[OK]"), name),
        Outcome::Skipped(reason) => {
            format!("{} {}: skipped ({})", emoji(output, "⏭️ ", "[SKIP]"), name, reason)
        }
        Outcome::Failed(reason) => format!(
            "{} {}: {}",
            emoji(output, "❌", "[FAIL]"),
            name,
            red(output, reason)
        ),
    }
}

/// Fails with a summary when some elements could not be reconciled.
pub fn check_report(report: &ReconcileReport, total: usize) -> Result<()> {
    if report.success {
        return Ok(());
    }
    let failed = report.failures().count();
    Err(suggestions::reconcile_failed(failed.max(1), total))
}

/// Asks for confirmation unless `assume_yes` is set.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
