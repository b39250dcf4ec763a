//! # Update Command Implementation
//!
//! This module implements the `update` subcommand, which brings the
//! workspace to its declared state.
//!
//! ## Functionality
//!
//! - **Checkout and Update**: Elements whose directory is missing (or empty)
//!   are checked out; existing checkouts are updated to their declared
//!   version.
//! - **Selection**: With element names, only those are processed. Without,
//!   every version-controlled element is; unversioned elements are skipped.
//! - **Failure Policy**: By default the first failure stops further
//!   checkouts. `--continue-on-error` processes every element and reports
//!   all failures at the end.
//! - **Changed URIs**: A directory that is not a checkout of the declared
//!   repository fails the element (`--abort-changed-uris`, the default)
//!   unless another `--*-changed-uris` option says how to handle it.

use anyhow::Result;
use clap::Args;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use super::{
    check_report, explain_lookup, name_filter, reconcile_with_progress, Context, JobsArgs,
    WorkspaceArgs,
};
use vcs_workspace::defaults::expand_home;
use vcs_workspace::output::emoji;
use vcs_workspace::reconcile::{ChangedUriPolicy, ReconcileOptions};

/// Check out missing elements and update existing ones
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Elements to update (local names or paths). Defaults to all.
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,

    /// Keep processing the remaining elements when one fails.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Fail elements whose directory is not a checkout of the declared URI.
    /// This is the default.
    #[arg(
        long,
        conflicts_with_all = ["delete_changed_uris", "backup_changed_uris", "skip_changed_uris"]
    )]
    pub abort_changed_uris: bool,

    /// Delete directories that are not a checkout of the declared URI and
    /// check out again.
    #[arg(long, conflicts_with_all = ["backup_changed_uris", "skip_changed_uris"])]
    pub delete_changed_uris: bool,

    /// Move directories that are not a checkout of the declared URI into DIR
    /// and check out again.
    #[arg(long, value_name = "DIR", conflicts_with = "skip_changed_uris")]
    pub backup_changed_uris: Option<PathBuf>,

    /// Leave directories that are not a checkout of the declared URI alone.
    #[arg(long)]
    pub skip_changed_uris: bool,
}

impl UpdateArgs {
    fn changed_uri_policy(&self) -> ChangedUriPolicy {
        if self.delete_changed_uris {
            ChangedUriPolicy::Delete
        } else if let Some(dir) = &self.backup_changed_uris {
            ChangedUriPolicy::Backup(expand_home(dir.clone()))
        } else if self.skip_changed_uris {
            ChangedUriPolicy::Skip
        } else {
            ChangedUriPolicy::Abort
        }
    }
}

/// Execute the `update` command.
pub fn execute(args: UpdateArgs, ctx: &Context) -> Result<()> {
    let config = args.workspace.load()?;

    let names: Vec<String> = if args.names.is_empty() {
        let (vcs, other): (Vec<_>, Vec<_>) = config.elements().iter().partition(|e| e.is_vcs());
        for element in other {
            info!("skipping {}: not under version control", element.local_name());
        }
        vcs.iter().map(|e| e.local_name().to_string()).collect()
    } else {
        args.names.clone()
    };
    let selected = config
        .subset(Some(&names))
        .map_err(|e| explain_lookup(e, &config))?;

    if selected.is_empty() {
        println!(
            "{} Nothing to update in {}",
            emoji(&ctx.output, "ℹ️ ", "[INFO]"),
            config.base_path().display()
        );
        return Ok(());
    }

    let mut base = config.base_path().to_path_buf();
    let policy = match args.changed_uri_policy() {
        ChangedUriPolicy::Backup(dir) if dir.is_relative() => {
            base.push(dir);
            ChangedUriPolicy::Backup(base)
        }
        policy => policy,
    };
    let options = ReconcileOptions {
        num_threads: args.jobs.jobs,
        robust: args.continue_on_error,
        changed_uri_policy: policy,
        interrupt: Some(Arc::clone(&ctx.interrupt)),
    };

    let report = reconcile_with_progress(&selected, &options, &ctx.output)?;
    check_report(&report, selected.len())?;
    if name_filter(&args.names).is_none() {
        println!(
            "{} Workspace {} is up to date",
            emoji(&ctx.output, "✅", "[OK]"),
            config.base_path().display()
        );
    }
    Ok(())
}
