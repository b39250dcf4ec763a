//! # Init Command Implementation
//!
//! This module implements the `init` subcommand, which creates a new
//! workspace.
//!
//! ## Functionality
//!
//! - **Empty Workspace**: Without a source, writes a `.vws.yaml` file with no
//!   elements.
//! - **Seeded Workspace**: With a source (a configuration file, a directory
//!   containing one, or a `file://` URL), copies its elements and checks all
//!   of them out.
//! - **Failure Handling**: The configuration file is only written when the
//!   seed is valid. Checkout failures after that are reported and make the
//!   command fail, but the written configuration is kept so that `vws update`
//!   can resume.

use anyhow::Result;
use clap::Args;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use super::{check_report, Context, JobsArgs, Progress};
use vcs_workspace::defaults::{expand_home, PROGRAM_NAME};
use vcs_workspace::init::init_workspace;
use vcs_workspace::output::emoji;
use vcs_workspace::reconcile::ReconcileOptions;
use vcs_workspace::vcs::Backends;

/// Create a new workspace
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory of the new workspace.
    #[arg(value_name = "TARGET", default_value = ".")]
    pub target: PathBuf,

    /// Configuration to seed the workspace from: a file, a directory
    /// containing .vws.yaml, or a file:// URL.
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Keep checking out the remaining elements when one fails.
    #[arg(long)]
    pub continue_on_error: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

/// Execute the `init` command.
pub fn execute(args: InitArgs, ctx: &Context) -> Result<()> {
    let cwd = env::current_dir()?;
    let target = cwd.join(expand_home(args.target));
    let options = ReconcileOptions {
        num_threads: args.jobs.jobs,
        robust: args.continue_on_error,
        interrupt: Some(Arc::clone(&ctx.interrupt)),
        ..ReconcileOptions::default()
    };

    let progress = Progress::new(None, &ctx.output)?;
    let result = init_workspace(
        &target,
        args.source.as_deref(),
        &cwd,
        Backends::system(),
        &options,
        |name, outcome| progress.observe(name, outcome),
    );
    progress.finish(
        result
            .as_ref()
            .ok()
            .map(|report| report.reconcile.outcomes.as_slice()),
    );

    let report = result?;

    println!(
        "{} Wrote {} ({} elements)",
        emoji(&ctx.output, "📝", "[WRITE]"),
        report.config_file.display(),
        report.elements
    );
    check_report(&report.reconcile, report.elements)?;
    if report.elements == 0 {
        println!(
            "{} Add elements with '{PROGRAM_NAME} set' or '{PROGRAM_NAME} merge'",
            emoji(&ctx.output, "💡", "[HINT]")
        );
    }
    Ok(())
}
