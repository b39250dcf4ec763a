//! # Diff Command Implementation
//!
//! This module implements the `diff` subcommand, which prints the local
//! changes of every checked-out element.
//!
//! Diffs are collected concurrently and printed in declaration order. File
//! names in the diff headers are prefixed with the element's path, so the
//! combined output can be applied as a patch from the workspace root.
//! Elements that are missing or not under version control are skipped.
//!
//! The command fails if the diff of any element could not be computed; the
//! diffs of the other elements are still printed.

use anyhow::Result;
use clap::Args;
use log::warn;

use super::{explain_lookup, name_filter, Context, JobsArgs, WorkspaceArgs};
use vcs_workspace::output::{emoji, red};
use vcs_workspace::status::collect_diffs;

/// Show local changes of the elements
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Elements to diff (local names or paths). Defaults to all.
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

/// Execute the `diff` command.
pub fn execute(args: DiffArgs, ctx: &Context) -> Result<()> {
    let config = args.workspace.load()?;
    let pool = args.jobs.query_pool(ctx)?;
    let diffs = collect_diffs(&config, name_filter(&args.names), &pool)
        .map_err(|e| explain_lookup(e, &config))?;

    let mut failed = 0;
    for element in &diffs {
        match &element.diff {
            Ok(diff) => print!("{diff}"),
            Err(e) => {
                warn!("diff of {} failed: {}", element.local_name, e);
                eprintln!(
                    "{} {}: {}",
                    emoji(&ctx.output, "❌", "[FAIL]"),
                    element.local_name,
                    red(&ctx.output, &e.to_string())
                );
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "could not compute the diff of {} of {} elements",
            failed,
            diffs.len()
        );
    }
    Ok(())
}
