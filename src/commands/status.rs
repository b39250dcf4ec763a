//! # Status Command Implementation
//!
//! This module implements the `status` subcommand, which lists the elements
//! whose working copy differs from their declaration.
//!
//! Each line starts with a one-letter code followed by the element's path
//! relative to the workspace root:
//!
//! - `x`: the element is missing
//! - `L`: the working copy has local modifications
//! - `V`: the working copy is at a different URI or revision than declared
//!
//! Clean elements are not listed. This command is read-only.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use super::{explain_lookup, name_filter, Context, JobsArgs, WorkspaceArgs};
use vcs_workspace::output::{red, yellow, OutputConfig};
use vcs_workspace::status::{compute_status, Classification, StatusResult};

/// List elements that differ from their declaration
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Elements to check (local names or paths). Defaults to all.
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, ctx: &Context) -> Result<()> {
    let config = args.workspace.load()?;
    let pool = args.jobs.query_pool(ctx)?;
    let names = name_filter(&args.names);
    let selected = config.select(names).map_err(|e| explain_lookup(e, &config))?;
    let results = compute_status(&config, names, &pool)?;

    for (element, status) in selected.iter().zip(&results) {
        let path = element
            .abs_path()
            .strip_prefix(config.base_path())
            .unwrap_or(element.abs_path());
        if let Some(line) = status_line(status, path, &ctx.output) {
            println!("{line}");
        }
    }
    Ok(())
}

fn status_line(status: &StatusResult, path: &Path, output: &OutputConfig) -> Option<String> {
    let letter = status.classification.letter().to_string();
    let letter = match status.classification {
        Classification::Clean => return None,
        Classification::Missing => red(output, &letter),
        _ => yellow(output, &letter),
    };
    Some(format!("{}  {}", letter, path.display()))
}
