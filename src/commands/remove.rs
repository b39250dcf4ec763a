//! # Remove Command Implementation
//!
//! This module implements the `remove` subcommand, which drops elements from
//! the workspace file. The directories of removed elements are left on disk.
//! Nothing is removed if any of the names is unknown.

use anyhow::Result;
use clap::Args;

use super::{explain_lookup, Context, WorkspaceArgs};
use vcs_workspace::defaults::{config_header, CONFIG_FILENAME};
use vcs_workspace::output::emoji;
use vcs_workspace::persist;

/// Remove elements from the configuration (files are left untouched)
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Elements to remove (local names or paths).
    #[arg(value_name = "NAMES", required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,
}

/// Execute the `remove` command.
pub fn execute(args: RemoveArgs, ctx: &Context) -> Result<()> {
    let mut config = args.workspace.load()?;
    let removed = config
        .remove(&args.names)
        .map_err(|e| explain_lookup(e, &config))?;

    persist::write(&config, CONFIG_FILENAME, &config_header())?;
    for element in &removed {
        println!(
            "{} {}: removed (files kept in {})",
            emoji(&ctx.output, "➖", "[REMOVE]"),
            element.local_name(),
            element.abs_path().display()
        );
    }
    Ok(())
}
