//! # Merge Command Implementation
//!
//! This module implements the `merge` subcommand, which adds the elements of
//! one or more other configurations to the workspace. Sources are merged in
//! the order given.
//!
//! ## Strategies
//!
//! - `--merge-replace` (default): an incoming element replaces the element of
//!   the same local name. It keeps its position unless its path changed.
//! - `--merge-keep`: elements already in the workspace win.
//! - `--merge-kill-append`: the existing element is dropped and the incoming
//!   one is appended at the end.
//!
//! The merge is all-or-nothing: if any incoming element conflicts with the
//! workspace (for example by claiming a path already in use) nothing is
//! written. Nothing is checked out; run `vws update` afterwards.

use anyhow::Result;
use clap::Args;
use std::env;

use super::{confirm, Context, WorkspaceArgs};
use vcs_workspace::config::{MergeAction, MergeStrategy};
use vcs_workspace::defaults::{config_header, CONFIG_FILENAME};
use vcs_workspace::output::{dim, emoji};
use vcs_workspace::persist;

/// How to treat elements that are already declared.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct StrategyFlags {
    /// Replace existing elements with incoming ones (default).
    #[arg(long)]
    pub merge_replace: bool,

    /// Keep existing elements and ignore incoming ones with the same name.
    #[arg(long)]
    pub merge_keep: bool,

    /// Remove existing elements and append the incoming ones at the end.
    #[arg(long)]
    pub merge_kill_append: bool,
}

impl StrategyFlags {
    fn strategy(&self) -> MergeStrategy {
        if self.merge_keep {
            MergeStrategy::KeepExisting
        } else if self.merge_kill_append {
            MergeStrategy::KillAppend
        } else {
            MergeStrategy::Replace
        }
    }
}

/// Merge the elements of another configuration into the workspace
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Configurations to merge: files, directories containing .vws.yaml, or
    /// file:// URLs.
    #[arg(value_name = "SOURCES", required = true)]
    pub sources: Vec<String>,

    #[command(flatten)]
    pub strategy: StrategyFlags,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Do not ask for confirmation.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

/// Execute the `merge` command.
pub fn execute(args: MergeArgs, ctx: &Context) -> Result<()> {
    let config = args.workspace.load()?;
    let specs = persist::load_sources(&env::current_dir()?, &args.sources)?;

    let mut merged = config.clone();
    let actions = merged.merge(specs, args.strategy.strategy())?;

    for (name, action) in &actions {
        let marker = match action {
            MergeAction::Added => emoji(&ctx.output, "➕", "[ADD]"),
            MergeAction::Replaced | MergeAction::Moved => emoji(&ctx.output, "🔄", "[REPLACE]"),
            MergeAction::Kept => emoji(&ctx.output, "⏭️ ", "[KEEP]"),
        };
        println!("{} {}: {}", marker, name, dim(&ctx.output, &action.to_string()));
    }

    if actions.iter().all(|(_, action)| *action == MergeAction::Kept) {
        println!("Nothing to merge from {}", args.sources.join(", "));
        return Ok(());
    }
    if !confirm("Write the merged workspace file?", args.yes)? {
        println!("Aborted, nothing written");
        return Ok(());
    }

    let file = persist::write(&merged, CONFIG_FILENAME, &config_header())?;
    println!(
        "{} Wrote {} ({} elements)",
        emoji(&ctx.output, "📝", "[WRITE]"),
        file.display(),
        merged.len()
    );
    Ok(())
}
