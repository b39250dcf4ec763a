//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;

use crate::commands::info::InfoArgs;
use crate::commands::{self, Context, WorkspaceArgs};
use vcs_workspace::defaults::PROGRAM_NAME;
use vcs_workspace::output::OutputConfig;

/// VCS Workspace - Manage a workspace of version-controlled source trees
#[derive(Parser, Debug)]
#[command(name = "vws")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute. Without one, `info` is shown.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Workspace to show when no subcommand is given
    #[arg(value_name = "WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new workspace, optionally seeded from a configuration
    Init(commands::init::InitArgs),

    /// Check out missing elements and update existing ones
    #[command(alias = "up")]
    Update(commands::update::UpdateArgs),

    /// Show the elements of the workspace and their state
    Info(commands::info::InfoArgs),

    /// List elements that differ from their declaration
    #[command(alias = "st")]
    Status(commands::status::StatusArgs),

    /// Show local changes of the elements
    #[command(alias = "di")]
    Diff(commands::diff::DiffArgs),

    /// Merge the elements of another configuration into the workspace
    Merge(commands::merge::MergeArgs),

    /// Add or change a single element
    Set(commands::set::SetArgs),

    /// Remove elements from the configuration (files are left untouched)
    #[command(alias = "rm")]
    Remove(commands::remove::RemoveArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let ctx = Context {
            output: OutputConfig::from_env_and_flag(&self.color),
            interrupt: interrupt_flag()?,
        };

        let command = match (self.command, self.workspace) {
            (Some(_), Some(path)) => bail!(
                "unexpected argument '{}' before the subcommand\n  hint: use -t {} to select a workspace",
                path.display(),
                path.display()
            ),
            (Some(command), None) => command,
            (None, Some(path)) if !path.is_dir() => bail!(
                "'{}' is neither a subcommand nor a workspace directory\n  hint: run '{} --help' for the list of subcommands",
                path.display(),
                PROGRAM_NAME
            ),
            (None, workspace) => {
                Commands::Info(InfoArgs::overview_of(WorkspaceArgs::at(workspace)))
            }
        };

        match command {
            Commands::Init(args) => commands::init::execute(args, &ctx),
            Commands::Update(args) => commands::update::execute(args, &ctx),
            Commands::Info(args) => commands::info::execute(args, &ctx),
            Commands::Status(args) => commands::status::execute(args, &ctx),
            Commands::Diff(args) => commands::diff::execute(args, &ctx),
            Commands::Merge(args) => commands::merge::execute(args, &ctx),
            Commands::Set(args) => commands::set::execute(args, &ctx),
            Commands::Remove(args) => commands::remove::execute(args, &ctx),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Initializes `env_logger` at `level`; `RUST_LOG` takes precedence.
fn init_logging(level: &str) {
    let _ = env_logger::Builder::new()
        .parse_filters(level)
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
}

/// A flag raised by the first SIGINT/SIGTERM. A second signal exits at once.
fn interrupt_flag() -> Result<Arc<AtomicBool>> {
    let interrupted = Arc::new(AtomicBool::new(false));
    for &signal in TERM_SIGNALS {
        flag::register_conditional_shutdown(signal, 1, Arc::clone(&interrupted))
            .context("failed to install signal handler")?;
        flag::register(signal, Arc::clone(&interrupted))
            .context("failed to install signal handler")?;
    }
    Ok(interrupted)
}
