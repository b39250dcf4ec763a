//! # Completions Command Implementation
//!
//! This module implements the `completions` subcommand, which generates shell
//! completion scripts with `clap_complete`.
//!
//! ## Example
//!
//! ```bash
//! vws completions bash > ~/.local/share/bash-completion/completions/vws
//! vws completions zsh > ~/.zfunc/_vws
//! ```

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::Cli;
use vcs_workspace::defaults::PROGRAM_NAME;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command.
///
/// Writes the script to stdout.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    generate(args.shell, &mut cmd, PROGRAM_NAME, &mut io::stdout());
    Ok(())
}
