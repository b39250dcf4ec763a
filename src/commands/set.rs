//! # Set Command Implementation
//!
//! This module implements the `set` subcommand, which adds a single element
//! to the workspace or changes one that is already declared.
//!
//! ## Functionality
//!
//! - **New Elements**: need a URI and one of `--git`, `--svn`, `--hg` or
//!   `--bzr`. With `--detached` the element is added without version
//!   control. If the directory is already a working copy, its type and URI
//!   are detected and the flags can be left out.
//! - **Existing Elements**: only the given properties change; the others,
//!   including the path, are kept. Switching to another VCS type drops the
//!   old version and revision. An empty `--version-new` or `--revision`
//!   clears the value.
//! - **Confirmation**: the change is shown and confirmed before the
//!   configuration is written, unless `-y` is given.
//!
//! Nothing is checked out; run `vws update` afterwards.

use anyhow::Result;
use clap::Args;

use super::{confirm, Context, WorkspaceArgs};
use vcs_workspace::config::{resolve_path, WorkspaceConfig};
use vcs_workspace::defaults::{config_header, CONFIG_FILENAME};
use vcs_workspace::output::{dim, emoji};
use vcs_workspace::persist;
use vcs_workspace::spec::{ScmType, VersionedPathSpec};
use vcs_workspace::suggestions;

/// Which VCS manages the element.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
pub struct ScmFlags {
    /// The element is a git repository.
    #[arg(long)]
    pub git: bool,

    /// The element is a Subversion working copy.
    #[arg(long)]
    pub svn: bool,

    /// The element is a Mercurial repository.
    #[arg(long)]
    pub hg: bool,

    /// The element is a Bazaar branch.
    #[arg(long)]
    pub bzr: bool,
}

impl ScmFlags {
    fn scm_type(&self) -> Option<ScmType> {
        [
            (self.git, ScmType::Git),
            (self.svn, ScmType::Svn),
            (self.hg, ScmType::Hg),
            (self.bzr, ScmType::Bzr),
        ]
        .into_iter()
        .find_map(|(set, scm)| set.then_some(scm))
    }
}

/// Add or change a single element
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Local name of the element.
    #[arg(value_name = "LOCALNAME")]
    pub local_name: String,

    /// Repository to check the element out from.
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    #[command(flatten)]
    pub scm: ScmFlags,

    /// Branch, tag or other version to track. Empty to clear.
    #[arg(long, value_name = "VERSION")]
    pub version_new: Option<String>,

    /// Exact revision to pin. Empty to clear.
    #[arg(long, value_name = "REVISION")]
    pub revision: Option<String>,

    /// Declare the element without version control.
    #[arg(
        long,
        conflicts_with_all = ["uri", "git", "svn", "hg", "bzr", "version_new", "revision"]
    )]
    pub detached: bool,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Do not ask for confirmation.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

/// Normalizes a CLI value where the empty string means "unset".
fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Describes an undeclared working copy found at the element's default path.
fn detect_checkout(config: &WorkspaceConfig, local_name: &str) -> Option<VersionedPathSpec> {
    let path = resolve_path(config.base_path(), local_name);
    let scm = config.backends().detect(&path)?;
    let uri = config.backends().get(scm)?.current_uri(&path)?;
    Some(VersionedPathSpec::vcs(local_name, scm, uri))
}

/// Builds the declaration resulting from applying `args` to `existing`.
fn updated_spec(args: &SetArgs, existing: Option<&VersionedPathSpec>) -> Result<VersionedPathSpec> {
    let path = existing.map_or(args.local_name.as_str(), |e| e.path());
    if args.detached {
        return Ok(VersionedPathSpec::other(&args.local_name).with_path(path));
    }

    let existing = existing.filter(|e| e.is_vcs());
    let scm = args.scm.scm_type().or_else(|| existing.map(|e| e.scm_type()));
    let uri = args
        .uri
        .clone()
        .or_else(|| existing.and_then(|e| e.uri().map(str::to_string)));
    let (Some(scm), Some(uri)) = (scm, uri) else {
        return Err(suggestions::set_needs_source(&args.local_name));
    };

    let kept = existing.filter(|e| e.scm_type() == scm);
    let version = match &args.version_new {
        Some(v) => non_empty(v),
        None => kept.and_then(|e| e.version().map(str::to_string)),
    };
    let revision = match &args.revision {
        Some(r) => non_empty(r),
        None => kept.and_then(|e| e.revision().map(str::to_string)),
    };
    Ok(VersionedPathSpec::vcs(&args.local_name, scm, uri)
        .with_path(path)
        .with_optional_version(version)
        .with_optional_revision(revision))
}

/// Execute the `set` command.
pub fn execute(args: SetArgs, ctx: &Context) -> Result<()> {
    let mut config = args.workspace.load()?;
    let existing = config.get(&args.local_name).map(|e| e.spec().clone());
    let detected = match (&existing, args.scm.scm_type()) {
        (None, None) if !args.detached => detect_checkout(&config, &args.local_name),
        _ => None,
    };
    let spec = updated_spec(&args, existing.as_ref().or(detected.as_ref()))?;

    if existing.as_ref() == Some(&spec) {
        println!(
            "{} {} is already declared that way",
            emoji(&ctx.output, "ℹ️ ", "[INFO]"),
            spec.local_name()
        );
        return Ok(());
    }

    match &existing {
        Some(old) => {
            println!("{} {}", dim(&ctx.output, "old:"), old);
            println!("{} {}", dim(&ctx.output, "new:"), spec);
        }
        None => println!("{} {}", dim(&ctx.output, "add:"), spec),
    }
    if !confirm("Write the change to the workspace file?", args.yes)? {
        println!("Aborted, nothing written");
        return Ok(());
    }

    let action = config.add_or_override(spec)?;
    let file = persist::write(&config, CONFIG_FILENAME, &config_header())?;
    println!(
        "{} {}: {} in {}",
        emoji(&ctx.output, "📝", "[WRITE]"),
        args.local_name,
        action,
        file.display()
    );
    Ok(())
}
