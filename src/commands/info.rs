//! # Info Command Implementation
//!
//! This module implements the `info` subcommand, which shows the elements of
//! the workspace together with their observed state.
//!
//! ## Output Modes
//!
//! - **Table** (default): one row per element with its status letter, type,
//!   version, current revision and URI.
//! - **Detail**: when exactly one element is named, every known property of
//!   that element.
//! - **Projection** (`--only`): comma-separated values of the requested
//!   fields. Only `revision`, `cur_revision` and `cur_uri` query the
//!   version-control systems.
//! - **Snapshot** (`--yaml`): the selected elements as a workspace file,
//!   with each element pinned to the revision that is checked out.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::Result;
use clap::Args;
use regex::Regex;

use super::{explain_lookup, name_filter, Context, JobsArgs, WorkspaceArgs};
use vcs_workspace::config::{ConfigElement, WorkspaceConfig};
use vcs_workspace::defaults::DEFAULT_JOBS;
use vcs_workspace::output::{bold, dim, red, table, yellow, OutputConfig};
use vcs_workspace::persist;
use vcs_workspace::spec::ScmType;
use vcs_workspace::status::{
    compute_status, format_row, parse_fields, project, snapshot, Classification, Field,
    StatusResult,
};
use vcs_workspace::suggestions;

/// Show the elements of the workspace and their state
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Elements to show (local names or paths). Defaults to all.
    #[arg(value_name = "NAMES")]
    pub names: Vec<String>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Omit headers, for use in scripts.
    #[arg(long)]
    pub data_only: bool,

    /// Print only these comma-separated fields, one line per element.
    ///
    /// Fields: localname, path, scmtype, uri, version, revision,
    /// cur_revision, cur_uri.
    #[arg(long, value_name = "FIELDS", conflicts_with = "yaml")]
    pub only: Option<String>,

    /// Print the elements as a workspace file pinned to their current
    /// revisions.
    #[arg(long)]
    pub yaml: bool,

    #[command(flatten)]
    pub jobs: JobsArgs,
}

impl InfoArgs {
    /// The full table of `workspace`, as shown when `vws` runs without a
    /// subcommand.
    pub fn overview_of(workspace: WorkspaceArgs) -> Self {
        Self {
            names: Vec::new(),
            workspace,
            data_only: false,
            only: None,
            yaml: false,
            jobs: JobsArgs { jobs: DEFAULT_JOBS },
        }
    }
}

/// Execute the `info` command.
pub fn execute(args: InfoArgs, ctx: &Context) -> Result<()> {
    let config = args.workspace.load()?;
    let names = name_filter(&args.names);
    let pool = args.jobs.query_pool(ctx)?;

    if let Some(list) = &args.only {
        let fields = requested_fields(list)?;
        let rows = project(&config, names, &fields, &pool).map_err(|e| explain_lookup(e, &config))?;
        for row in rows {
            println!("{}", format_row(&row));
        }
        return Ok(());
    }

    let selected = config.select(names).map_err(|e| explain_lookup(e, &config))?;
    let status = compute_status(&config, names, &pool)?;

    if args.yaml {
        let frozen: Vec<_> = status
            .iter()
            .zip(&selected)
            .map(|(status, element)| snapshot(status, element.spec()))
            .collect();
        let header = if args.data_only {
            String::new()
        } else {
            format!("snapshot of {}", config.base_path().display())
        };
        print!("{}", persist::to_yaml(&frozen, &header)?);
        return Ok(());
    }

    if let ([element], [status]) = (selected.as_slice(), status.as_slice()) {
        if names.is_some() {
            print!("{}", detail(element, status, &ctx.output));
            return Ok(());
        }
    }

    if !args.data_only {
        println!(
            "{} {}",
            bold(&ctx.output, "workspace:"),
            config.base_path().display()
        );
        println!();
    }
    let layout = Regex::new(r"^(?P<base>.+?)/(?P<layout>trunk|(?:tags|branches)/[^/]+)(?P<rest>/.*)?$")?;
    print!(
        "{}",
        overview(&config, &selected, &status, &layout, args.data_only, &ctx.output)
    );
    Ok(())
}

/// Parses `--only`, suggesting a close match for an unknown field.
fn requested_fields(list: &str) -> Result<Vec<Field>> {
    let unknown = list
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty() && s.parse::<Field>().is_err());
    if let Some(field) = unknown {
        return Err(suggestions::unknown_field(field));
    }
    Ok(parse_fields(list)?)
}

fn status_cell(status: &StatusResult, output: &OutputConfig) -> String {
    let letter = status.classification.letter().to_string();
    match status.classification {
        Classification::Missing => red(output, &letter),
        Classification::Clean => letter,
        _ => yellow(output, &letter),
    }
}

/// Splits an SVN URI in standard layout into its root and the
/// trunk/tag/branch it points at.
fn split_svn(uri: &str, layout: &Regex) -> Option<(String, String)> {
    let caps = layout.captures(uri)?;
    let rest = caps.name("rest").map_or("", |m| m.as_str());
    Some((
        caps["base"].to_string(),
        format!("{}{}", &caps["layout"], rest),
    ))
}

fn short_revision(revision: &str) -> &str {
    revision.get(..12).unwrap_or(revision)
}

fn overview(
    config: &WorkspaceConfig,
    selected: &[&ConfigElement],
    status: &[StatusResult],
    layout: &Regex,
    data_only: bool,
    output: &OutputConfig,
) -> String {
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(selected.len() + 1);
    if !data_only {
        rows.push(
            ["Localname", "S", "SCM", "Version (Spec)", "UID (Spec)", "URI (Spec)"]
                .iter()
                .map(|h| bold(output, h))
                .collect(),
        );
    }

    for (element, status) in selected.iter().zip(status) {
        let spec = element.spec();
        let mut uri = spec.uri().unwrap_or_default().to_string();
        let mut version = spec.version().unwrap_or_default().to_string();
        if spec.scm_type() == ScmType::Svn {
            if let Some((base, branch)) = split_svn(&uri, layout) {
                if version.is_empty() {
                    version = branch;
                } else {
                    version = format!("{} {}", branch, dim(output, &format!("({})", version)));
                }
                uri = base;
            }
        }

        let mut uid = status
            .current_revision
            .as_deref()
            .map(short_revision)
            .unwrap_or_default()
            .to_string();
        if status.revision_mismatch {
            if let Some(specified) = &status.specified_revision {
                uid = format!(
                    "{} {}",
                    yellow(output, &uid),
                    dim(output, &format!("({})", short_revision(specified)))
                );
            }
        }
        if status.uri_mismatch {
            if let Some(current) = &status.current_uri {
                uri = format!("{} {}", yellow(output, current), dim(output, &format!("({})", uri)));
            }
        }

        let name = if element.abs_path() == config.base_path().join(element.local_name()) {
            element.local_name().to_string()
        } else {
            format!("{} {}", element.local_name(), dim(output, &format!("[{}]", spec.path())))
        };
        rows.push(vec![
            name,
            status_cell(status, output),
            spec.scm_type().to_string(),
            version,
            uid,
            uri,
        ]);
    }
    table(&rows)
}

fn detail(element: &ConfigElement, status: &StatusResult, output: &OutputConfig) -> String {
    let spec = element.spec();
    let optional = |value: Option<&str>| value.unwrap_or("-").to_string();
    let rows: Vec<Vec<String>> = [
        ("Localname:", spec.local_name().to_string()),
        ("Path:", element.abs_path().display().to_string()),
        ("SCM:", spec.scm_type().to_string()),
        ("URI:", optional(spec.uri())),
        ("Version:", optional(spec.version())),
        ("Revision:", optional(spec.revision())),
        ("Status:", status.classification.to_string()),
        ("Current URI:", optional(status.current_uri.as_deref())),
        ("Current revision:", optional(status.current_revision.as_deref())),
        ("Specified revision:", optional(status.specified_revision.as_deref())),
    ]
    .into_iter()
    .map(|(label, value)| vec![bold(output, label), value])
    .collect();
    table(&rows)
}
