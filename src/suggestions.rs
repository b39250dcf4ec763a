//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Following CLI recommendations,
//! errors should tell users what went wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vcs_workspace::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("unknown field: {}", field);
//!
//! // Use:
//! return Err(suggestions::unknown_field(field));
//! ```

use crate::defaults::{PROGRAM_NAME, WORKSPACE_ENV};
use crate::status::Field;

/// Generate an error for an unknown `--only` field.
///
/// Suggests the closest valid field name and lists all of them.
pub fn unknown_field(field: &str) -> anyhow::Error {
    let valid: Vec<&str> = Field::ALL.iter().map(|f| f.name()).collect();
    let did_you_mean = find_similar(field, &valid)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown field: {field}{did_you_mean}\n\n\
         Valid fields are: {fields}",
        fields = valid.join(", ")
    )
}

/// Generate an error for an unknown element name.
///
/// Suggests the closest local name of the workspace, if any.
pub fn unknown_element(name: &str, known: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown element: {name}{did_you_mean}\n\n\
         hint: Run '{PROGRAM_NAME} info --only localname' to list the elements"
    )
}

/// Generate an error for when no workspace could be found.
pub fn workspace_not_found(error: impl std::fmt::Display) -> anyhow::Error {
    anyhow::anyhow!(
        "{error}\n\n\
         hint: Run '{PROGRAM_NAME} init <dir>' to create a workspace\n\
         hint: Use -t/--target-workspace to point at an existing one\n\
         hint: Set the {WORKSPACE_ENV} environment variable"
    )
}

/// Generate an error for some elements failing to check out or update.
///
/// Includes hints about retrying and continuing past failures.
pub fn reconcile_failed(failed: usize, total: usize) -> anyhow::Error {
    anyhow::anyhow!(
        "{failed} of {total} elements could not be checked out or updated\n\n\
         hint: Fix the errors above and run '{PROGRAM_NAME} update' again\n\
         hint: Use --continue-on-error to process the remaining elements anyway"
    )
}

/// Generate an error for `set` on a new element without enough information.
pub fn set_needs_source(local_name: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "'{local_name}' is not in the workspace, so a URI and a VCS type are required\n\n\
         hint: {PROGRAM_NAME} set {local_name} <URI> --git (or --svn, --hg, --bzr)\n\
         hint: Use --detached to add an element without version control"
    )
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0usize; b_len + 1];
    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
