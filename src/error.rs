//! # Error Handling
//!
//! This module defines the centralized error type for the `vcs-workspace`
//! library. It uses `thiserror` to derive a single `Error` enum that covers the
//! failure taxonomy of the reconciliation engine:
//!
//! - **`Config`**: malformed or conflicting declarative configuration
//!   (duplicate local name or path, a VCS element without a URI, a non-VCS
//!   element where only VCS elements are allowed). Never auto-corrected.
//! - **`Lookup`**: a caller referenced a local name that is not in the
//!   workspace configuration.
//! - **`Vcs`**: a single element's checkout, update or query failed. The
//!   orchestrator captures these per element instead of propagating them.
//! - **`Usage`**: an invalid invocation (conflicting options, bad paths).
//!
//! The remaining variants wrap the errors of the crates and std APIs the
//! library builds on.
//!
//! The `Result` type alias is used to return `Result<T, Error>` from
//! functions throughout the library.

use thiserror::Error;

/// Main error type for workspace operations
#[derive(Error, Debug)]
pub enum Error {
    /// The workspace configuration is malformed or violates an invariant.
    ///
    /// Includes an optional hint about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A local name was requested that the configuration does not contain.
    #[error("Unknown element: {name}")]
    Lookup { name: String },

    /// A version-control command failed for one element.
    #[error("{scm} {command} failed in {path}: {message}")]
    Vcs {
        scm: String,
        path: String,
        command: String,
        message: String,
    },

    /// The command line or API was used in an invalid way.
    #[error("Usage error: {message}")]
    Usage { message: String },

    /// The operation was interrupted before all elements were dispatched.
    #[error("Interrupted")]
    Interrupted,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The worker pool could not be built.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Shorthand for a `Config` error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for a `Usage` error.
    pub fn usage(message: impl Into<String>) -> Self {
        Error::Usage {
            message: message.into(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
